/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Deterministic benchmark fixtures for the Criterion harness.

use crate::config::EngineConfig;
use crate::context::RouteContext;
use crate::control_plane::component_registry::ComponentRegistry;
use crate::control_plane::endpoint_registry::EndpointRegistry;
use crate::control_plane::route::RouteDefinition;
use crate::data_plane::producer_cache::ProducerCache;
use crate::endpoint::Endpoint;
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::template::ProducerTemplate;
use crate::testing::{CountingComponent, CountingOptions};
use std::sync::Arc;

fn endpoint_uri(index: usize) -> String {
    format!("counting:bench-{index}?slot={}", index % 7)
}

/// Fixed fixture for `producer_cache/*` benchmark IDs.
pub struct ProducerCacheFixture {
    cache: ProducerCache,
    endpoints: Vec<Arc<dyn Endpoint>>,
}

impl ProducerCacheFixture {
    /// `endpoints` larger than `capacity` makes every round evict and recreate producers.
    pub async fn new(capacity: usize, endpoints: usize) -> Result<Self, EngineError> {
        let component = CountingComponent::new(CountingOptions::default());
        let mut resolved = Vec::with_capacity(endpoints.max(1));
        for index in 0..endpoints.max(1) {
            resolved.push(component.endpoint(&endpoint_uri(index)).await?);
        }
        let cache = ProducerCache::new("benchmark", capacity, false, 0);
        cache.start();
        Ok(Self {
            cache,
            endpoints: resolved,
        })
    }

    /// Sends one exchange to every endpoint and returns the cache size afterwards.
    pub async fn send_round(&self) -> Result<usize, EngineError> {
        for endpoint in &self.endpoints {
            let mut exchange = Exchange::with_body(1);
            self.cache.send(endpoint, &mut exchange).await?;
        }
        Ok(self.cache.size())
    }
}

/// Fixed fixture for `endpoint_registry/*` benchmark IDs.
pub struct EndpointRegistryFixture {
    registry: EndpointRegistry,
    uris: Vec<String>,
}

impl EndpointRegistryFixture {
    pub fn new(max_size: usize, uris: usize) -> Self {
        let components = Arc::new(ComponentRegistry::new());
        components.add(
            "counting",
            Arc::new(CountingComponent::new(CountingOptions::default())),
        );
        Self {
            registry: EndpointRegistry::new(components, max_size),
            uris: (0..uris.max(1)).map(endpoint_uri).collect(),
        }
    }

    /// Resolves every URI once; returns the registry size afterwards.
    pub async fn resolve_all(&self) -> Result<usize, EngineError> {
        for uri in &self.uris {
            self.registry.resolve(uri).await?;
        }
        Ok(self.registry.size())
    }
}

/// Fixed fixture for `route_dispatch/*` benchmark IDs: `direct:bench` feeding a processor
/// and a counting producer.
pub struct RouteDispatchFixture {
    context: RouteContext,
    template: ProducerTemplate,
}

impl RouteDispatchFixture {
    pub async fn new() -> Result<Self, EngineError> {
        let context = RouteContext::with_default_components(EngineConfig::default());
        context.add_component(
            "counting",
            Arc::new(CountingComponent::new(CountingOptions::default())),
        );
        context
            .add_route(
                RouteDefinition::new("bench", "direct:bench")
                    .process(crate::endpoint::processor_fn(|exchange| {
                        exchange.set_header("bench", true);
                        Ok(())
                    }))
                    .to("counting:sink"),
            )
            .await?;
        context.start().await?;
        let template = context.producer_template();
        Ok(Self { context, template })
    }

    pub async fn dispatch_once(&self) -> Result<bool, EngineError> {
        let exchange = self
            .template
            .send("direct:bench", Exchange::with_body("payload"))
            .await?;
        Ok(exchange.header("counted_by").is_some())
    }

    pub async fn stop(&self) -> Result<(), EngineError> {
        self.context.stop().await
    }
}
