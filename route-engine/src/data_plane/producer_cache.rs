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

//! Cache of started producers keyed by endpoint.

use crate::data_plane::service_pool::{Lease, PoolStatistics, ServiceFactory, ServicePool};
use crate::data_plane::utilization::EndpointUtilizationStatistics;
use crate::endpoint::{Endpoint, Producer};
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::observability::events;
use crate::routing::endpoint_key::EndpointKey;
use crate::routing::uri::EndpointUri;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, Level};

const COMPONENT: &str = "producer_cache";

pub type ProducerLease = Lease<dyn Producer>;

struct ProducerFactory;

#[async_trait]
impl ServiceFactory<dyn Producer> for ProducerFactory {
    fn kind(&self) -> &'static str {
        "producer"
    }

    async fn create(&self, endpoint: &Arc<dyn Endpoint>) -> Result<Box<dyn Producer>, EngineError> {
        let producible = endpoint
            .as_producible()
            .ok_or_else(|| unsupported(endpoint.uri()))?;
        producible.create_producer().await
    }

    fn is_shareable(&self, service: &dyn Producer) -> bool {
        service.is_shareable()
    }
}

fn unsupported(uri: &EndpointUri) -> EngineError {
    EngineError::UnsupportedCapability {
        uri: uri.sanitized(),
        capability: "producer".to_string(),
    }
}

/// Pools producers for singleton endpoints and hands out transient producers
/// for everything else.
pub struct ProducerCache {
    source: String,
    pool: ServicePool<dyn Producer>,
    statistics: Option<EndpointUtilizationStatistics>,
}

impl ProducerCache {
    /// `capacity` of `0` selects the default of 1000 idle producers.
    pub fn new(
        source: impl Into<String>,
        capacity: usize,
        extended_statistics: bool,
        statistics_max_entries: usize,
    ) -> Self {
        Self {
            source: source.into(),
            pool: ServicePool::new(Arc::new(ProducerFactory), capacity),
            statistics: extended_statistics
                .then(|| EndpointUtilizationStatistics::new(statistics_max_entries)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub async fn acquire_producer(
        &self,
        endpoint: &Arc<dyn Endpoint>,
    ) -> Result<ProducerLease, EngineError> {
        if endpoint.as_producible().is_none() {
            return Err(unsupported(endpoint.uri()));
        }
        if let Some(statistics) = &self.statistics {
            statistics.on_hit(endpoint.uri().as_str());
        }

        if endpoint.is_singleton() {
            self.pool.acquire(endpoint).await
        } else {
            self.pool.acquire_transient(endpoint).await
        }
    }

    pub async fn release_producer(&self, lease: ProducerLease) {
        self.pool.release(lease).await;
    }

    /// Acquires a producer, processes the exchange and releases the producer,
    /// also when processing fails.
    pub async fn send(
        &self,
        endpoint: &Arc<dyn Endpoint>,
        exchange: &mut Exchange,
    ) -> Result<(), EngineError> {
        let lease = self.acquire_producer(endpoint).await?;
        if tracing::enabled!(Level::DEBUG) {
            debug!(
                event = events::PRODUCER_SEND,
                component = COMPONENT,
                source = %self.source,
                endpoint_uri = %endpoint.uri().sanitized(),
                exchange_id = %exchange.id(),
                "sending exchange"
            );
        }
        let outcome = lease.get().process(exchange).await;
        self.release_producer(lease).await;
        outcome
    }

    pub async fn evict(&self, uri: &EndpointUri) -> usize {
        self.pool.evict(&EndpointKey::from(uri)).await
    }

    pub async fn clean_up(&self) {
        self.pool.clean_up().await;
    }

    pub fn size(&self) -> usize {
        self.pool.size()
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Normalized URIs with a cached producer.
    pub fn cached_uris(&self) -> Vec<String> {
        self.pool
            .keys()
            .into_iter()
            .map(|key| key.as_str().to_string())
            .collect()
    }

    pub fn statistics(&self) -> PoolStatistics {
        self.pool.statistics()
    }

    pub fn endpoint_utilization_statistics(&self) -> Option<&EndpointUtilizationStatistics> {
        self.statistics.as_ref()
    }

    pub fn start(&self) {
        self.pool.start();
    }

    pub async fn stop(&self) {
        self.pool.stop().await;
        if let Some(statistics) = &self.statistics {
            statistics.clear();
        }
    }
}
