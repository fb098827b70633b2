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

//! Convenience senders and receivers bound to a context's caches.
//!
//! URIs passed to the templates are resolved as dynamic registry entries, so
//! one-off endpoints age out of the registry on their own.

use crate::control_plane::endpoint_registry::EndpointRegistry;
use crate::data_plane::consumer_cache::ConsumerCache;
use crate::data_plane::producer_cache::ProducerCache;
use crate::error::EngineError;
use crate::exchange::Exchange;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct ProducerTemplate {
    registry: Arc<EndpointRegistry>,
    producers: Arc<ProducerCache>,
}

impl ProducerTemplate {
    pub(crate) fn new(registry: Arc<EndpointRegistry>, producers: Arc<ProducerCache>) -> Self {
        Self {
            registry,
            producers,
        }
    }

    /// Sends `exchange` to `uri` and returns it as the producer left it.
    pub async fn send(&self, uri: &str, mut exchange: Exchange) -> Result<Exchange, EngineError> {
        let endpoint = self.registry.resolve(uri).await?;
        self.producers.send(&endpoint, &mut exchange).await?;
        Ok(exchange)
    }

    /// Sends a new exchange carrying `body` and returns the resulting body.
    pub async fn send_body(&self, uri: &str, body: impl Into<Value>) -> Result<Value, EngineError> {
        let exchange = self.send(uri, Exchange::with_body(body)).await?;
        Ok(exchange.into_body())
    }
}

#[derive(Clone)]
pub struct ConsumerTemplate {
    registry: Arc<EndpointRegistry>,
    consumers: Arc<ConsumerCache>,
}

impl ConsumerTemplate {
    pub(crate) fn new(registry: Arc<EndpointRegistry>, consumers: Arc<ConsumerCache>) -> Self {
        Self {
            registry,
            consumers,
        }
    }

    /// Waits up to `timeout` for an exchange from `uri`.
    pub async fn receive(
        &self,
        uri: &str,
        timeout: Duration,
    ) -> Result<Option<Exchange>, EngineError> {
        let endpoint = self.registry.resolve(uri).await?;
        self.consumers.receive(&endpoint, timeout).await
    }

    pub async fn receive_no_wait(&self, uri: &str) -> Result<Option<Exchange>, EngineError> {
        let endpoint = self.registry.resolve(uri).await?;
        self.consumers.receive_no_wait(&endpoint).await
    }

    pub async fn receive_body(
        &self,
        uri: &str,
        timeout: Duration,
    ) -> Result<Option<Value>, EngineError> {
        Ok(self
            .receive(uri, timeout)
            .await?
            .map(Exchange::into_body))
    }
}
