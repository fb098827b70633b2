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

//! Cache of started polling consumers keyed by endpoint.

use crate::data_plane::service_pool::{Lease, PoolStatistics, ServiceFactory, ServicePool};
use crate::data_plane::utilization::EndpointUtilizationStatistics;
use crate::endpoint::{Endpoint, PollingConsumer};
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::observability::events;
use crate::routing::endpoint_key::EndpointKey;
use crate::routing::uri::EndpointUri;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const COMPONENT: &str = "consumer_cache";

pub type PollingConsumerLease = Lease<dyn PollingConsumer>;

struct PollingConsumerFactory;

#[async_trait]
impl ServiceFactory<dyn PollingConsumer> for PollingConsumerFactory {
    fn kind(&self) -> &'static str {
        "polling-consumer"
    }

    async fn create(
        &self,
        endpoint: &Arc<dyn Endpoint>,
    ) -> Result<Box<dyn PollingConsumer>, EngineError> {
        let pollable = endpoint
            .as_pollable()
            .ok_or_else(|| unsupported(endpoint.uri()))?;
        pollable.create_polling_consumer().await
    }

    fn is_shareable(&self, service: &dyn PollingConsumer) -> bool {
        service.is_shareable()
    }
}

fn unsupported(uri: &EndpointUri) -> EngineError {
    EngineError::UnsupportedCapability {
        uri: uri.sanitized(),
        capability: "polling consumer".to_string(),
    }
}

/// Pools polling consumers the same way [`ProducerCache`](crate::ProducerCache) pools producers.
pub struct ConsumerCache {
    source: String,
    pool: ServicePool<dyn PollingConsumer>,
    statistics: Option<EndpointUtilizationStatistics>,
}

impl ConsumerCache {
    pub fn new(
        source: impl Into<String>,
        capacity: usize,
        extended_statistics: bool,
        statistics_max_entries: usize,
    ) -> Self {
        Self {
            source: source.into(),
            pool: ServicePool::new(Arc::new(PollingConsumerFactory), capacity),
            statistics: extended_statistics
                .then(|| EndpointUtilizationStatistics::new(statistics_max_entries)),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub async fn acquire_polling_consumer(
        &self,
        endpoint: &Arc<dyn Endpoint>,
    ) -> Result<PollingConsumerLease, EngineError> {
        if endpoint.as_pollable().is_none() {
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

    pub async fn release_polling_consumer(&self, lease: PollingConsumerLease) {
        self.pool.release(lease).await;
    }

    /// Waits up to `timeout` for one exchange.
    pub async fn receive(
        &self,
        endpoint: &Arc<dyn Endpoint>,
        timeout: Duration,
    ) -> Result<Option<Exchange>, EngineError> {
        let lease = self.acquire_polling_consumer(endpoint).await?;
        let outcome = lease.get().receive_timeout(timeout).await;
        self.release_polling_consumer(lease).await;
        debug!(
            event = events::CONSUMER_RECEIVE,
            component = COMPONENT,
            source = %self.source,
            endpoint_uri = %endpoint.uri().sanitized(),
            received = matches!(outcome, Ok(Some(_))),
            "polled endpoint"
        );
        outcome
    }

    pub async fn receive_no_wait(
        &self,
        endpoint: &Arc<dyn Endpoint>,
    ) -> Result<Option<Exchange>, EngineError> {
        let lease = self.acquire_polling_consumer(endpoint).await?;
        let outcome = lease.get().receive_no_wait().await;
        self.release_polling_consumer(lease).await;
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
