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

//! `direct:` endpoints: synchronous hand-off from a producer to the single
//! route consumer registered for the same path, on the caller's task.

use crate::endpoint::{
    Component, Consumable, Consumer, Endpoint, Processor, Producer, Producible,
};
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::observability::events;
use crate::routing::uri::EndpointUri;
use crate::service::Lifecycle;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

const COMPONENT: &str = "direct";

const PARAMETERS: &[&str] = &[];

struct Registration {
    consumer_id: u64,
    processor: Arc<dyn Processor>,
}

#[derive(Default)]
struct DirectConsumers {
    by_path: RwLock<HashMap<String, Registration>>,
    next_id: AtomicU64,
}

impl DirectConsumers {
    fn lookup(&self, path: &str) -> Option<Arc<dyn Processor>> {
        self.by_path
            .read()
            .get(path)
            .map(|registration| registration.processor.clone())
    }

    fn register(
        &self,
        uri: &EndpointUri,
        consumer_id: u64,
        processor: &Arc<dyn Processor>,
    ) -> Result<(), EngineError> {
        let mut by_path = self.by_path.write();
        if let Some(existing) = by_path.get(uri.path()) {
            if existing.consumer_id == consumer_id {
                return Ok(());
            }
            return Err(EngineError::illegal_state(format!(
                "multiple consumers for the same endpoint is not allowed: {}",
                uri.sanitized()
            )));
        }
        by_path.insert(
            uri.path().to_string(),
            Registration {
                consumer_id,
                processor: processor.clone(),
            },
        );
        Ok(())
    }

    fn unregister(&self, path: &str, consumer_id: u64) {
        let mut by_path = self.by_path.write();
        if by_path
            .get(path)
            .is_some_and(|registration| registration.consumer_id == consumer_id)
        {
            by_path.remove(path);
        }
    }
}

/// Factory for `direct:` endpoints. Consumers are shared across every endpoint
/// this component creates, keyed by path.
#[derive(Clone, Default)]
pub struct DirectComponent {
    consumers: Arc<DirectConsumers>,
}

impl DirectComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_consumer(&self, path: &str) -> bool {
        self.consumers.lookup(path).is_some()
    }
}

#[async_trait]
impl Component for DirectComponent {
    fn known_parameters(&self) -> Option<&[&'static str]> {
        Some(PARAMETERS)
    }

    async fn create_endpoint(&self, uri: &EndpointUri) -> Result<Arc<dyn Endpoint>, EngineError> {
        if uri.path().is_empty() {
            return Err(EngineError::resolve_failed(
                uri.sanitized(),
                "direct endpoint requires a name",
            ));
        }
        Ok(Arc::new(DirectEndpoint {
            uri: uri.clone(),
            consumers: self.consumers.clone(),
        }))
    }
}

struct DirectEndpoint {
    uri: EndpointUri,
    consumers: Arc<DirectConsumers>,
}

impl Endpoint for DirectEndpoint {
    fn uri(&self) -> &EndpointUri {
        &self.uri
    }

    fn as_producible(&self) -> Option<&dyn Producible> {
        Some(self)
    }

    fn as_consumable(&self) -> Option<&dyn Consumable> {
        Some(self)
    }
}

#[async_trait]
impl Producible for DirectEndpoint {
    async fn create_producer(&self) -> Result<Box<dyn Producer>, EngineError> {
        Ok(Box::new(DirectProducer {
            uri: self.uri.clone(),
            consumers: self.consumers.clone(),
        }))
    }
}

#[async_trait]
impl Consumable for DirectEndpoint {
    async fn create_consumer(
        &self,
        processor: Arc<dyn Processor>,
    ) -> Result<Box<dyn Consumer>, EngineError> {
        Ok(Box::new(DirectConsumer {
            uri: self.uri.clone(),
            id: self.consumers.next_id.fetch_add(1, Ordering::AcqRel),
            processor,
            consumers: self.consumers.clone(),
        }))
    }
}

struct DirectProducer {
    uri: EndpointUri,
    consumers: Arc<DirectConsumers>,
}

impl Lifecycle for DirectProducer {}

#[async_trait]
impl Producer for DirectProducer {
    async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError> {
        let processor = self.consumers.lookup(self.uri.path()).ok_or_else(|| {
            EngineError::processing(
                self.uri.sanitized(),
                "no consumers available on endpoint",
            )
        })?;
        debug!(
            event = events::DIRECT_DISPATCH,
            component = COMPONENT,
            endpoint_uri = %self.uri,
            exchange_id = %exchange.id(),
            "dispatching exchange to direct consumer"
        );
        processor.process(exchange).await
    }
}

struct DirectConsumer {
    uri: EndpointUri,
    id: u64,
    processor: Arc<dyn Processor>,
    consumers: Arc<DirectConsumers>,
}

#[async_trait]
impl Lifecycle for DirectConsumer {
    async fn do_start(&self) -> Result<(), EngineError> {
        self.consumers.register(&self.uri, self.id, &self.processor)
    }

    async fn do_stop(&self) -> Result<(), EngineError> {
        self.consumers.unregister(self.uri.path(), self.id);
        Ok(())
    }

    fn supports_suspension(&self) -> bool {
        true
    }

    async fn do_suspend(&self) -> Result<(), EngineError> {
        self.consumers.unregister(self.uri.path(), self.id);
        Ok(())
    }

    async fn do_resume(&self) -> Result<(), EngineError> {
        self.consumers.register(&self.uri, self.id, &self.processor)
    }
}

impl Consumer for DirectConsumer {
    fn endpoint_uri(&self) -> &EndpointUri {
        &self.uri
    }
}
