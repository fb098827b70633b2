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

//! `queue:` endpoints: bounded in-memory queues decoupling producers from
//! consumers. Route consumers drain the queue from a background loop; polling
//! consumers take from it on demand. A route consumer asked to complete all
//! tasks keeps draining the queue through a graceful shutdown.

use crate::control_plane::shutdown_strategy::ShutdownRunningTask;
use crate::endpoint::{
    Component, Consumable, Consumer, Endpoint, Pollable, PollingConsumer, Processor, Producer,
    Producible,
};
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::observability::events;
use crate::routing::uri::EndpointUri;
use crate::runtime::worker_runtime::{spawn_worker, StopSignal, WorkerHandle};
use crate::service::Lifecycle;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, warn};

const COMPONENT: &str = "queue";

pub const DEFAULT_QUEUE_SIZE: usize = 1000;

const PARAMETERS: &[&str] = &["size"];

/// Bounded FIFO shared by every endpoint with the same queue name.
pub struct Queue {
    name: String,
    capacity: usize,
    items: Mutex<VecDeque<Exchange>>,
    available: Notify,
}

impl Queue {
    fn new(name: &str, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            capacity,
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn offer(&self, exchange: Exchange) -> Result<(), EngineError> {
        {
            let mut items = self.items.lock();
            if items.len() >= self.capacity {
                return Err(EngineError::processing(
                    format!("queue://{}", self.name),
                    format!("queue full (capacity {})", self.capacity),
                ));
            }
            items.push_back(exchange);
        }
        self.available.notify_one();
        Ok(())
    }

    fn try_take(&self) -> Option<Exchange> {
        self.items.lock().pop_front()
    }

    /// Waits until an exchange is available. Cancel safe: nothing is taken
    /// unless the future completes.
    async fn take(&self) -> Exchange {
        loop {
            if let Some(exchange) = self.try_take() {
                return exchange;
            }
            self.available.notified().await;
        }
    }

    async fn take_timeout(&self, timeout: Duration) -> Option<Exchange> {
        tokio::time::timeout(timeout, self.take()).await.ok()
    }
}

/// Factory for `queue:` endpoints. The `size` parameter of the first endpoint
/// resolved for a queue name fixes its capacity.
#[derive(Clone, Default)]
pub struct QueueComponent {
    queues: Arc<Mutex<HashMap<String, Arc<Queue>>>>,
}

impl QueueComponent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, name: &str) -> Option<Arc<Queue>> {
        self.queues.lock().get(name).cloned()
    }

    fn get_or_create(&self, name: &str, capacity: usize) -> Arc<Queue> {
        self.queues
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Queue::new(name, capacity)))
            .clone()
    }
}

#[async_trait]
impl Component for QueueComponent {
    fn known_parameters(&self) -> Option<&[&'static str]> {
        Some(PARAMETERS)
    }

    async fn create_endpoint(&self, uri: &EndpointUri) -> Result<Arc<dyn Endpoint>, EngineError> {
        if uri.path().is_empty() {
            return Err(EngineError::resolve_failed(
                uri.sanitized(),
                "queue endpoint requires a name",
            ));
        }
        let capacity = uri
            .parameter_as::<usize>("size")?
            .unwrap_or(DEFAULT_QUEUE_SIZE);
        if capacity == 0 {
            return Err(EngineError::resolve_failed(
                uri.sanitized(),
                "size must be greater than zero",
            ));
        }
        Ok(Arc::new(QueueEndpoint {
            uri: uri.clone(),
            queue: self.get_or_create(uri.path(), capacity),
        }))
    }
}

struct QueueEndpoint {
    uri: EndpointUri,
    queue: Arc<Queue>,
}

impl Endpoint for QueueEndpoint {
    fn uri(&self) -> &EndpointUri {
        &self.uri
    }

    fn as_producible(&self) -> Option<&dyn Producible> {
        Some(self)
    }

    fn as_pollable(&self) -> Option<&dyn Pollable> {
        Some(self)
    }

    fn as_consumable(&self) -> Option<&dyn Consumable> {
        Some(self)
    }
}

#[async_trait]
impl Producible for QueueEndpoint {
    async fn create_producer(&self) -> Result<Box<dyn Producer>, EngineError> {
        Ok(Box::new(QueueProducer {
            queue: self.queue.clone(),
        }))
    }
}

#[async_trait]
impl Pollable for QueueEndpoint {
    async fn create_polling_consumer(&self) -> Result<Box<dyn PollingConsumer>, EngineError> {
        Ok(Box::new(QueuePollingConsumer {
            queue: self.queue.clone(),
        }))
    }
}

#[async_trait]
impl Consumable for QueueEndpoint {
    async fn create_consumer(
        &self,
        processor: Arc<dyn Processor>,
    ) -> Result<Box<dyn Consumer>, EngineError> {
        let (paused, _) = watch::channel(false);
        Ok(Box::new(QueueConsumer {
            uri: self.uri.clone(),
            queue: self.queue.clone(),
            processor,
            paused,
            worker: tokio::sync::Mutex::new(None),
        }))
    }
}

struct QueueProducer {
    queue: Arc<Queue>,
}

impl Lifecycle for QueueProducer {}

#[async_trait]
impl Producer for QueueProducer {
    async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError> {
        self.queue.offer(exchange.copy())
    }
}

struct QueuePollingConsumer {
    queue: Arc<Queue>,
}

impl Lifecycle for QueuePollingConsumer {}

#[async_trait]
impl PollingConsumer for QueuePollingConsumer {
    async fn receive_timeout(&self, timeout: Duration) -> Result<Option<Exchange>, EngineError> {
        Ok(self.queue.take_timeout(timeout).await)
    }

    async fn receive_no_wait(&self) -> Result<Option<Exchange>, EngineError> {
        Ok(self.queue.try_take())
    }
}

struct QueueConsumer {
    uri: EndpointUri,
    queue: Arc<Queue>,
    processor: Arc<dyn Processor>,
    paused: watch::Sender<bool>,
    worker: tokio::sync::Mutex<Option<WorkerHandle>>,
}

#[async_trait]
impl Lifecycle for QueueConsumer {
    async fn do_start(&self) -> Result<(), EngineError> {
        let mut worker = self.worker.lock().await;
        if worker.is_some() {
            return Ok(());
        }
        self.paused.send_replace(false);
        let uri = self.uri.clone();
        let queue = self.queue.clone();
        let processor = self.processor.clone();
        let paused = self.paused.subscribe();
        *worker = Some(spawn_worker(
            format!("queue-consumer[{}]", self.uri),
            move |stop| consume_loop(uri, queue, processor, paused, stop),
        ));
        Ok(())
    }

    /// Stops the loop; an exchange still being processed is abandoned.
    async fn do_stop(&self) -> Result<(), EngineError> {
        let worker = self.worker.lock().await.take();
        if let Some(worker) = worker {
            worker.stop().await;
        }
        Ok(())
    }

    fn supports_suspension(&self) -> bool {
        true
    }

    async fn do_suspend(&self) -> Result<(), EngineError> {
        self.paused.send_replace(true);
        Ok(())
    }

    async fn do_resume(&self) -> Result<(), EngineError> {
        self.paused.send_replace(false);
        Ok(())
    }
}

impl Consumer for QueueConsumer {
    fn endpoint_uri(&self) -> &EndpointUri {
        &self.uri
    }

    fn defers_shutdown(&self, task: ShutdownRunningTask) -> bool {
        task == ShutdownRunningTask::CompleteAllTasks
    }

    fn pending_exchanges(&self) -> usize {
        self.queue.len()
    }
}

async fn consume_loop(
    uri: EndpointUri,
    queue: Arc<Queue>,
    processor: Arc<dyn Processor>,
    mut paused: watch::Receiver<bool>,
    mut stop: StopSignal,
) {
    loop {
        let is_paused = *paused.borrow_and_update();
        if is_paused {
            tokio::select! {
                changed = paused.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    continue;
                }
                _ = stop.stopped() => return,
            }
        }

        let mut exchange = tokio::select! {
            exchange = queue.take() => exchange,
            changed = paused.changed() => {
                if changed.is_err() {
                    return;
                }
                continue;
            }
            _ = stop.stopped() => return,
        };

        let exchange_id = exchange.id();
        let outcome = tokio::select! {
            outcome = processor.process(&mut exchange) => outcome,
            _ = stop.stopped() => {
                debug!(
                    event = events::QUEUE_PROCESS_ABANDONED,
                    component = COMPONENT,
                    endpoint_uri = %uri,
                    exchange_id = %exchange_id,
                    "abandoning exchange on forced stop"
                );
                return;
            }
        };
        if let Err(err) = outcome {
            warn!(
                event = events::QUEUE_PROCESS_FAILED,
                component = COMPONENT,
                endpoint_uri = %uri,
                exchange_id = %exchange_id,
                err = %err,
                "queue consumer failed to process exchange"
            );
        }
    }
}
