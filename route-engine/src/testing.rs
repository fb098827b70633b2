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

//! Instrumented component used by unit tests, integration tests and benches.
//!
//! Every producer and polling consumer created through a [`CountingComponent`]
//! reports its creation, start, stop and processed exchanges per normalized URI.

use crate::endpoint::{Component, Endpoint, Pollable, PollingConsumer, Producer, Producible};
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::routing::uri::EndpointUri;
use crate::service::Lifecycle;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Behaviour switches for [`CountingComponent`].
#[derive(Clone, Debug)]
pub struct CountingOptions {
    pub singleton: bool,
    pub shareable: bool,
    pub producible: bool,
    pub pollable: bool,
    pub fail_start: bool,
    pub fail_process: bool,
    pub known_parameters: Option<Vec<&'static str>>,
}

impl Default for CountingOptions {
    fn default() -> Self {
        Self {
            singleton: true,
            shareable: true,
            producible: true,
            pollable: true,
            fail_start: false,
            fail_process: false,
            known_parameters: None,
        }
    }
}

#[derive(Default)]
struct Counters {
    endpoints: AtomicUsize,
    created: Mutex<HashMap<String, usize>>,
    started: Mutex<HashMap<String, usize>>,
    stopped: Mutex<HashMap<String, usize>>,
    processed: Mutex<HashMap<String, usize>>,
}

impl Counters {
    fn bump(map: &Mutex<HashMap<String, usize>>, uri: &str) {
        *map.lock().entry(uri.to_string()).or_default() += 1;
    }

    fn read(map: &Mutex<HashMap<String, usize>>, uri: &str) -> usize {
        map.lock().get(uri).copied().unwrap_or_default()
    }

    fn total(map: &Mutex<HashMap<String, usize>>) -> usize {
        map.lock().values().sum()
    }
}

#[derive(Clone)]
pub struct CountingComponent {
    options: CountingOptions,
    counters: Arc<Counters>,
}

impl CountingComponent {
    pub fn new(options: CountingOptions) -> Self {
        Self {
            options,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Builds an endpoint directly, bypassing any registry.
    pub async fn endpoint(&self, uri: &str) -> Result<Arc<dyn Endpoint>, EngineError> {
        self.create_endpoint(&EndpointUri::parse(uri)?).await
    }

    pub fn endpoints_created(&self) -> usize {
        self.counters.endpoints.load(Ordering::SeqCst)
    }

    pub fn created(&self, uri: &str) -> usize {
        Counters::read(&self.counters.created, uri)
    }

    pub fn started(&self, uri: &str) -> usize {
        Counters::read(&self.counters.started, uri)
    }

    pub fn stopped(&self, uri: &str) -> usize {
        Counters::read(&self.counters.stopped, uri)
    }

    pub fn processed(&self, uri: &str) -> usize {
        Counters::read(&self.counters.processed, uri)
    }

    pub fn total_created(&self) -> usize {
        Counters::total(&self.counters.created)
    }

    pub fn total_stopped(&self) -> usize {
        Counters::total(&self.counters.stopped)
    }
}

#[async_trait]
impl Component for CountingComponent {
    fn known_parameters(&self) -> Option<&[&'static str]> {
        self.options.known_parameters.as_deref()
    }

    async fn create_endpoint(&self, uri: &EndpointUri) -> Result<Arc<dyn Endpoint>, EngineError> {
        self.counters.endpoints.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(CountingEndpoint {
            uri: uri.clone(),
            options: self.options.clone(),
            counters: self.counters.clone(),
        }))
    }
}

struct CountingEndpoint {
    uri: EndpointUri,
    options: CountingOptions,
    counters: Arc<Counters>,
}

impl CountingEndpoint {
    fn service(&self) -> CountingService {
        Counters::bump(&self.counters.created, self.uri.as_str());
        CountingService {
            uri: self.uri.as_str().to_string(),
            options: self.options.clone(),
            counters: self.counters.clone(),
        }
    }
}

impl Endpoint for CountingEndpoint {
    fn uri(&self) -> &EndpointUri {
        &self.uri
    }

    fn is_singleton(&self) -> bool {
        self.options.singleton
    }

    fn as_producible(&self) -> Option<&dyn Producible> {
        self.options.producible.then_some(self as &dyn Producible)
    }

    fn as_pollable(&self) -> Option<&dyn Pollable> {
        self.options.pollable.then_some(self as &dyn Pollable)
    }
}

#[async_trait]
impl Producible for CountingEndpoint {
    async fn create_producer(&self) -> Result<Box<dyn Producer>, EngineError> {
        Ok(Box::new(self.service()))
    }
}

#[async_trait]
impl Pollable for CountingEndpoint {
    async fn create_polling_consumer(&self) -> Result<Box<dyn PollingConsumer>, EngineError> {
        Ok(Box::new(self.service()))
    }
}

struct CountingService {
    uri: String,
    options: CountingOptions,
    counters: Arc<Counters>,
}

#[async_trait]
impl Lifecycle for CountingService {
    async fn do_start(&self) -> Result<(), EngineError> {
        if self.options.fail_start {
            return Err(EngineError::illegal_state(format!(
                "{} refused to start",
                self.uri
            )));
        }
        Counters::bump(&self.counters.started, &self.uri);
        Ok(())
    }

    async fn do_stop(&self) -> Result<(), EngineError> {
        tokio::task::yield_now().await;
        Counters::bump(&self.counters.stopped, &self.uri);
        Ok(())
    }
}

#[async_trait]
impl Producer for CountingService {
    async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError> {
        if self.options.fail_process {
            return Err(EngineError::processing(&self.uri, "configured to fail"));
        }
        Counters::bump(&self.counters.processed, &self.uri);
        exchange.set_header("counted_by", self.uri.clone());
        Ok(())
    }

    fn is_shareable(&self) -> bool {
        self.options.shareable
    }
}

#[async_trait]
impl PollingConsumer for CountingService {
    async fn receive_timeout(&self, _timeout: Duration) -> Result<Option<Exchange>, EngineError> {
        self.receive_no_wait().await
    }

    async fn receive_no_wait(&self) -> Result<Option<Exchange>, EngineError> {
        Counters::bump(&self.counters.processed, &self.uri);
        Ok(Some(Exchange::with_body(self.uri.clone())))
    }
}
