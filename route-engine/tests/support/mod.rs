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

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use route_engine::{
    EngineConfig, EngineError, Exchange, Processor, RouteContext, RouteHandle, RoutePolicy,
    ShutdownConfig,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub(crate) fn config_with_timeout(timeout_secs: u64) -> EngineConfig {
    EngineConfig {
        name: "integration".to_string(),
        shutdown: ShutdownConfig {
            timeout_secs,
            ..ShutdownConfig::default()
        },
        ..EngineConfig::default()
    }
}

pub(crate) fn make_context() -> RouteContext {
    init_logging();
    RouteContext::with_default_components(EngineConfig::default())
}

/// Records policy callbacks in the order they fire.
#[derive(Default)]
pub(crate) struct RecordingPolicy {
    calls: Mutex<Vec<String>>,
}

impl RecordingPolicy {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn count(&self, callback: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.as_str() == callback)
            .count()
    }

    fn record(&self, callback: &str) {
        self.calls.lock().push(callback.to_string());
    }
}

#[async_trait]
impl RoutePolicy for RecordingPolicy {
    async fn on_init(&self, _route: &RouteHandle) {
        self.record("init");
    }

    async fn on_start(&self, _route: &RouteHandle) {
        self.record("start");
    }

    async fn on_stop(&self, _route: &RouteHandle) {
        self.record("stop");
    }

    async fn on_suspend(&self, _route: &RouteHandle) {
        self.record("suspend");
    }

    async fn on_resume(&self, _route: &RouteHandle) {
        self.record("resume");
    }

    async fn on_remove(&self, _route: &RouteHandle) {
        self.record("remove");
    }

    fn on_exchange_begin(&self, _route: &RouteHandle, _exchange: &Exchange) {
        self.record("begin");
    }

    fn on_exchange_done(&self, _route: &RouteHandle, _exchange: &Exchange) {
        self.record("done");
    }
}

/// Processor that holds each exchange until released, or for a fixed delay.
pub(crate) struct SlowProcessor {
    delay: Duration,
    entered: AtomicUsize,
    completed: AtomicUsize,
}

impl SlowProcessor {
    pub(crate) fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            entered: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        })
    }

    pub(crate) fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Waits until at least one exchange is being processed.
    pub(crate) async fn wait_entered(&self) {
        while self.entered() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Processor for SlowProcessor {
    async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        exchange.set_header("slow", true);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) async fn wait_until(condition: impl Fn() -> bool, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
