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

//! Graceful shutdown of routes: pause intake, drain inflight exchanges, then stop.
//!
//! Routes marked [`ShutdownRoute::Defer`], and routes whose consumer asks to
//! finish all pending work, keep consuming through the drain and stop last.

use crate::config::ShutdownConfig;
use crate::control_plane::route::Route;
use crate::data_plane::inflight::InflightRepository;
use crate::error::EngineError;
use crate::observability::{events, fields};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const COMPONENT: &str = "shutdown_strategy";

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);
const INFLIGHT_LOG_LIMIT: usize = 20;

/// How a route takes part in a graceful shutdown.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownRoute {
    /// Intake is paused as soon as the shutdown begins.
    #[default]
    Default,
    /// The route keeps consuming until every other route has drained.
    Defer,
}

/// What a route finishes before its consumer stops.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownRunningTask {
    /// Only the exchanges already inflight.
    #[default]
    CompleteCurrentTaskOnly,
    /// Inflight exchanges plus everything the consumer still has pending.
    CompleteAllTasks,
}

pub struct ShutdownStrategy {
    config: ShutdownConfig,
    inflight: Arc<InflightRepository>,
    timeout_occurred: AtomicBool,
}

impl ShutdownStrategy {
    pub fn new(config: ShutdownConfig, inflight: Arc<InflightRepository>) -> Self {
        Self {
            config,
            inflight,
            timeout_occurred: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ShutdownConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    /// `true` once any shutdown gave up waiting on inflight exchanges.
    pub fn has_timeout_occurred(&self) -> bool {
        self.timeout_occurred.load(Ordering::Acquire)
    }

    /// Shuts the given routes' consumers down, waiting up to `timeout` for their
    /// inflight exchanges. Returns `false` when the wait timed out.
    ///
    /// Deferred routes keep consuming while the others drain and are stopped
    /// after them. A route completing all tasks counts its consumer's backlog
    /// as pending. With `suspend_only` the consumers are left suspended
    /// instead of stopped. Route status bookkeeping and policy callbacks stay
    /// with the caller.
    pub(crate) async fn shutdown_routes(
        &self,
        routes: &[Arc<Route>],
        timeout: Duration,
        suspend_only: bool,
    ) -> Result<bool, EngineError> {
        if timeout.is_zero() {
            return Err(EngineError::illegal_state(
                "shutdown timeout must be greater than zero",
            ));
        }

        let mut ordered: Vec<&Arc<Route>> = routes.iter().collect();
        ordered.sort_by_key(|route| route.startup_key());
        if self.config.shutdown_routes_in_reverse_order {
            ordered.reverse();
        }
        let (deferred, immediate): (Vec<&Arc<Route>>, Vec<&Arc<Route>>) =
            ordered.iter().copied().partition(|route| route.defers_shutdown());
        debug!(
            event = events::SHUTDOWN_BEGIN,
            component = COMPONENT,
            routes = ordered.len(),
            deferred = deferred.len(),
            timeout_ms = fields::millis(timeout),
            suspend_only,
            "shutting down routes"
        );

        for route in &immediate {
            self.pause_intake(route).await;
        }
        for route in &deferred {
            debug!(
                event = events::SHUTDOWN_ROUTE_DEFERRED,
                component = COMPONENT,
                route_id = %route.id,
                running_task = ?route.running_task(),
                "route keeps consuming until the others drain"
            );
        }

        let drained = self.await_drained(&ordered, timeout).await;
        if !drained && !self.config.shutdown_now_on_timeout {
            self.await_drained_unbounded(&ordered).await;
        }

        if suspend_only {
            for route in &deferred {
                self.pause_intake(route).await;
            }
        } else {
            for route in immediate.iter().chain(deferred.iter()) {
                self.stop_consumer(route).await;
            }
        }

        info!(
            event = events::SHUTDOWN_COMPLETE,
            component = COMPONENT,
            routes = ordered.len(),
            drained,
            "route shutdown complete"
        );
        Ok(drained)
    }

    async fn pause_intake(&self, route: &Route) {
        let Some(consumer) = route.consumer() else {
            return;
        };
        if !consumer.status().is_started() {
            return;
        }
        if let Err(err) = consumer.suspend().await {
            warn!(
                event = events::SHUTDOWN_CONSUMER_FAILED,
                component = COMPONENT,
                route_id = %route.id,
                err = %err,
                "unable to pause route consumer"
            );
        }
    }

    async fn stop_consumer(&self, route: &Route) {
        let Some(consumer) = route.consumer() else {
            return;
        };
        if let Err(err) = consumer.stop().await {
            warn!(
                event = events::SHUTDOWN_CONSUMER_FAILED,
                component = COMPONENT,
                route_id = %route.id,
                err = %err,
                "unable to stop route consumer"
            );
        }
    }

    fn pending(&self, routes: &[&Arc<Route>]) -> usize {
        routes
            .iter()
            .map(|route| self.inflight.route_size(&route.id) + backlog(route))
            .sum()
    }

    async fn await_drained(&self, routes: &[&Arc<Route>], timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let pending = self.pending(routes);
            if pending == 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                self.on_timeout(routes, pending, timeout);
                return false;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn await_drained_unbounded(&self, routes: &[&Arc<Route>]) {
        while self.pending(routes) > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }

    fn on_timeout(&self, routes: &[&Arc<Route>], pending: usize, timeout: Duration) {
        self.timeout_occurred.store(true, Ordering::Release);
        if self.config.suppress_logging_on_timeout {
            return;
        }
        warn!(
            event = events::SHUTDOWN_TIMEOUT,
            component = COMPONENT,
            pending,
            timeout_ms = fields::millis(timeout),
            shutdown_now = self.config.shutdown_now_on_timeout,
            "timeout waiting for inflight exchanges to complete"
        );
        if !self.config.log_inflight_exchanges_on_timeout {
            return;
        }
        for route in routes {
            for inflight in self.inflight.browse(Some(&route.id), INFLIGHT_LOG_LIMIT) {
                warn!(
                    event = events::SHUTDOWN_INFLIGHT,
                    component = COMPONENT,
                    route_id = %inflight.route_id,
                    exchange_id = %inflight.exchange_id,
                    from_endpoint = fields::or_none(inflight.from_endpoint.as_deref()),
                    elapsed_ms = fields::millis(inflight.elapsed()),
                    "exchange still inflight"
                );
            }
        }
    }
}

/// Work a still-running consumer holds for a route that must complete all tasks.
fn backlog(route: &Route) -> usize {
    if route.running_task() != ShutdownRunningTask::CompleteAllTasks {
        return 0;
    }
    route
        .consumer()
        .filter(|consumer| consumer.status().is_started())
        .map_or(0, |consumer| consumer.get().pending_exchanges())
}
