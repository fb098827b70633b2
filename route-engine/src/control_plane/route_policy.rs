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

//! Route policies: callbacks on route transitions and around each exchange.

use crate::control_plane::route_controller::{ControllerInner, RouteController};
use crate::exchange::Exchange;
use crate::observability::{events, fields};
use crate::service::ServiceStatus;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

const COMPONENT: &str = "route_policy";

/// Reference to a route handed to policies.
///
/// Holds the controller weakly; requests made after the controller is gone are ignored.
#[derive(Clone)]
pub struct RouteHandle {
    route_id: Arc<str>,
    controller: Weak<ControllerInner>,
}

impl RouteHandle {
    pub(crate) fn new(route_id: &str, controller: Weak<ControllerInner>) -> Self {
        Self {
            route_id: Arc::from(route_id),
            controller,
        }
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn status(&self) -> Option<ServiceStatus> {
        let inner = self.controller.upgrade()?;
        RouteController::from_inner(inner).route_status(&self.route_id)
    }

    /// Stops the route from a separate task so callers inside the route never wait on themselves.
    pub fn request_stop(&self) {
        let Some(inner) = self.controller.upgrade() else {
            return;
        };
        let route_id = self.route_id.clone();
        tokio::spawn(async move {
            let controller = RouteController::from_inner(inner);
            if let Err(err) = controller.stop_route(&route_id).await {
                warn!(
                    event = events::ROUTE_STOP_FAILED,
                    component = COMPONENT,
                    route_id = %route_id,
                    err = %err,
                    "requested route stop failed"
                );
            }
        });
    }

    pub fn request_suspend(&self) {
        let Some(inner) = self.controller.upgrade() else {
            return;
        };
        let route_id = self.route_id.clone();
        tokio::spawn(async move {
            let controller = RouteController::from_inner(inner);
            if let Err(err) = controller.suspend_route(&route_id).await {
                warn!(
                    event = events::ROUTE_SUSPEND_FAILED,
                    component = COMPONENT,
                    route_id = %route_id,
                    err = %err,
                    "requested route suspend failed"
                );
            }
        });
    }
}

/// Callbacks fired once per effective route transition, plus per-exchange hooks.
#[async_trait]
pub trait RoutePolicy: Send + Sync {
    async fn on_init(&self, _route: &RouteHandle) {}

    async fn on_start(&self, _route: &RouteHandle) {}

    async fn on_stop(&self, _route: &RouteHandle) {}

    async fn on_suspend(&self, _route: &RouteHandle) {}

    async fn on_resume(&self, _route: &RouteHandle) {}

    async fn on_remove(&self, _route: &RouteHandle) {}

    fn on_exchange_begin(&self, _route: &RouteHandle, _exchange: &Exchange) {}

    fn on_exchange_done(&self, _route: &RouteHandle, _exchange: &Exchange) {}
}

struct ArmedTimer {
    task: JoinHandle<()>,
    deadline: Instant,
}

/// Stops its route after a maximum running time and/or a maximum number of exchanges.
///
/// Time spent suspended does not count against the maximum duration: suspending
/// the route parks the remaining time and resuming re-arms the timer with it.
pub struct DurationRoutePolicy {
    max_duration: Option<Duration>,
    max_messages: Option<u64>,
    completed: AtomicU64,
    triggered: AtomicBool,
    timer: Mutex<Option<ArmedTimer>>,
    remaining: Mutex<Option<Duration>>,
}

impl DurationRoutePolicy {
    pub fn new(max_duration: Option<Duration>, max_messages: Option<u64>) -> Self {
        Self {
            max_duration,
            max_messages,
            completed: AtomicU64::new(0),
            triggered: AtomicBool::new(false),
            timer: Mutex::new(None),
            remaining: Mutex::new(None),
        }
    }

    pub fn with_max_duration(max_duration: Duration) -> Self {
        Self::new(Some(max_duration), None)
    }

    pub fn with_max_messages(max_messages: u64) -> Self {
        Self::new(None, Some(max_messages))
    }

    pub fn completed_exchanges(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn arm(&self, route: &RouteHandle, after: Duration) {
        let Some(max_duration) = self.max_duration else {
            return;
        };
        let route = route.clone();
        let deadline = Instant::now() + after;
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            info!(
                event = events::ROUTE_POLICY_TRIGGERED,
                component = COMPONENT,
                route_id = route.route_id(),
                max_duration_ms = fields::millis(max_duration),
                "maximum route duration reached; stopping route"
            );
            route.request_stop();
        });
        if let Some(previous) = self.timer.lock().replace(ArmedTimer { task, deadline }) {
            previous.task.abort();
        }
    }

    /// Aborts the running timer and returns how much of its time was left.
    fn cancel_timer(&self) -> Option<Duration> {
        let timer = self.timer.lock().take()?;
        timer.task.abort();
        Some(timer.deadline.saturating_duration_since(Instant::now()))
    }
}

#[async_trait]
impl RoutePolicy for DurationRoutePolicy {
    async fn on_start(&self, route: &RouteHandle) {
        self.triggered.store(false, Ordering::Release);
        self.completed.store(0, Ordering::Release);
        self.remaining.lock().take();
        if let Some(max_duration) = self.max_duration {
            self.arm(route, max_duration);
        }
    }

    async fn on_stop(&self, _route: &RouteHandle) {
        self.cancel_timer();
        self.remaining.lock().take();
    }

    async fn on_suspend(&self, _route: &RouteHandle) {
        if let Some(left) = self.cancel_timer() {
            *self.remaining.lock() = Some(left);
        }
    }

    async fn on_resume(&self, route: &RouteHandle) {
        let parked = self.remaining.lock().take();
        if let Some(left) = parked.or(self.max_duration) {
            self.arm(route, left);
        }
    }

    async fn on_remove(&self, _route: &RouteHandle) {
        self.cancel_timer();
        self.remaining.lock().take();
    }

    fn on_exchange_done(&self, route: &RouteHandle, _exchange: &Exchange) {
        let completed = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        let Some(max_messages) = self.max_messages else {
            return;
        };
        if completed >= max_messages && !self.triggered.swap(true, Ordering::AcqRel) {
            info!(
                event = events::ROUTE_POLICY_TRIGGERED,
                component = COMPONENT,
                route_id = route.route_id(),
                max_messages,
                "maximum message count reached; stopping route"
            );
            route.request_stop();
        }
    }
}
