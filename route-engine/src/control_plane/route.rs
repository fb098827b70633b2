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

//! Route definitions and the per-route runtime state.

use crate::control_plane::route_policy::{RouteHandle, RoutePolicy};
use crate::control_plane::shutdown_strategy::{ShutdownRoute, ShutdownRunningTask};
use crate::data_plane::inflight::InflightRepository;
use crate::data_plane::producer_cache::ProducerCache;
use crate::endpoint::{Consumer, Endpoint, Processor};
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::service::{ManagedService, ServiceState, ServiceStatus};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// One step of a route, applied in declaration order.
#[derive(Clone)]
pub enum RouteStep {
    To(String),
    Process(Arc<dyn Processor>),
}

impl Debug for RouteStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteStep::To(uri) => f.debug_tuple("To").field(uri).finish(),
            RouteStep::Process(_) => f.write_str("Process(..)"),
        }
    }
}

/// Declarative description of a route: one input endpoint and ordered steps.
#[derive(Clone)]
pub struct RouteDefinition {
    id: String,
    from: String,
    steps: Vec<RouteStep>,
    auto_startup: bool,
    startup_order: Option<i32>,
    shutdown_timeout: Option<Duration>,
    shutdown_route: ShutdownRoute,
    shutdown_running_task: ShutdownRunningTask,
    policies: Vec<Arc<dyn RoutePolicy>>,
}

impl RouteDefinition {
    pub fn new(id: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            from: from.into(),
            steps: Vec::new(),
            auto_startup: true,
            startup_order: None,
            shutdown_timeout: None,
            shutdown_route: ShutdownRoute::Default,
            shutdown_running_task: ShutdownRunningTask::CompleteCurrentTaskOnly,
            policies: Vec::new(),
        }
    }

    pub fn to(mut self, uri: impl Into<String>) -> Self {
        self.steps.push(RouteStep::To(uri.into()));
        self
    }

    pub fn process(mut self, processor: Arc<dyn Processor>) -> Self {
        self.steps.push(RouteStep::Process(processor));
        self
    }

    pub fn auto_startup(mut self, auto_startup: bool) -> Self {
        self.auto_startup = auto_startup;
        self
    }

    pub fn startup_order(mut self, order: i32) -> Self {
        self.startup_order = Some(order);
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = Some(timeout);
        self
    }

    /// `Defer` keeps the route consuming while the other routes drain, so
    /// they can still hand exchanges to it. Deferred routes stop last.
    pub fn shutdown_route(mut self, shutdown_route: ShutdownRoute) -> Self {
        self.shutdown_route = shutdown_route;
        self
    }

    pub fn shutdown_running_task(mut self, task: ShutdownRunningTask) -> Self {
        self.shutdown_running_task = task;
        self
    }

    pub fn route_policy(mut self, policy: Arc<dyn RoutePolicy>) -> Self {
        self.policies.push(policy);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn from_uri(&self) -> &str {
        &self.from
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn is_auto_startup(&self) -> bool {
        self.auto_startup
    }

    pub fn get_startup_order(&self) -> Option<i32> {
        self.startup_order
    }

    pub fn get_shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout
    }

    pub fn get_shutdown_route(&self) -> ShutdownRoute {
        self.shutdown_route
    }

    pub fn get_shutdown_running_task(&self) -> ShutdownRunningTask {
        self.shutdown_running_task
    }

    pub fn policies(&self) -> &[Arc<dyn RoutePolicy>] {
        &self.policies
    }

    pub(crate) fn validate(&self) -> Result<(), EngineError> {
        if self.id.trim().is_empty() {
            return Err(EngineError::InvalidRoute {
                route_id: self.id.clone(),
                reason: "route id must not be empty".to_string(),
            });
        }
        if self.steps.is_empty() {
            return Err(EngineError::InvalidRoute {
                route_id: self.id.clone(),
                reason: format!("missing route output for input {}", self.from),
            });
        }
        Ok(())
    }
}

impl Debug for RouteDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("id", &self.id)
            .field("from", &self.from)
            .field("steps", &self.steps)
            .field("auto_startup", &self.auto_startup)
            .field("startup_order", &self.startup_order)
            .field("shutdown_route", &self.shutdown_route)
            .field("shutdown_running_task", &self.shutdown_running_task)
            .field("policies", &self.policies.len())
            .finish()
    }
}

pub(crate) enum ResolvedStep {
    To(Arc<dyn Endpoint>),
    Process(Arc<dyn Processor>),
}

/// Removes the exchange from the inflight repository however processing ends.
struct InflightGuard<'a> {
    repository: &'a InflightRepository,
    exchange_id: Uuid,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.repository.remove(self.exchange_id);
    }
}

/// The processor a route's consumer feeds: policies, inflight tracking and steps.
pub(crate) struct RoutePipeline {
    route_id: String,
    from_uri: String,
    steps: Vec<ResolvedStep>,
    producers: Arc<ProducerCache>,
    inflight: Arc<InflightRepository>,
    policies: Vec<Arc<dyn RoutePolicy>>,
    handle: RouteHandle,
}

impl RoutePipeline {
    pub(crate) fn new(
        route_id: &str,
        from: &Arc<dyn Endpoint>,
        steps: Vec<ResolvedStep>,
        producers: Arc<ProducerCache>,
        inflight: Arc<InflightRepository>,
        policies: Vec<Arc<dyn RoutePolicy>>,
        handle: RouteHandle,
    ) -> Self {
        Self {
            route_id: route_id.to_string(),
            from_uri: from.uri().as_str().to_string(),
            steps,
            producers,
            inflight,
            policies,
            handle,
        }
    }

    async fn run_steps(&self, exchange: &mut Exchange) -> Result<(), EngineError> {
        for step in &self.steps {
            match step {
                ResolvedStep::Process(processor) => processor.process(exchange).await?,
                ResolvedStep::To(endpoint) => self.producers.send(endpoint, exchange).await?,
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Processor for RoutePipeline {
    async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError> {
        exchange.set_route_id(self.route_id.as_str());
        if exchange.from_endpoint().is_none() {
            exchange.set_from_endpoint(self.from_uri.as_str());
        }
        for policy in &self.policies {
            policy.on_exchange_begin(&self.handle, exchange);
        }

        let outcome = {
            self.inflight.add(exchange, &self.route_id);
            let _inflight = InflightGuard {
                repository: &self.inflight,
                exchange_id: exchange.id(),
            };
            self.run_steps(exchange).await
        };
        if let Err(err) = &outcome {
            exchange.set_failure(err.to_string());
        }

        for policy in &self.policies {
            policy.on_exchange_done(&self.handle, exchange);
        }
        outcome
    }
}

/// Runtime state of an added route.
pub(crate) struct Route {
    pub(crate) id: String,
    pub(crate) seq: usize,
    pub(crate) definition: RouteDefinition,
    pub(crate) from: Arc<dyn Endpoint>,
    pub(crate) pipeline: Arc<RoutePipeline>,
    pub(crate) handle: RouteHandle,
    pub(crate) state: ServiceState,
    consumer: Mutex<Option<Arc<ManagedService<dyn Consumer>>>>,
}

impl Route {
    pub(crate) fn new(
        definition: RouteDefinition,
        seq: usize,
        from: Arc<dyn Endpoint>,
        pipeline: Arc<RoutePipeline>,
        handle: RouteHandle,
    ) -> Self {
        Self {
            id: definition.id.clone(),
            seq,
            definition,
            from,
            pipeline,
            handle,
            state: ServiceState::new(),
            consumer: Mutex::new(None),
        }
    }

    pub(crate) fn status(&self) -> ServiceStatus {
        self.state.status()
    }

    pub(crate) fn policies(&self) -> &[Arc<dyn RoutePolicy>] {
        &self.definition.policies
    }

    pub(crate) fn consumer(&self) -> Option<Arc<ManagedService<dyn Consumer>>> {
        self.consumer.lock().clone()
    }

    /// Returns the route consumer, creating it on first use.
    pub(crate) async fn ensure_consumer(
        &self,
    ) -> Result<Arc<ManagedService<dyn Consumer>>, EngineError> {
        if let Some(existing) = self.consumer() {
            return Ok(existing);
        }
        let consumable = self.from.as_consumable().ok_or_else(|| {
            EngineError::UnsupportedCapability {
                uri: self.from.uri().sanitized(),
                capability: "consumer".to_string(),
            }
        })?;
        let processor: Arc<dyn Processor> = self.pipeline.clone();
        let consumer = consumable.create_consumer(processor).await?;
        let managed = Arc::new(ManagedService::new(
            format!("consumer[{}]", self.from.uri().sanitized()),
            consumer,
        ));
        *self.consumer.lock() = Some(managed.clone());
        Ok(managed)
    }

    /// Ordering key: explicit startup orders first, then insertion order.
    pub(crate) fn startup_key(&self) -> (bool, i32, usize) {
        match self.definition.startup_order {
            Some(order) => (false, order, self.seq),
            None => (true, 0, self.seq),
        }
    }

    pub(crate) fn shutdown_timeout(&self) -> Option<Duration> {
        self.definition.shutdown_timeout
    }

    pub(crate) fn running_task(&self) -> ShutdownRunningTask {
        self.definition.shutdown_running_task
    }

    /// Whether the route keeps consuming until the others have drained,
    /// either by definition or because its consumer asks for it.
    pub(crate) fn defers_shutdown(&self) -> bool {
        if self.definition.shutdown_route == ShutdownRoute::Defer {
            return true;
        }
        self.consumer()
            .is_some_and(|consumer| consumer.get().defers_shutdown(self.running_task()))
    }
}
