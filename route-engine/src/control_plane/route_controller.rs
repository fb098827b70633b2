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

//! Route lifecycle orchestration: add, start, stop, suspend, resume, remove.
//!
//! Each route carries its own transition gate, so operations on different
//! routes proceed independently while operations on one route are serialized.
//! Policy callbacks fire once per effective transition.
//!
//! With supervising enabled, a route that fails to start does not fail the
//! controller. It is retried from a background task on a backoff schedule
//! until it starts, is stopped or removed, or runs out of attempts.

use crate::config::SupervisingConfig;
use crate::control_plane::endpoint_registry::{EndpointRegistry, RouteSetup};
use crate::control_plane::route::{
    ResolvedStep, Route, RouteDefinition, RoutePipeline, RouteStep,
};
use crate::control_plane::route_policy::RouteHandle;
use crate::control_plane::route_table::RouteTable;
use crate::control_plane::shutdown_strategy::ShutdownStrategy;
use crate::data_plane::inflight::InflightRepository;
use crate::data_plane::producer_cache::ProducerCache;
use crate::endpoint::Endpoint;
use crate::error::EngineError;
use crate::observability::{events, fields};
use crate::routing::uri::EndpointUri;
use crate::runtime::worker_runtime::{spawn_worker, StopSignal, WorkerHandle};
use crate::service::ServiceStatus;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

const COMPONENT: &str = "route_controller";

pub(crate) struct ControllerInner {
    registry: Arc<EndpointRegistry>,
    producers: Arc<ProducerCache>,
    inflight: Arc<InflightRepository>,
    shutdown: Arc<ShutdownStrategy>,
    table: RouteTable,
    setup: tokio::sync::Mutex<()>,
    running: AtomicBool,
    supervising: SupervisingConfig,
    restarts: Mutex<HashMap<String, WorkerHandle>>,
    exhausted: Mutex<BTreeSet<String>>,
}

/// Owns the routes of a context and drives their lifecycle.
#[derive(Clone)]
pub struct RouteController {
    inner: Arc<ControllerInner>,
}

impl RouteController {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        producers: Arc<ProducerCache>,
        inflight: Arc<InflightRepository>,
        shutdown: Arc<ShutdownStrategy>,
        supervising: SupervisingConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                registry,
                producers,
                inflight,
                shutdown,
                table: RouteTable::new(),
                setup: tokio::sync::Mutex::new(()),
                running: AtomicBool::new(false),
                supervising,
                restarts: Mutex::new(HashMap::new()),
                exhausted: Mutex::new(BTreeSet::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<ControllerInner>) -> Self {
        Self { inner }
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn route_status(&self, route_id: &str) -> Option<ServiceStatus> {
        self.inner.table.get(route_id).map(|route| route.status())
    }

    pub fn route_ids(&self) -> Vec<String> {
        self.inner.table.ids()
    }

    pub fn route_count(&self) -> usize {
        self.inner.table.len()
    }

    /// Number of exchanges currently inside the given route.
    pub fn inflight_count(&self, route_id: &str) -> usize {
        self.inner.inflight.route_size(route_id)
    }

    /// Routes waiting on a supervised restart, sorted by id.
    pub fn restarting_route_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .restarts
            .lock()
            .iter()
            .filter(|(_, worker)| !worker.is_finished())
            .map(|(route_id, _)| route_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Routes whose supervised restarts ran out of attempts, sorted by id.
    pub fn exhausted_route_ids(&self) -> Vec<String> {
        self.inner.exhausted.lock().iter().cloned().collect()
    }

    /// Registers a route, resolving its endpoints as static registry entries.
    ///
    /// The route starts right away when the controller is running and the
    /// definition auto-starts.
    pub async fn add_route(&self, definition: RouteDefinition) -> Result<(), EngineError> {
        definition.validate()?;
        let guard = self.inner.setup.lock().await;
        let route_id = definition.id().to_string();
        if self.inner.table.contains(&route_id) {
            return Err(EngineError::DuplicateRoute(route_id));
        }
        if let (true, Some(order)) = (self.is_running(), definition.get_startup_order()) {
            let existing = self.inner.table.snapshot();
            if let Some(clash) = existing
                .iter()
                .find(|route| route.definition.get_startup_order() == Some(order))
            {
                return Err(EngineError::StartupOrderClash {
                    order,
                    first_route: clash.id.clone(),
                    second_route: route_id,
                });
            }
        }

        let mut setup = self.inner.registry.begin_route_setup(&route_id);
        let (from, steps) = match resolve_route_endpoints(&mut setup, &definition).await {
            Ok(resolved) => resolved,
            Err(err) => {
                setup.abandon();
                warn!(
                    event = events::ROUTE_ADD_FAILED,
                    component = COMPONENT,
                    route_id = %route_id,
                    err = %err,
                    "unable to add route"
                );
                return Err(err);
            }
        };
        let referenced = setup.resolved().len();

        let handle = RouteHandle::new(&route_id, Arc::downgrade(&self.inner));
        let pipeline = Arc::new(RoutePipeline::new(
            &route_id,
            &from,
            steps,
            self.inner.producers.clone(),
            self.inner.inflight.clone(),
            definition.policies().to_vec(),
            handle.clone(),
        ));
        let seq = self.inner.table.next_seq();
        let auto_startup = definition.is_auto_startup();
        let route = Arc::new(Route::new(definition, seq, from, pipeline, handle));
        self.inner.table.insert_route(route.clone());

        for policy in route.policies() {
            policy.on_init(&route.handle).await;
        }
        info!(
            event = events::ROUTE_ADD_OK,
            component = COMPONENT,
            route_id = %route_id,
            endpoints = referenced,
            "route added"
        );
        drop(guard);

        if auto_startup && self.is_running() {
            self.start_supervised(&route_id).await?;
        }
        Ok(())
    }

    pub async fn start_route(&self, route_id: &str) -> Result<(), EngineError> {
        let route = self.route(route_id)?;
        let _gate = route.state.transition().await;
        match route.status() {
            ServiceStatus::Started => Ok(()),
            ServiceStatus::Suspended => self.resume_locked(&route).await,
            ServiceStatus::Shutdown => Err(EngineError::illegal_state(format!(
                "route {route_id} has been removed"
            ))),
            _ => self.start_locked(&route).await,
        }
    }

    /// Gracefully stops a route. Returns `false` when inflight exchanges did not
    /// complete within the route's shutdown timeout.
    pub async fn stop_route(&self, route_id: &str) -> Result<bool, EngineError> {
        let route = self.route(route_id)?;
        let timeout = route
            .shutdown_timeout()
            .unwrap_or_else(|| self.inner.shutdown.timeout());
        self.stop_route_inner(&route, timeout).await
    }

    pub async fn stop_route_with_timeout(
        &self,
        route_id: &str,
        timeout: Duration,
    ) -> Result<bool, EngineError> {
        let route = self.route(route_id)?;
        self.stop_route_inner(&route, timeout).await
    }

    pub async fn suspend_route(&self, route_id: &str) -> Result<(), EngineError> {
        let route = self.route(route_id)?;
        let _gate = route.state.transition().await;
        match route.status() {
            ServiceStatus::Suspended => Ok(()),
            ServiceStatus::Started => {
                route.state.set(ServiceStatus::Suspending);
                let timeout = route
                    .shutdown_timeout()
                    .unwrap_or_else(|| self.inner.shutdown.timeout());
                let drained = match self
                    .inner
                    .shutdown
                    .shutdown_routes(std::slice::from_ref(&route), timeout, true)
                    .await
                {
                    Ok(drained) => drained,
                    Err(err) => {
                        route.state.set(ServiceStatus::Started);
                        return Err(err);
                    }
                };
                route.state.set(ServiceStatus::Suspended);
                for policy in route.policies() {
                    policy.on_suspend(&route.handle).await;
                }
                info!(
                    event = events::ROUTE_SUSPEND,
                    component = COMPONENT,
                    route_id,
                    drained,
                    "route suspended"
                );
                Ok(())
            }
            other => Err(EngineError::illegal_state(format!(
                "cannot suspend route {route_id} while {other}"
            ))),
        }
    }

    pub async fn resume_route(&self, route_id: &str) -> Result<(), EngineError> {
        let route = self.route(route_id)?;
        let _gate = route.state.transition().await;
        match route.status() {
            ServiceStatus::Started => Ok(()),
            ServiceStatus::Suspended => self.resume_locked(&route).await,
            other => Err(EngineError::illegal_state(format!(
                "cannot resume route {route_id} while {other}"
            ))),
        }
    }

    /// Removes a stopped route, releasing the endpoints only it referenced.
    pub async fn remove_route(&self, route_id: &str) -> Result<(), EngineError> {
        let _setup = self.inner.setup.lock().await;
        let route = self.route(route_id)?;
        self.cancel_restart(route_id).await;
        let _gate = route.state.transition().await;
        let status = route.status();
        if !status.is_stopped() {
            return Err(EngineError::illegal_state(format!(
                "route {route_id} must be stopped before it can be removed (currently {status})"
            )));
        }

        if let Some(consumer) = route.consumer() {
            if let Err(err) = consumer.shutdown().await {
                warn!(
                    event = events::ROUTE_REMOVE_FAILED,
                    component = COMPONENT,
                    route_id,
                    err = %err,
                    "route consumer shutdown failed"
                );
            }
        }
        self.inner.table.remove_route(route_id);

        let released = self.inner.registry.remove_route_endpoints(route_id);
        for uri in &released {
            if let Ok(uri) = EndpointUri::parse(uri) {
                self.inner.producers.evict(&uri).await;
            }
        }

        for policy in route.policies() {
            policy.on_remove(&route.handle).await;
        }
        route.state.set(ServiceStatus::Shutdown);
        info!(
            event = events::ROUTE_REMOVE_OK,
            component = COMPONENT,
            route_id,
            released_endpoints = released.len(),
            "route removed"
        );
        Ok(())
    }

    /// Starts every auto-startup route: explicit startup orders ascending, then
    /// the rest in insertion order. Two routes sharing a startup order fail the
    /// whole call before any route starts.
    ///
    /// Without supervising the first route that fails to start fails the call.
    /// With it, the failed route is handed to a backoff restart and the
    /// remaining routes still start.
    pub async fn start_all_routes(&self) -> Result<(), EngineError> {
        let mut routes = self.inner.table.snapshot();
        detect_startup_order_clash(&routes)?;
        routes.sort_by_key(|route| route.startup_key());
        for route in routes {
            if route.definition.is_auto_startup() {
                self.start_supervised(&route.id).await?;
            }
        }
        Ok(())
    }

    /// Gracefully stops every started or suspended route in one shutdown pass.
    /// Returns `false` when inflight exchanges did not drain in time.
    pub async fn stop_all_routes(&self) -> Result<bool, EngineError> {
        let routes = self.inner.table.snapshot();
        let mut gates = Vec::with_capacity(routes.len());
        for route in &routes {
            gates.push(route.state.transition().await);
        }

        let active: Vec<Arc<Route>> = routes
            .iter()
            .filter(|route| {
                matches!(
                    route.status(),
                    ServiceStatus::Started | ServiceStatus::Suspended
                )
            })
            .cloned()
            .collect();
        if active.is_empty() {
            return Ok(true);
        }
        for route in &active {
            route.state.set(ServiceStatus::Stopping);
        }

        let outcome = self
            .inner
            .shutdown
            .shutdown_routes(&active, self.inner.shutdown.timeout(), false)
            .await;
        for route in &active {
            route.state.set(ServiceStatus::Stopped);
            for policy in route.policies() {
                policy.on_stop(&route.handle).await;
            }
        }
        drop(gates);
        info!(
            event = events::ROUTE_STOP_ALL,
            component = COMPONENT,
            routes = active.len(),
            "stopped all routes"
        );
        outcome
    }

    /// Marks the controller running; routes added afterwards auto-start.
    pub async fn start(&self) -> Result<(), EngineError> {
        self.inner.exhausted.lock().clear();
        self.inner.running.store(true, Ordering::Release);
        if let Err(err) = self.start_all_routes().await {
            self.inner.running.store(false, Ordering::Release);
            return Err(err);
        }
        Ok(())
    }

    pub async fn stop(&self) -> Result<bool, EngineError> {
        self.inner.running.store(false, Ordering::Release);
        let restarts: Vec<WorkerHandle> = self
            .inner
            .restarts
            .lock()
            .drain()
            .map(|(_, worker)| worker)
            .collect();
        for worker in restarts {
            worker.stop().await;
        }
        self.stop_all_routes().await
    }

    async fn start_supervised(&self, route_id: &str) -> Result<(), EngineError> {
        match self.start_route(route_id).await {
            Err(err)
                if self.inner.supervising.enabled
                    && !matches!(err, EngineError::RouteNotFound(_)) =>
            {
                self.schedule_restart(route_id, &err).await;
                Ok(())
            }
            outcome => outcome,
        }
    }

    async fn schedule_restart(&self, route_id: &str, cause: &EngineError) {
        self.cancel_restart(route_id).await;
        let supervising = self.inner.supervising.clone();
        info!(
            event = events::ROUTE_RESTART_SCHEDULED,
            component = COMPONENT,
            route_id,
            err = %cause,
            delay_ms = fields::millis(supervising.delay_for(1)),
            "route failed to start; restarting with backoff"
        );
        self.inner.exhausted.lock().remove(route_id);
        let controller = Arc::downgrade(&self.inner);
        let id = route_id.to_string();
        let worker = spawn_worker(format!("route-restart[{route_id}]"), move |stop| {
            supervise(controller, id, supervising, stop)
        });
        self.inner.restarts.lock().insert(route_id.to_string(), worker);
    }

    /// Stops a pending restart, waiting out a start attempt already under way.
    async fn cancel_restart(&self, route_id: &str) {
        let worker = self.inner.restarts.lock().remove(route_id);
        if let Some(worker) = worker {
            worker.stop().await;
        }
    }

    fn route(&self, route_id: &str) -> Result<Arc<Route>, EngineError> {
        self.inner
            .table
            .get(route_id)
            .ok_or_else(|| EngineError::RouteNotFound(route_id.to_string()))
    }

    async fn start_locked(&self, route: &Arc<Route>) -> Result<(), EngineError> {
        route.state.set(ServiceStatus::Starting);
        let started = match route.ensure_consumer().await {
            Ok(consumer) => consumer.start().await,
            Err(err) => Err(err),
        };
        if let Err(err) = started {
            route.state.set(ServiceStatus::Failed);
            warn!(
                event = events::ROUTE_START_FAILED,
                component = COMPONENT,
                route_id = %route.id,
                err = %err,
                "route failed to start"
            );
            return Err(err);
        }
        route.state.set(ServiceStatus::Started);
        for policy in route.policies() {
            policy.on_start(&route.handle).await;
        }
        info!(
            event = events::ROUTE_START_OK,
            component = COMPONENT,
            route_id = %route.id,
            from = %route.from.uri().sanitized(),
            "route started"
        );
        Ok(())
    }

    async fn resume_locked(&self, route: &Arc<Route>) -> Result<(), EngineError> {
        route.state.set(ServiceStatus::Resuming);
        if let Some(consumer) = route.consumer() {
            if let Err(err) = consumer.resume().await {
                route.state.set(ServiceStatus::Suspended);
                return Err(err);
            }
        }
        route.state.set(ServiceStatus::Started);
        for policy in route.policies() {
            policy.on_resume(&route.handle).await;
        }
        debug!(
            event = events::ROUTE_RESUME,
            component = COMPONENT,
            route_id = %route.id,
            "route resumed"
        );
        Ok(())
    }

    async fn stop_route_inner(
        &self,
        route: &Arc<Route>,
        timeout: Duration,
    ) -> Result<bool, EngineError> {
        self.cancel_restart(&route.id).await;
        let _gate = route.state.transition().await;
        match route.status() {
            ServiceStatus::New | ServiceStatus::Stopped => Ok(true),
            ServiceStatus::Shutdown => Err(EngineError::illegal_state(format!(
                "route {} has been removed",
                route.id
            ))),
            ServiceStatus::Failed => {
                if let Some(consumer) = route.consumer() {
                    // moves the consumer out of Failed without running its stop hook
                    if let Err(err) = consumer.stop().await {
                        warn!(
                            event = events::SHUTDOWN_CONSUMER_FAILED,
                            component = COMPONENT,
                            route_id = %route.id,
                            err = %err,
                            "unable to stop failed route consumer"
                        );
                    }
                }
                route.state.set(ServiceStatus::Stopped);
                Ok(true)
            }
            previous => {
                route.state.set(ServiceStatus::Stopping);
                let drained = match self
                    .inner
                    .shutdown
                    .shutdown_routes(std::slice::from_ref(route), timeout, false)
                    .await
                {
                    Ok(drained) => drained,
                    Err(err) => {
                        route.state.set(previous);
                        return Err(err);
                    }
                };
                route.state.set(ServiceStatus::Stopped);
                for policy in route.policies() {
                    policy.on_stop(&route.handle).await;
                }
                info!(
                    event = events::ROUTE_STOP_OK,
                    component = COMPONENT,
                    route_id = %route.id,
                    drained,
                    "route stopped"
                );
                Ok(drained)
            }
        }
    }
}

/// Retries a failed route start until it succeeds, the route is gone, the
/// controller stops or the attempts run out.
async fn supervise(
    weak: Weak<ControllerInner>,
    route_id: String,
    supervising: SupervisingConfig,
    mut stop: StopSignal,
) {
    let mut attempts: u64 = 0;
    loop {
        attempts += 1;
        if stop.sleep(supervising.delay_for(attempts)).await {
            return;
        }
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let controller = RouteController::from_inner(inner);
        if !controller.is_running() {
            return;
        }
        match controller.start_route(&route_id).await {
            Ok(()) => {
                info!(
                    event = events::ROUTE_RESTART_OK,
                    component = COMPONENT,
                    route_id = %route_id,
                    attempts,
                    "route restarted"
                );
                return;
            }
            Err(EngineError::RouteNotFound(_)) => return,
            Err(err) if supervising.attempts_exhausted(attempts) => {
                warn!(
                    event = events::ROUTE_RESTART_EXHAUSTED,
                    component = COMPONENT,
                    route_id = %route_id,
                    attempts,
                    err = %err,
                    "giving up restarting route"
                );
                controller.inner.exhausted.lock().insert(route_id);
                return;
            }
            Err(err) => warn!(
                event = events::ROUTE_RESTART_FAILED,
                component = COMPONENT,
                route_id = %route_id,
                attempts,
                err = %err,
                next_delay_ms = fields::millis(supervising.delay_for(attempts + 1)),
                "route restart failed"
            ),
        }
    }
}

async fn resolve_route_endpoints(
    setup: &mut RouteSetup<'_>,
    definition: &RouteDefinition,
) -> Result<(Arc<dyn Endpoint>, Vec<ResolvedStep>), EngineError> {
    let from = setup.resolve(definition.from_uri()).await?;
    if from.as_consumable().is_none() {
        return Err(EngineError::UnsupportedCapability {
            uri: from.uri().sanitized(),
            capability: "consumer".to_string(),
        });
    }

    let mut steps = Vec::with_capacity(definition.steps().len());
    for step in definition.steps() {
        match step {
            RouteStep::Process(processor) => steps.push(ResolvedStep::Process(processor.clone())),
            RouteStep::To(uri) => {
                let endpoint = setup.resolve(uri).await?;
                if endpoint.as_producible().is_none() {
                    return Err(EngineError::UnsupportedCapability {
                        uri: endpoint.uri().sanitized(),
                        capability: "producer".to_string(),
                    });
                }
                steps.push(ResolvedStep::To(endpoint));
            }
        }
    }
    Ok((from, steps))
}

/// Fails when two routes share an explicit startup order, naming them in insertion order.
fn detect_startup_order_clash(routes: &[Arc<Route>]) -> Result<(), EngineError> {
    let mut seen: HashMap<i32, &str> = HashMap::new();
    for route in routes {
        let Some(order) = route.definition.get_startup_order() else {
            continue;
        };
        if let Some(first) = seen.get(&order) {
            warn!(
                event = events::ROUTE_STARTUP_ORDER_CLASH,
                component = COMPONENT,
                order,
                first_route = *first,
                second_route = %route.id,
                "duplicate startup order"
            );
            return Err(EngineError::StartupOrderClash {
                order,
                first_route: first.to_string(),
                second_route: route.id.clone(),
            });
        }
        seen.insert(order, &route.id);
    }
    Ok(())
}
