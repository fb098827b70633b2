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

//! The engine's root object: owns every registry, cache and the route controller.

use crate::components::{DirectComponent, LogComponent, QueueComponent, SchedulerComponent};
use crate::config::EngineConfig;
use crate::control_plane::component_registry::ComponentRegistry;
use crate::control_plane::endpoint_registry::EndpointRegistry;
use crate::control_plane::route::RouteDefinition;
use crate::control_plane::route_controller::RouteController;
use crate::control_plane::shutdown_strategy::ShutdownStrategy;
use crate::data_plane::consumer_cache::ConsumerCache;
use crate::data_plane::inflight::InflightRepository;
use crate::data_plane::producer_cache::ProducerCache;
use crate::endpoint::{Component, Endpoint};
use crate::error::EngineError;
use crate::observability::events;
use crate::service::{ServiceState, ServiceStatus};
use crate::template::{ConsumerTemplate, ProducerTemplate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const COMPONENT: &str = "route_context";

/// Components, endpoints, caches and routes of one engine instance.
pub struct RouteContext {
    config: EngineConfig,
    state: ServiceState,
    components: Arc<ComponentRegistry>,
    registry: Arc<EndpointRegistry>,
    producers: Arc<ProducerCache>,
    consumers: Arc<ConsumerCache>,
    inflight: Arc<InflightRepository>,
    shutdown: Arc<ShutdownStrategy>,
    routes: RouteController,
}

impl RouteContext {
    /// Creates a context without any component registered.
    pub fn new(config: EngineConfig) -> Self {
        let components = Arc::new(ComponentRegistry::new());
        let registry = Arc::new(EndpointRegistry::new(
            components.clone(),
            config.endpoint_registry_size,
        ));
        let producers = Arc::new(ProducerCache::new(
            config.name.as_str(),
            config.producer_cache_size,
            config.extended_statistics,
            config.statistics_max_entries,
        ));
        let consumers = Arc::new(ConsumerCache::new(
            config.name.as_str(),
            config.consumer_cache_size,
            config.extended_statistics,
            config.statistics_max_entries,
        ));
        let inflight = Arc::new(InflightRepository::new());
        let shutdown = Arc::new(ShutdownStrategy::new(
            config.shutdown.clone(),
            inflight.clone(),
        ));
        let routes = RouteController::new(
            registry.clone(),
            producers.clone(),
            inflight.clone(),
            shutdown.clone(),
            config.supervising.clone(),
        );
        Self {
            config,
            state: ServiceState::new(),
            components,
            registry,
            producers,
            consumers,
            inflight,
            shutdown,
            routes,
        }
    }

    /// Creates a context with the `direct`, `queue`, `log` and `scheduler` components.
    pub fn with_default_components(config: EngineConfig) -> Self {
        let context = Self::new(config);
        context.add_component("direct", Arc::new(DirectComponent::new()));
        context.add_component("queue", Arc::new(QueueComponent::new()));
        context.add_component("log", Arc::new(LogComponent::new()));
        context.add_component("scheduler", Arc::new(SchedulerComponent::new()));
        context
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn status(&self) -> ServiceStatus {
        self.state.status()
    }

    pub fn add_component(&self, scheme: &str, component: Arc<dyn Component>) {
        self.components.add(scheme, component);
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Resolves `uri` as a dynamic endpoint.
    pub async fn endpoint(&self, uri: &str) -> Result<Arc<dyn Endpoint>, EngineError> {
        self.registry.resolve(uri).await
    }

    pub fn endpoint_registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn producer_cache(&self) -> &ProducerCache {
        &self.producers
    }

    pub fn consumer_cache(&self) -> &ConsumerCache {
        &self.consumers
    }

    pub fn inflight_repository(&self) -> &InflightRepository {
        &self.inflight
    }

    pub fn shutdown_strategy(&self) -> &ShutdownStrategy {
        &self.shutdown
    }

    pub fn route_controller(&self) -> &RouteController {
        &self.routes
    }

    pub fn producer_template(&self) -> ProducerTemplate {
        ProducerTemplate::new(self.registry.clone(), self.producers.clone())
    }

    pub fn consumer_template(&self) -> ConsumerTemplate {
        ConsumerTemplate::new(self.registry.clone(), self.consumers.clone())
    }

    pub async fn add_route(&self, definition: RouteDefinition) -> Result<(), EngineError> {
        self.routes.add_route(definition).await
    }

    pub async fn start_route(&self, route_id: &str) -> Result<(), EngineError> {
        self.routes.start_route(route_id).await
    }

    pub async fn stop_route(&self, route_id: &str) -> Result<bool, EngineError> {
        self.routes.stop_route(route_id).await
    }

    pub async fn stop_route_with_timeout(
        &self,
        route_id: &str,
        timeout: Duration,
    ) -> Result<bool, EngineError> {
        self.routes.stop_route_with_timeout(route_id, timeout).await
    }

    pub async fn suspend_route(&self, route_id: &str) -> Result<(), EngineError> {
        self.routes.suspend_route(route_id).await
    }

    pub async fn resume_route(&self, route_id: &str) -> Result<(), EngineError> {
        self.routes.resume_route(route_id).await
    }

    pub async fn remove_route(&self, route_id: &str) -> Result<(), EngineError> {
        self.routes.remove_route(route_id).await
    }

    pub fn route_status(&self, route_id: &str) -> Option<ServiceStatus> {
        self.routes.route_status(route_id)
    }

    pub fn route_ids(&self) -> Vec<String> {
        self.routes.route_ids()
    }

    /// Starts the caches, then every auto-startup route. A startup-order clash
    /// leaves the context `Failed`.
    pub async fn start(&self) -> Result<(), EngineError> {
        let _gate = self.state.transition().await;
        match self.state.status() {
            ServiceStatus::Started => return Ok(()),
            ServiceStatus::Shutdown => {
                return Err(EngineError::illegal_state(format!(
                    "context {} is shut down",
                    self.config.name
                )))
            }
            _ => {}
        }

        self.state.set(ServiceStatus::Starting);
        self.producers.start();
        self.consumers.start();
        if let Err(err) = self.routes.start().await {
            self.state.set(ServiceStatus::Failed);
            warn!(
                event = events::CONTEXT_START_FAILED,
                component = COMPONENT,
                context = %self.config.name,
                err = %err,
                "context failed to start"
            );
            return Err(err);
        }
        self.state.set(ServiceStatus::Started);
        info!(
            event = events::CONTEXT_START_OK,
            component = COMPONENT,
            context = %self.config.name,
            routes = self.routes.route_count(),
            "context started"
        );
        Ok(())
    }

    /// Gracefully stops all routes, then the caches; dynamic endpoints are forgotten.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let _gate = self.state.transition().await;
        self.stop_locked().await
    }

    /// Stops the context, removes every route and clears the endpoint registry.
    /// The context cannot be started again.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let _gate = self.state.transition().await;
        if self.state.status() == ServiceStatus::Shutdown {
            return Ok(());
        }
        let stopped = self.stop_locked().await;
        for route_id in self.routes.route_ids() {
            if let Err(err) = self.routes.remove_route(&route_id).await {
                warn!(
                    event = events::ROUTE_REMOVE_FAILED,
                    component = COMPONENT,
                    route_id = %route_id,
                    err = %err,
                    "unable to remove route during shutdown"
                );
            }
        }
        self.registry.clear();
        self.state.set(ServiceStatus::Shutdown);
        info!(
            event = events::CONTEXT_SHUTDOWN,
            component = COMPONENT,
            context = %self.config.name,
            "context shut down"
        );
        stopped
    }

    async fn stop_locked(&self) -> Result<(), EngineError> {
        match self.state.status() {
            ServiceStatus::New | ServiceStatus::Stopped | ServiceStatus::Shutdown => {
                return Ok(())
            }
            _ => {}
        }
        self.state.set(ServiceStatus::Stopping);
        let routes = self.routes.stop().await;
        self.producers.stop().await;
        self.consumers.stop().await;
        let forgotten = self.registry.clear_dynamic();
        self.state.set(ServiceStatus::Stopped);
        info!(
            event = events::CONTEXT_STOP_OK,
            component = COMPONENT,
            context = %self.config.name,
            drained = *routes.as_ref().unwrap_or(&false),
            dynamic_endpoints_cleared = forgotten,
            "context stopped"
        );
        routes.map(|_| ())
    }
}
