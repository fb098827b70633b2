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

//! # route-engine
//!
//! `route-engine` is a small integration runtime: components create endpoints
//! from URIs, endpoints create producers and consumers, and routes connect a
//! consuming endpoint to an ordered list of processors and producing endpoints.
//!
//! The engine's job is the plumbing around that model: it resolves and caches
//! endpoints, pools producers and polling consumers with LRU eviction, drives
//! every service through one lifecycle state machine, and shuts routes down
//! gracefully by draining inflight exchanges.
//!
//! ```
//! use route_engine::{processor_fn, EngineConfig, RouteContext, RouteDefinition};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let context = RouteContext::with_default_components(EngineConfig::default());
//! context
//!     .add_route(
//!         RouteDefinition::new("greeter", "direct:greet")
//!             .process(processor_fn(|exchange| {
//!                 let name = exchange.body().as_str().unwrap_or("nobody").to_string();
//!                 exchange.set_body(format!("hello {name}"));
//!                 Ok(())
//!             }))
//!             .to("queue:greetings"),
//!     )
//!     .await
//!     .unwrap();
//! context.start().await.unwrap();
//!
//! context
//!     .producer_template()
//!     .send_body("direct:greet", "world")
//!     .await
//!     .unwrap();
//! let greeting = context
//!     .consumer_template()
//!     .receive_body("queue:greetings", Duration::from_secs(1))
//!     .await
//!     .unwrap();
//! assert_eq!(greeting, Some(json!("hello world")));
//!
//! context.stop().await.unwrap();
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: [`RouteContext`], the templates and the component SPI
//! - Control plane: component and endpoint registries, routes, route policies,
//!   supervised restarts of failed routes and graceful shutdown with deferred
//!   routes
//! - Routing: URI normalization and the endpoint cache key
//! - Data plane: the service pool behind the producer and consumer caches,
//!   inflight tracking and scheduled polling
//! - Runtime: background worker loops with cooperative stop
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events/spans and does not unconditionally initialize a global
//! subscriber. Binaries and tests are responsible for one-time
//! `tracing_subscriber` initialization at process boundaries.

pub mod components;
mod config;
pub use config::{EngineConfig, ShutdownConfig, SupervisingConfig};

mod context;
pub use context::RouteContext;

mod control_plane;
pub use control_plane::component_registry::ComponentRegistry;
pub use control_plane::endpoint_registry::{EndpointRegistry, RouteSetup, DEFAULT_REGISTRY_SIZE};
pub use control_plane::route::{RouteDefinition, RouteStep};
pub use control_plane::route_controller::RouteController;
pub use control_plane::route_policy::{DurationRoutePolicy, RouteHandle, RoutePolicy};
pub use control_plane::shutdown_strategy::{ShutdownRoute, ShutdownRunningTask, ShutdownStrategy};

mod data_plane;
pub use data_plane::consumer_cache::{ConsumerCache, PollingConsumerLease};
pub use data_plane::inflight::{InflightExchange, InflightRepository};
pub use data_plane::producer_cache::{ProducerCache, ProducerLease};
pub use data_plane::scheduled_poll::{
    DefaultPollStrategy, PollStrategy, Poller, ScheduledPollConfig, ScheduledPollConsumer,
};
pub use data_plane::service_pool::{Lease, PoolStatistics, DEFAULT_POOL_CAPACITY};
pub use data_plane::utilization::EndpointUtilizationStatistics;

mod endpoint;
pub use endpoint::{
    processor_fn, Component, Consumable, Consumer, Endpoint, FnProcessor, Pollable,
    PollingConsumer, Processor, Producer, Producible,
};

mod error;
pub use error::EngineError;

mod exchange;
pub use exchange::Exchange;

#[doc(hidden)]
pub mod observability;
mod routing;
pub use routing::endpoint_key::EndpointKey;
pub use routing::uri::{sanitize_uri, EndpointUri};

mod runtime;

mod service;
pub use service::{Lifecycle, ManagedService, ServiceState, ServiceStatus};

mod template;
pub use template::{ConsumerTemplate, ProducerTemplate};

#[doc(hidden)]
pub mod benchmark_support;

#[doc(hidden)]
pub mod testing;
