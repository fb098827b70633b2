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

//! Component / endpoint service-provider interface.
//!
//! A [`Component`] turns a normalized URI into an [`Endpoint`]. An endpoint
//! advertises what it can do through the capability accessors; the engine asks
//! it for producers, polling consumers or event-driven consumers and manages
//! their lifecycles itself.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use route_engine::{
//!     Component, Endpoint, EndpointUri, EngineConfig, EngineError, Exchange, Lifecycle,
//!     Producer, Producible, RouteContext,
//! };
//!
//! struct UpperCaseProducer;
//!
//! impl Lifecycle for UpperCaseProducer {}
//!
//! #[async_trait]
//! impl Producer for UpperCaseProducer {
//!     async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError> {
//!         let upper = exchange.body().as_str().unwrap_or_default().to_uppercase();
//!         exchange.set_body(upper);
//!         Ok(())
//!     }
//! }
//!
//! struct UpperCaseEndpoint {
//!     uri: EndpointUri,
//! }
//!
//! impl Endpoint for UpperCaseEndpoint {
//!     fn uri(&self) -> &EndpointUri {
//!         &self.uri
//!     }
//!
//!     fn as_producible(&self) -> Option<&dyn Producible> {
//!         Some(self)
//!     }
//! }
//!
//! #[async_trait]
//! impl Producible for UpperCaseEndpoint {
//!     async fn create_producer(&self) -> Result<Box<dyn Producer>, EngineError> {
//!         Ok(Box::new(UpperCaseProducer))
//!     }
//! }
//!
//! struct UpperCaseComponent;
//!
//! #[async_trait]
//! impl Component for UpperCaseComponent {
//!     async fn create_endpoint(&self, uri: &EndpointUri) -> Result<Arc<dyn Endpoint>, EngineError> {
//!         Ok(Arc::new(UpperCaseEndpoint { uri: uri.clone() }))
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let context = RouteContext::new(EngineConfig::default());
//! context.add_component("upper", Arc::new(UpperCaseComponent));
//! context.start().await.unwrap();
//!
//! let reply = context
//!     .producer_template()
//!     .send_body("upper:shout", "hello")
//!     .await
//!     .unwrap();
//! assert_eq!(reply, serde_json::json!("HELLO"));
//!
//! context.stop().await.unwrap();
//! # });
//! ```

use crate::control_plane::shutdown_strategy::ShutdownRunningTask;
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::routing::uri::EndpointUri;
use crate::service::Lifecycle;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Unit of work applied to an exchange.
#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError>;
}

/// [`Processor`] backed by a synchronous closure.
pub struct FnProcessor<F>(F);

#[async_trait]
impl<F> Processor for FnProcessor<F>
where
    F: Fn(&mut Exchange) -> Result<(), EngineError> + Send + Sync,
{
    async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError> {
        (self.0)(exchange)
    }
}

pub fn processor_fn<F>(f: F) -> Arc<dyn Processor>
where
    F: Fn(&mut Exchange) -> Result<(), EngineError> + Send + Sync + 'static,
{
    Arc::new(FnProcessor(f))
}

/// Sends exchanges to the endpoint it was created for.
#[async_trait]
pub trait Producer: Lifecycle {
    async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError>;

    /// Whether one instance may be borrowed by many callers at the same time.
    fn is_shareable(&self) -> bool {
        true
    }
}

/// Pull-style consumer used by consumer templates.
#[async_trait]
pub trait PollingConsumer: Lifecycle {
    async fn receive_timeout(&self, timeout: Duration) -> Result<Option<Exchange>, EngineError>;

    async fn receive_no_wait(&self) -> Result<Option<Exchange>, EngineError>;

    fn is_shareable(&self) -> bool {
        false
    }
}

/// Event-driven consumer feeding a route.
pub trait Consumer: Lifecycle {
    fn endpoint_uri(&self) -> &EndpointUri;

    /// `true` when the consumer must keep running during a graceful shutdown
    /// to honour `task`. Such consumers are stopped after the drain.
    fn defers_shutdown(&self, _task: ShutdownRunningTask) -> bool {
        false
    }

    /// Exchanges accepted by the consumer's source but not yet handed to the route.
    fn pending_exchanges(&self) -> usize {
        0
    }
}

#[async_trait]
pub trait Producible: Send + Sync {
    async fn create_producer(&self) -> Result<Box<dyn Producer>, EngineError>;
}

#[async_trait]
pub trait Pollable: Send + Sync {
    async fn create_polling_consumer(&self) -> Result<Box<dyn PollingConsumer>, EngineError>;
}

#[async_trait]
pub trait Consumable: Send + Sync {
    async fn create_consumer(
        &self,
        processor: Arc<dyn Processor>,
    ) -> Result<Box<dyn Consumer>, EngineError>;
}

/// An addressable source or target of messages.
pub trait Endpoint: Send + Sync {
    fn uri(&self) -> &EndpointUri;

    /// Singleton endpoints let the engine pool producers and consumers created from them.
    fn is_singleton(&self) -> bool {
        true
    }

    fn as_producible(&self) -> Option<&dyn Producible> {
        None
    }

    fn as_pollable(&self) -> Option<&dyn Pollable> {
        None
    }

    fn as_consumable(&self) -> Option<&dyn Consumable> {
        None
    }
}

/// Factory for endpoints of one URI scheme.
#[async_trait]
pub trait Component: Send + Sync {
    /// Parameters this component understands. `None` accepts any parameter.
    fn known_parameters(&self) -> Option<&[&'static str]> {
        None
    }

    async fn create_endpoint(&self, uri: &EndpointUri) -> Result<Arc<dyn Endpoint>, EngineError>;
}
