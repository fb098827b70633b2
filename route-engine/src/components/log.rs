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

//! `log:` endpoints: write each exchange to the `tracing` subscriber.

use crate::endpoint::{Component, Endpoint, Producer, Producible};
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::observability::events;
use crate::routing::uri::EndpointUri;
use crate::service::Lifecycle;
use async_trait::async_trait;
use std::sync::Arc;
use std::str::FromStr;
use tracing::{debug, error, info, trace, warn};

const COMPONENT: &str = "log";

const PARAMETERS: &[&str] = &["level", "showHeaders", "showBody"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("unknown log level {raw}")),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LogComponent;

impl LogComponent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Component for LogComponent {
    fn known_parameters(&self) -> Option<&[&'static str]> {
        Some(PARAMETERS)
    }

    async fn create_endpoint(&self, uri: &EndpointUri) -> Result<Arc<dyn Endpoint>, EngineError> {
        let level = match uri.parameter("level") {
            None => LogLevel::Info,
            Some(raw) => raw
                .parse::<LogLevel>()
                .map_err(|reason| EngineError::resolve_failed(uri.sanitized(), reason))?,
        };
        Ok(Arc::new(LogEndpoint {
            uri: uri.clone(),
            options: LogOptions {
                level,
                show_headers: uri.parameter_as::<bool>("showHeaders")?.unwrap_or(false),
                show_body: uri.parameter_as::<bool>("showBody")?.unwrap_or(true),
            },
        }))
    }
}

#[derive(Clone, Copy, Debug)]
struct LogOptions {
    level: LogLevel,
    show_headers: bool,
    show_body: bool,
}

struct LogEndpoint {
    uri: EndpointUri,
    options: LogOptions,
}

impl Endpoint for LogEndpoint {
    fn uri(&self) -> &EndpointUri {
        &self.uri
    }

    fn as_producible(&self) -> Option<&dyn Producible> {
        Some(self)
    }
}

#[async_trait]
impl Producible for LogEndpoint {
    async fn create_producer(&self) -> Result<Box<dyn Producer>, EngineError> {
        Ok(Box::new(LogProducer {
            category: self.uri.path().to_string(),
            options: self.options,
        }))
    }
}

struct LogProducer {
    category: String,
    options: LogOptions,
}

impl LogProducer {
    fn render(&self, exchange: &Exchange) -> String {
        let mut parts = vec![format!("ExchangeId: {}", exchange.id())];
        if self.options.show_headers {
            let headers = serde_json::to_string(exchange.headers()).unwrap_or_default();
            parts.push(format!("Headers: {headers}"));
        }
        if self.options.show_body {
            parts.push(format!("Body: {}", exchange.body()));
        }
        parts.join(", ")
    }
}

impl Lifecycle for LogProducer {}

#[async_trait]
impl Producer for LogProducer {
    async fn process(&self, exchange: &mut Exchange) -> Result<(), EngineError> {
        let rendered = self.render(exchange);
        let category = self.category.as_str();
        match self.options.level {
            LogLevel::Trace => {
                trace!(event = events::LOG_EXCHANGE, component = COMPONENT, category, "{rendered}")
            }
            LogLevel::Debug => {
                debug!(event = events::LOG_EXCHANGE, component = COMPONENT, category, "{rendered}")
            }
            LogLevel::Info => {
                info!(event = events::LOG_EXCHANGE, component = COMPONENT, category, "{rendered}")
            }
            LogLevel::Warn => {
                warn!(event = events::LOG_EXCHANGE, component = COMPONENT, category, "{rendered}")
            }
            LogLevel::Error => {
                error!(event = events::LOG_EXCHANGE, component = COMPONENT, category, "{rendered}")
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LogComponent;
    use crate::endpoint::{Component, Producer};
    use crate::error::EngineError;
    use crate::routing::uri::EndpointUri;

    #[tokio::test]
    async fn unknown_level_is_rejected() {
        let uri = EndpointUri::parse("log:audit?level=loud").expect("uri");
        let err = LogComponent::new()
            .create_endpoint(&uri)
            .await
            .err()
            .expect("must fail");
        assert!(matches!(err, EngineError::ResolveEndpointFailed { .. }));
    }

    #[tokio::test]
    async fn producer_accepts_exchanges() {
        let uri = EndpointUri::parse("log:audit?level=debug&showHeaders=true").expect("uri");
        let endpoint = LogComponent::new().create_endpoint(&uri).await.expect("endpoint");
        let producer = endpoint
            .as_producible()
            .expect("producible")
            .create_producer()
            .await
            .expect("producer");
        let mut exchange = crate::exchange::Exchange::with_body("hello");
        exchange.set_header("k", 1);
        producer.process(&mut exchange).await.expect("log");
        assert_eq!(exchange.body(), &serde_json::json!("hello"));
    }
}
