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

//! `scheduler:` endpoints: route consumers that fire one empty exchange per
//! scheduled poll.

use crate::data_plane::scheduled_poll::{Poller, ScheduledPollConfig, ScheduledPollConsumer};
use crate::endpoint::{Component, Consumable, Consumer, Endpoint, Processor};
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::routing::uri::EndpointUri;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const PARAMETERS: &[&str] = &[
    "delay",
    "initialDelay",
    "backoffMultiplier",
    "backoffIdleThreshold",
    "backoffErrorThreshold",
    "repeatCount",
    "greedy",
];

pub const FIRED_COUNTER_HEADER: &str = "scheduler.counter";

#[derive(Clone, Copy, Debug, Default)]
pub struct SchedulerComponent;

impl SchedulerComponent {
    pub fn new() -> Self {
        Self
    }
}

/// Delays are given in milliseconds.
fn poll_config(uri: &EndpointUri) -> Result<ScheduledPollConfig, EngineError> {
    let defaults = ScheduledPollConfig::default();
    let millis = |name: &str, default: Duration| -> Result<Duration, EngineError> {
        Ok(uri
            .parameter_as::<u64>(name)?
            .map(Duration::from_millis)
            .unwrap_or(default))
    };
    let config = ScheduledPollConfig {
        initial_delay: millis("initialDelay", defaults.initial_delay)?,
        delay: millis("delay", defaults.delay)?,
        backoff_multiplier: uri
            .parameter_as("backoffMultiplier")?
            .unwrap_or(defaults.backoff_multiplier),
        backoff_idle_threshold: uri
            .parameter_as("backoffIdleThreshold")?
            .unwrap_or(defaults.backoff_idle_threshold),
        backoff_error_threshold: uri
            .parameter_as("backoffErrorThreshold")?
            .unwrap_or(defaults.backoff_error_threshold),
        repeat_count: uri
            .parameter_as("repeatCount")?
            .unwrap_or(defaults.repeat_count),
        greedy: uri.parameter_as("greedy")?.unwrap_or(defaults.greedy),
    };
    config
        .validate()
        .map_err(|err| EngineError::resolve_failed(uri.sanitized(), err.to_string()))?;
    Ok(config)
}

#[async_trait]
impl Component for SchedulerComponent {
    fn known_parameters(&self) -> Option<&[&'static str]> {
        Some(PARAMETERS)
    }

    async fn create_endpoint(&self, uri: &EndpointUri) -> Result<Arc<dyn Endpoint>, EngineError> {
        Ok(Arc::new(SchedulerEndpoint {
            uri: uri.clone(),
            config: poll_config(uri)?,
        }))
    }
}

struct SchedulerEndpoint {
    uri: EndpointUri,
    config: ScheduledPollConfig,
}

impl Endpoint for SchedulerEndpoint {
    fn uri(&self) -> &EndpointUri {
        &self.uri
    }

    fn as_consumable(&self) -> Option<&dyn Consumable> {
        Some(self)
    }
}

#[async_trait]
impl Consumable for SchedulerEndpoint {
    async fn create_consumer(
        &self,
        processor: Arc<dyn Processor>,
    ) -> Result<Box<dyn Consumer>, EngineError> {
        let poller = ProcessorPoller {
            uri: self.uri.as_str().to_string(),
            processor,
            fired: AtomicU64::new(0),
        };
        Ok(Box::new(ScheduledPollConsumer::new(
            self.uri.clone(),
            poller,
            self.config.clone(),
        )))
    }
}

struct ProcessorPoller {
    uri: String,
    processor: Arc<dyn Processor>,
    fired: AtomicU64,
}

#[async_trait]
impl Poller for ProcessorPoller {
    async fn poll(&self) -> Result<usize, EngineError> {
        let fired = self.fired.fetch_add(1, Ordering::AcqRel) + 1;
        let mut exchange = Exchange::new();
        exchange.set_from_endpoint(self.uri.as_str());
        exchange.set_header(FIRED_COUNTER_HEADER, fired);
        self.processor.process(&mut exchange).await?;
        Ok(1)
    }
}
