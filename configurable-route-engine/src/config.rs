/********************************************************************************
 * Copyright (c) 2025 Contributors to the Eclipse Foundation
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

use route_engine::{
    DurationRoutePolicy, EngineConfig, EngineError, RouteDefinition, ShutdownRoute,
    ShutdownRunningTask,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub(crate) engine: EngineConfig,
    pub(crate) routes: Vec<RouteConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub(crate) id: String,
    pub(crate) from: String,
    pub(crate) to: Vec<String>,
    #[serde(default)]
    pub(crate) startup_order: Option<i32>,
    #[serde(default = "default_auto_startup")]
    pub(crate) auto_startup: bool,
    #[serde(default)]
    pub(crate) shutdown_timeout_secs: Option<u64>,
    #[serde(default)]
    pub(crate) shutdown_route: ShutdownRoute,
    #[serde(default)]
    pub(crate) shutdown_running_task: ShutdownRunningTask,
    #[serde(default)]
    pub(crate) max_duration_secs: Option<u64>,
    #[serde(default)]
    pub(crate) max_messages: Option<u64>,
}

fn default_auto_startup() -> bool {
    true
}

impl Config {
    pub fn from_json5_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = json5::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Unable to parse config file: {e}")))?;
        config.engine.validate()?;
        Ok(config)
    }
}

impl RouteConfig {
    pub fn to_definition(&self) -> RouteDefinition {
        let mut definition = RouteDefinition::new(self.id.as_str(), self.from.as_str())
            .auto_startup(self.auto_startup)
            .shutdown_route(self.shutdown_route)
            .shutdown_running_task(self.shutdown_running_task);
        for uri in &self.to {
            definition = definition.to(uri.as_str());
        }
        if let Some(order) = self.startup_order {
            definition = definition.startup_order(order);
        }
        if let Some(secs) = self.shutdown_timeout_secs {
            definition = definition.shutdown_timeout(Duration::from_secs(secs));
        }
        if self.max_duration_secs.is_some() || self.max_messages.is_some() {
            definition = definition.route_policy(Arc::new(DurationRoutePolicy::new(
                self.max_duration_secs.map(Duration::from_secs),
                self.max_messages,
            )));
        }
        definition
    }
}
