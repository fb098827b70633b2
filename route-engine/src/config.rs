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

//! Engine options, loadable from JSON5.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    pub name: String,
    /// Idle producers kept per context; `0` selects 1000.
    pub producer_cache_size: usize,
    /// Idle polling consumers kept per context; `0` selects 1000.
    pub consumer_cache_size: usize,
    pub endpoint_registry_size: usize,
    pub extended_statistics: bool,
    pub statistics_max_entries: usize,
    pub shutdown: ShutdownConfig,
    pub supervising: SupervisingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "route-engine".to_string(),
            producer_cache_size: 1000,
            consumer_cache_size: 1000,
            endpoint_registry_size: 1000,
            extended_statistics: false,
            statistics_max_entries: 1000,
            shutdown: ShutdownConfig::default(),
            supervising: SupervisingConfig::default(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ShutdownConfig {
    pub timeout_secs: u64,
    pub suppress_logging_on_timeout: bool,
    /// Cancel still-running exchanges once the timeout elapses instead of waiting on.
    pub shutdown_now_on_timeout: bool,
    pub log_inflight_exchanges_on_timeout: bool,
    pub shutdown_routes_in_reverse_order: bool,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 45,
            suppress_logging_on_timeout: false,
            shutdown_now_on_timeout: true,
            log_inflight_exchanges_on_timeout: true,
            shutdown_routes_in_reverse_order: true,
        }
    }
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Restarting routes that fail to start, with exponential backoff.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SupervisingConfig {
    pub enabled: bool,
    pub back_off_delay_ms: u64,
    /// Upper bound for the grown delay; `0` leaves it unbounded.
    pub back_off_max_delay_ms: u64,
    /// Restart attempts per route; `0` retries forever.
    pub back_off_max_attempts: u64,
    pub back_off_multiplier: f64,
}

impl Default for SupervisingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            back_off_delay_ms: 2000,
            back_off_max_delay_ms: 0,
            back_off_max_attempts: 0,
            back_off_multiplier: 1.0,
        }
    }
}

impl SupervisingConfig {
    /// Delay before the given 1-based restart attempt.
    pub fn delay_for(&self, attempt: u64) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let grown = self.back_off_delay_ms as f64 * self.back_off_multiplier.powi(exponent);
        let capped = if self.back_off_max_delay_ms > 0 {
            grown.min(self.back_off_max_delay_ms as f64)
        } else {
            grown
        };
        Duration::from_millis(capped.min(u64::MAX as f64) as u64)
    }

    pub fn attempts_exhausted(&self, attempts: u64) -> bool {
        self.back_off_max_attempts > 0 && attempts >= self.back_off_max_attempts
    }
}

impl EngineConfig {
    pub fn from_json5_str(contents: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = json5::from_str(contents)
            .map_err(|e| EngineError::Config(format!("unable to parse engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("unable to read {}: {e}", path.display()))
        })?;
        Self::from_json5_str(&contents)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.shutdown.timeout_secs == 0 {
            return Err(EngineError::Config(
                "shutdown.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(EngineError::Config("name must not be empty".to_string()));
        }
        if self.supervising.enabled {
            if self.supervising.back_off_delay_ms == 0 {
                return Err(EngineError::Config(
                    "supervising.back_off_delay_ms must be greater than zero".to_string(),
                ));
            }
            let multiplier = self.supervising.back_off_multiplier;
            if multiplier.is_nan() || multiplier < 1.0 {
                return Err(EngineError::Config(
                    "supervising.back_off_multiplier must be at least 1.0".to_string(),
                ));
            }
        }
        Ok(())
    }
}
