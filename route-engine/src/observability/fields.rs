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

//! Canonical structured field keys and value-format helpers.

use std::time::Duration;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const ROUTE_ID: &str = "route_id";
pub const ENDPOINT_URI: &str = "endpoint_uri";
pub const EXCHANGE_ID: &str = "exchange_id";
pub const ERR: &str = "err";

pub const NONE: &str = "none";

pub fn or_none(value: Option<&str>) -> &str {
    value.unwrap_or(NONE)
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
