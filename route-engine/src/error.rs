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

//! Error type shared by every engine operation.

use std::fmt::{Display, Formatter};

/// Failure reported by endpoint resolution, caching, lifecycle and route control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// The URI could not be parsed, carried unknown options, or the component refused it.
    ResolveEndpointFailed { uri: String, reason: String },
    /// No component is registered for the URI scheme.
    NoSuchComponent { scheme: String },
    /// A lifecycle transition or operation is not allowed in the current state.
    IllegalState(String),
    /// The endpoint does not offer the requested capability (`producer`, `polling consumer`, ...).
    UnsupportedCapability { uri: String, capability: String },
    RouteNotFound(String),
    DuplicateRoute(String),
    InvalidRoute { route_id: String, reason: String },
    /// Two routes declared the same explicit startup order.
    StartupOrderClash {
        order: i32,
        first_route: String,
        second_route: String,
    },
    /// A producer or processor failed while handling an exchange.
    Processing { uri: String, reason: String },
    Config(String),
}

impl EngineError {
    pub fn illegal_state(reason: impl Into<String>) -> Self {
        Self::IllegalState(reason.into())
    }

    pub fn resolve_failed(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResolveEndpointFailed {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn processing(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Processing {
            uri: uri.into(),
            reason: reason.into(),
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::ResolveEndpointFailed { uri, reason } => {
                write!(f, "failed to resolve endpoint: {uri} due to: {reason}")
            }
            EngineError::NoSuchComponent { scheme } => {
                write!(f, "no component found with scheme: {scheme}")
            }
            EngineError::IllegalState(reason) => write!(f, "illegal state: {reason}"),
            EngineError::UnsupportedCapability { uri, capability } => {
                write!(f, "endpoint {uri} does not support creating a {capability}")
            }
            EngineError::RouteNotFound(route_id) => write!(f, "route not found: {route_id}"),
            EngineError::DuplicateRoute(route_id) => {
                write!(f, "route with id {route_id} already exists")
            }
            EngineError::InvalidRoute { route_id, reason } => {
                write!(f, "invalid route {route_id}: {reason}")
            }
            EngineError::StartupOrderClash {
                order,
                first_route,
                second_route,
            } => write!(
                f,
                "duplicate startup order {order} on routes {first_route} and {second_route}"
            ),
            EngineError::Processing { uri, reason } => {
                write!(f, "exchange processing failed on {uri}: {reason}")
            }
            EngineError::Config(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use super::EngineError;

    #[test]
    fn startup_order_clash_names_both_routes() {
        let err = EngineError::StartupOrderClash {
            order: 5,
            first_route: "alpha".to_string(),
            second_route: "beta".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("alpha"));
        assert!(message.contains("beta"));
        assert!(message.contains('5'));
    }

    #[test]
    fn resolve_failure_mentions_uri_and_reason() {
        let err = EngineError::resolve_failed("queue://a?bogus=1", "unknown parameters: bogus");
        assert_eq!(
            err.to_string(),
            "failed to resolve endpoint: queue://a?bogus=1 due to: unknown parameters: bogus"
        );
    }
}
