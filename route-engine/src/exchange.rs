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

//! The message envelope carried through producers, consumers and routes.

use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// One message plus its headers and routing metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Exchange {
    id: Uuid,
    headers: BTreeMap<String, Value>,
    body: Value,
    from_endpoint: Option<String>,
    route_id: Option<String>,
    failure: Option<String>,
}

impl Exchange {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            headers: BTreeMap::new(),
            body: Value::Null,
            from_endpoint: None,
            route_id: None,
            failure: None,
        }
    }

    pub fn with_body(body: impl Into<Value>) -> Self {
        let mut exchange = Self::new();
        exchange.body = body.into();
        exchange
    }

    /// Copy with a fresh id, used when an exchange is handed over to another consumer.
    pub fn copy(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            ..self.clone()
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    pub fn set_body(&mut self, body: impl Into<Value>) {
        self.body = body.into();
    }

    pub fn into_body(self) -> Value {
        self.body
    }

    pub fn header(&self, name: &str) -> Option<&Value> {
        self.headers.get(name)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn headers(&self) -> &BTreeMap<String, Value> {
        &self.headers
    }

    pub fn from_endpoint(&self) -> Option<&str> {
        self.from_endpoint.as_deref()
    }

    pub(crate) fn set_from_endpoint(&mut self, uri: impl Into<String>) {
        self.from_endpoint = Some(uri.into());
    }

    pub fn route_id(&self) -> Option<&str> {
        self.route_id.as_deref()
    }

    pub(crate) fn set_route_id(&mut self, route_id: impl Into<String>) {
        self.route_id = Some(route_id.into());
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn set_failure(&mut self, failure: impl Into<String>) {
        self.failure = Some(failure.into());
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}
