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

//! Route storage keyed by route id, kept in insertion order.

use crate::control_plane::route::Route;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Route registry storage owner for dedupe and ordered iteration.
pub(crate) struct RouteTable {
    routes: RwLock<Vec<Arc<Route>>>,
    next_seq: AtomicUsize,
}

impl RouteTable {
    /// Creates an empty route table.
    pub(crate) fn new() -> Self {
        Self {
            routes: RwLock::new(Vec::new()),
            next_seq: AtomicUsize::new(0),
        }
    }

    /// Sequence number used to order routes without an explicit startup order.
    pub(crate) fn next_seq(&self) -> usize {
        self.next_seq.fetch_add(1, Ordering::AcqRel)
    }

    /// Inserts a route. Returns `true` only when its id was not present.
    pub(crate) fn insert_route(&self, route: Arc<Route>) -> bool {
        let mut routes = self.routes.write();
        if routes.iter().any(|existing| existing.id == route.id) {
            return false;
        }
        routes.push(route);
        true
    }

    /// Removes a route by id, returning it when it existed.
    pub(crate) fn remove_route(&self, route_id: &str) -> Option<Arc<Route>> {
        let mut routes = self.routes.write();
        let position = routes.iter().position(|route| route.id == route_id)?;
        Some(routes.remove(position))
    }

    pub(crate) fn get(&self, route_id: &str) -> Option<Arc<Route>> {
        self.routes
            .read()
            .iter()
            .find(|route| route.id == route_id)
            .cloned()
    }

    pub(crate) fn contains(&self, route_id: &str) -> bool {
        self.routes.read().iter().any(|route| route.id == route_id)
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<Route>> {
        self.routes.read().clone()
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.routes
            .read()
            .iter()
            .map(|route| route.id.clone())
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.read().len()
    }
}
