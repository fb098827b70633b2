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

//! Tracks exchanges currently being processed by routes.

use crate::exchange::Exchange;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct InflightExchange {
    pub exchange_id: Uuid,
    pub route_id: String,
    pub from_endpoint: Option<String>,
    started: Instant,
}

impl InflightExchange {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

#[derive(Default)]
struct InflightState {
    exchanges: HashMap<Uuid, InflightExchange>,
    per_route: HashMap<String, usize>,
}

#[derive(Default)]
pub struct InflightRepository {
    state: Mutex<InflightState>,
}

impl InflightRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, exchange: &Exchange, route_id: &str) {
        let mut state = self.state.lock();
        let previous = state.exchanges.insert(
            exchange.id(),
            InflightExchange {
                exchange_id: exchange.id(),
                route_id: route_id.to_string(),
                from_endpoint: exchange.from_endpoint().map(str::to_string),
                started: Instant::now(),
            },
        );
        if previous.is_none() {
            *state.per_route.entry(route_id.to_string()).or_default() += 1;
        }
    }

    pub fn remove(&self, exchange_id: Uuid) {
        let mut state = self.state.lock();
        let Some(removed) = state.exchanges.remove(&exchange_id) else {
            return;
        };
        if let Some(count) = state.per_route.get_mut(&removed.route_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.per_route.remove(&removed.route_id);
            }
        }
    }

    pub fn size(&self) -> usize {
        self.state.lock().exchanges.len()
    }

    pub fn route_size(&self, route_id: &str) -> usize {
        self.state
            .lock()
            .per_route
            .get(route_id)
            .copied()
            .unwrap_or_default()
    }

    /// Inflight exchanges, oldest first, optionally for a single route.
    pub fn browse(&self, route_id: Option<&str>, limit: usize) -> Vec<InflightExchange> {
        let state = self.state.lock();
        let mut found: Vec<InflightExchange> = state
            .exchanges
            .values()
            .filter(|inflight| route_id.map_or(true, |id| inflight.route_id == id))
            .cloned()
            .collect();
        found.sort_by_key(|inflight| inflight.started);
        found.truncate(limit);
        found
    }
}

#[cfg(test)]
mod tests {
    use super::InflightRepository;
    use crate::exchange::Exchange;

    #[test]
    fn counts_per_route() {
        let repository = InflightRepository::new();
        let first = Exchange::new();
        let second = Exchange::new();
        repository.add(&first, "a");
        repository.add(&second, "b");
        repository.add(&second, "b");

        assert_eq!(repository.size(), 2);
        assert_eq!(repository.route_size("a"), 1);
        assert_eq!(repository.route_size("b"), 1);

        repository.remove(first.id());
        repository.remove(first.id());
        assert_eq!(repository.route_size("a"), 0);
        assert_eq!(repository.size(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn browse_lists_oldest_first() {
        let repository = InflightRepository::new();
        let older = Exchange::new();
        repository.add(&older, "a");
        tokio::time::advance(std::time::Duration::from_secs(1)).await;
        let newer = Exchange::new();
        repository.add(&newer, "a");
        repository.add(&Exchange::new(), "other");

        let listed = repository.browse(Some("a"), 10);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].exchange_id, older.id());
        assert!(listed[0].elapsed() >= listed[1].elapsed());
        assert_eq!(repository.browse(None, 1).len(), 1);
    }
}
