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

//! Per-endpoint usage counters, bounded by distinct URI count.

use lru::LruCache;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::num::NonZeroUsize;

/// Counts how often each endpoint URI was used through a cache.
///
/// The number of tracked URIs is bounded; the least recently used URI is
/// forgotten when a new one arrives at the bound.
pub struct EndpointUtilizationStatistics {
    max_entries: usize,
    counters: Mutex<LruCache<String, u64>>,
}

impl EndpointUtilizationStatistics {
    pub fn new(max_entries: usize) -> Self {
        let bound = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            max_entries: bound.get(),
            counters: Mutex::new(LruCache::new(bound)),
        }
    }

    pub fn on_hit(&self, uri: &str) {
        let mut counters = self.counters.lock();
        match counters.get_mut(uri) {
            Some(count) => *count += 1,
            None => {
                counters.put(uri.to_string(), 1);
            }
        }
    }

    pub fn get(&self, uri: &str) -> Option<u64> {
        self.counters.lock().peek(uri).copied()
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.counters
            .lock()
            .iter()
            .map(|(uri, count)| (uri.clone(), *count))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.counters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn clear(&self) {
        self.counters.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::EndpointUtilizationStatistics;

    #[test]
    fn counts_every_use() {
        let stats = EndpointUtilizationStatistics::new(10);
        stats.on_hit("queue://a");
        stats.on_hit("queue://a");
        stats.on_hit("queue://b");
        assert_eq!(stats.get("queue://a"), Some(2));
        assert_eq!(stats.get("queue://b"), Some(1));
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn distinct_uris_are_bounded() {
        let stats = EndpointUtilizationStatistics::new(2);
        stats.on_hit("queue://a");
        stats.on_hit("queue://b");
        stats.on_hit("queue://a");
        stats.on_hit("queue://c");
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains_key("queue://a"));
        assert!(!snapshot.contains_key("queue://b"));
    }

    #[test]
    fn zero_bound_tracks_one_uri() {
        assert_eq!(EndpointUtilizationStatistics::new(0).max_entries(), 1);
    }
}
