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

//! Capacity-bounded, borrow-counted pool of lifecycle-managed services keyed by endpoint.
//!
//! Entries live in an arena keyed by [`EntryId`]. Each entry tracks how many
//! leases are out; only entries with no borrowers sit in the idle LRU and count
//! against capacity. An entry evicted while borrowed is marked retired: it is
//! never handed out again and is stopped by whichever release drops its last
//! borrow. Every removal from the arena happens under the pool lock, and only
//! the task that removed an entry stops it, so a service is stopped exactly
//! once however release, eviction and pool shutdown interleave.

use crate::endpoint::Endpoint;
use crate::error::EngineError;
use crate::observability::events;
use crate::routing::endpoint_key::EndpointKey;
use crate::service::{Lifecycle, ManagedService, ServiceStatus};
use async_trait::async_trait;
use futures::future::join_all;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

const COMPONENT: &str = "service_pool";

pub const DEFAULT_POOL_CAPACITY: usize = 1000;

/// Creates the pooled service for an endpoint.
#[async_trait]
pub(crate) trait ServiceFactory<S: ?Sized + Send + Sync + 'static>: Send + Sync {
    /// Short label used in service names and logs.
    fn kind(&self) -> &'static str;

    async fn create(&self, endpoint: &Arc<dyn Endpoint>) -> Result<Box<S>, EngineError>;

    fn is_shareable(&self, service: &S) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct EntryId(u64);

/// Counters accumulated since the pool was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStatistics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub created: u64,
}

/// A borrowed service. Hand it back with the cache's `release_*` method.
#[must_use = "a lease must be released back to the cache it was acquired from"]
pub struct Lease<S: ?Sized> {
    entry: Option<EntryId>,
    key: EndpointKey,
    service: Arc<ManagedService<S>>,
    endpoint: Arc<dyn Endpoint>,
}

impl<S: ?Sized + Lifecycle> Lease<S> {
    pub fn get(&self) -> &S {
        self.service.get()
    }

    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }

    pub fn key(&self) -> &EndpointKey {
        &self.key
    }

    /// `false` for transient instances created for non-singleton endpoints.
    pub fn is_pooled(&self) -> bool {
        self.entry.is_some()
    }

    pub fn status(&self) -> ServiceStatus {
        self.service.status()
    }

    pub(crate) fn managed(&self) -> &Arc<ManagedService<S>> {
        &self.service
    }
}

struct PoolEntry<S: ?Sized> {
    key: EndpointKey,
    service: Arc<ManagedService<S>>,
    borrowers: usize,
    shareable: bool,
    retired: bool,
}

struct PoolState<S: ?Sized> {
    next_id: u64,
    entries: HashMap<EntryId, PoolEntry<S>>,
    by_key: HashMap<EndpointKey, Vec<EntryId>>,
    idle: LruCache<EntryId, ()>,
    stopped: bool,
}

impl<S: ?Sized> PoolState<S> {
    fn new() -> Self {
        Self {
            next_id: 0,
            entries: HashMap::new(),
            by_key: HashMap::new(),
            idle: LruCache::unbounded(),
            stopped: false,
        }
    }

    fn find_available(&self, key: &EndpointKey) -> Option<EntryId> {
        self.by_key.get(key)?.iter().copied().find(|id| {
            self.entries
                .get(id)
                .is_some_and(|entry| !entry.retired && (entry.shareable || entry.borrowers == 0))
        })
    }

    fn check_out(&mut self, id: EntryId) -> Option<Arc<ManagedService<S>>> {
        let entry = self.entries.get_mut(&id)?;
        entry.borrowers += 1;
        let service = entry.service.clone();
        self.idle.pop(&id);
        Some(service)
    }

    fn insert(
        &mut self,
        key: EndpointKey,
        service: Arc<ManagedService<S>>,
        shareable: bool,
    ) -> EntryId {
        self.next_id += 1;
        let id = EntryId(self.next_id);
        self.by_key.entry(key.clone()).or_default().push(id);
        self.entries.insert(
            id,
            PoolEntry {
                key,
                service,
                borrowers: 1,
                shareable,
                retired: false,
            },
        );
        id
    }

    fn remove(&mut self, id: EntryId) -> Option<PoolEntry<S>> {
        let entry = self.entries.remove(&id)?;
        self.idle.pop(&id);
        if let Some(ids) = self.by_key.get_mut(&entry.key) {
            ids.retain(|candidate| *candidate != id);
            if ids.is_empty() {
                self.by_key.remove(&entry.key);
            }
        }
        Some(entry)
    }

    /// Removes least-recently-released idle entries until at most `capacity` remain idle.
    fn evict_overflow(&mut self, capacity: usize) -> Vec<PoolEntry<S>> {
        let mut evicted = Vec::new();
        while self.idle.len() > capacity {
            let Some((id, ())) = self.idle.pop_lru() else {
                break;
            };
            if let Some(entry) = self.remove(id) {
                evicted.push(entry);
            }
        }
        evicted
    }

    fn retired_without_borrowers(&self) -> Vec<EntryId> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.retired && entry.borrowers == 0)
            .map(|(id, _)| *id)
            .collect()
    }
}

pub(crate) struct ServicePool<S: ?Sized> {
    capacity: usize,
    factory: Arc<dyn ServiceFactory<S>>,
    state: Mutex<PoolState<S>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    created: AtomicU64,
}

impl<S> ServicePool<S>
where
    S: ?Sized + Lifecycle + 'static,
{
    /// A capacity of `0` selects [`DEFAULT_POOL_CAPACITY`].
    pub(crate) fn new(factory: Arc<dyn ServiceFactory<S>>, capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_POOL_CAPACITY
        } else {
            capacity
        };
        Self {
            capacity,
            factory,
            state: Mutex::new(PoolState::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            created: AtomicU64::new(0),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries currently owned by the pool, borrowed or idle.
    pub(crate) fn size(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub(crate) fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }

    pub(crate) fn borrowed_count(&self) -> usize {
        self.state
            .lock()
            .entries
            .values()
            .filter(|entry| entry.borrowers > 0)
            .count()
    }

    /// Distinct keys with at least one live, non-retired entry.
    pub(crate) fn keys(&self) -> Vec<EndpointKey> {
        let state = self.state.lock();
        let mut keys: Vec<EndpointKey> = state
            .entries
            .values()
            .filter(|entry| !entry.retired)
            .map(|entry| entry.key.clone())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub(crate) fn statistics(&self) -> PoolStatistics {
        PoolStatistics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn start(&self) {
        self.state.lock().stopped = false;
    }

    pub(crate) async fn acquire(&self, endpoint: &Arc<dyn Endpoint>) -> Result<Lease<S>, EngineError> {
        let key = EndpointKey::from(endpoint.uri());

        {
            let mut state = self.state.lock();
            if state.stopped {
                return Err(self.stopped_error());
            }
            if let Some((id, service)) = state
                .find_available(&key)
                .and_then(|id| state.check_out(id).map(|service| (id, service)))
            {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(
                    event = events::POOL_ENTRY_REUSE,
                    component = COMPONENT,
                    endpoint_uri = %key,
                    entry_id = id.0,
                    "reusing pooled service"
                );
                return Ok(Lease {
                    entry: Some(id),
                    key,
                    service,
                    endpoint: endpoint.clone(),
                });
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let fresh = self.create_started(endpoint).await?;
        let shareable = self.factory.is_shareable(fresh.get());

        let (outcome, duplicate) = {
            let mut state = self.state.lock();
            if state.stopped {
                (Err(self.stopped_error()), Some(fresh))
            } else {
                let existing = if shareable {
                    state
                        .find_available(&key)
                        .and_then(|id| state.check_out(id).map(|service| (id, service)))
                } else {
                    None
                };
                match existing {
                    // a racing acquirer published first; ours is surplus
                    Some((id, service)) => (
                        Ok(Lease {
                            entry: Some(id),
                            key: key.clone(),
                            service,
                            endpoint: endpoint.clone(),
                        }),
                        Some(fresh),
                    ),
                    None => {
                        let id = state.insert(key.clone(), fresh.clone(), shareable);
                        self.created.fetch_add(1, Ordering::Relaxed);
                        debug!(
                            event = events::POOL_ENTRY_CREATE,
                            component = COMPONENT,
                            endpoint_uri = %key,
                            entry_id = id.0,
                            shareable,
                            "pooled new service"
                        );
                        (
                            Ok(Lease {
                                entry: Some(id),
                                key: key.clone(),
                                service: fresh,
                                endpoint: endpoint.clone(),
                            }),
                            None,
                        )
                    }
                }
            }
        };

        if let Some(duplicate) = duplicate {
            self.stop_quietly(&duplicate).await;
        }
        outcome
    }

    /// Creates and starts an instance that is never pooled.
    pub(crate) async fn acquire_transient(
        &self,
        endpoint: &Arc<dyn Endpoint>,
    ) -> Result<Lease<S>, EngineError> {
        let service = self.create_started(endpoint).await?;
        Ok(Lease {
            entry: None,
            key: EndpointKey::from(endpoint.uri()),
            service,
            endpoint: endpoint.clone(),
        })
    }

    pub(crate) async fn release(&self, lease: Lease<S>) {
        let Some(id) = lease.entry else {
            self.stop_quietly(&lease.service).await;
            return;
        };

        let to_stop: Vec<PoolEntry<S>> = {
            let mut state = self.state.lock();
            let (remaining, retired) = match state.entries.get_mut(&id) {
                Some(entry) => {
                    entry.borrowers = entry.borrowers.saturating_sub(1);
                    (entry.borrowers, entry.retired)
                }
                // pool was stopped or the entry already removed
                None => return,
            };

            if remaining > 0 {
                Vec::new()
            } else if retired {
                state.remove(id).into_iter().collect()
            } else {
                state.idle.put(id, ());
                let evicted = state.evict_overflow(self.capacity);
                self.evictions
                    .fetch_add(evicted.len() as u64, Ordering::Relaxed);
                evicted
            }
        };

        for entry in to_stop {
            debug!(
                event = events::POOL_ENTRY_EVICT,
                component = COMPONENT,
                endpoint_uri = %entry.key,
                capacity = self.capacity,
                "stopping evicted service"
            );
            self.stop_quietly(&entry.service).await;
        }
    }

    /// Forces every entry of `key` out of the pool.
    ///
    /// Idle entries are stopped now; borrowed ones are retired and stopped on
    /// their last release. Returns the number of entries affected.
    pub(crate) async fn evict(&self, key: &EndpointKey) -> usize {
        let (to_stop, retired) = {
            let mut state = self.state.lock();
            let ids = state.by_key.get(key).cloned().unwrap_or_default();
            let mut to_stop = Vec::new();
            let mut retired = 0usize;
            for id in ids {
                let borrowed = match state.entries.get_mut(&id) {
                    Some(entry) if entry.retired => continue,
                    Some(entry) if entry.borrowers > 0 => {
                        entry.retired = true;
                        true
                    }
                    Some(_) => false,
                    None => continue,
                };
                if borrowed {
                    state.idle.pop(&id);
                    retired += 1;
                } else if let Some(entry) = state.remove(id) {
                    to_stop.push(entry);
                }
            }
            (to_stop, retired)
        };

        let affected = to_stop.len() + retired;
        self.evictions
            .fetch_add(affected as u64, Ordering::Relaxed);
        if retired > 0 {
            debug!(
                event = events::POOL_ENTRY_RETIRE,
                component = COMPONENT,
                endpoint_uri = %key,
                retired,
                "evicted while borrowed; stop deferred to last release"
            );
        }
        for entry in to_stop {
            self.stop_quietly(&entry.service).await;
        }
        affected
    }

    /// Synchronously enforces capacity and stops retired entries nobody holds.
    pub(crate) async fn clean_up(&self) {
        let to_stop = {
            let mut state = self.state.lock();
            let mut to_stop = state.evict_overflow(self.capacity);
            self.evictions
                .fetch_add(to_stop.len() as u64, Ordering::Relaxed);
            for id in state.retired_without_borrowers() {
                if let Some(entry) = state.remove(id) {
                    to_stop.push(entry);
                }
            }
            to_stop
        };
        for entry in to_stop {
            self.stop_quietly(&entry.service).await;
        }
    }

    /// Stops every instance, borrowed or idle, and empties the pool.
    pub(crate) async fn stop(&self) {
        let drained: Vec<PoolEntry<S>> = {
            let mut state = self.state.lock();
            state.stopped = true;
            state.by_key.clear();
            state.idle.clear();
            state.entries.drain().map(|(_, entry)| entry).collect()
        };
        debug!(
            event = events::POOL_STOP,
            component = COMPONENT,
            kind = self.factory.kind(),
            stopped = drained.len(),
            "stopping pool"
        );
        join_all(
            drained
                .iter()
                .map(|entry| self.stop_quietly(&entry.service)),
        )
        .await;
    }

    async fn create_started(
        &self,
        endpoint: &Arc<dyn Endpoint>,
    ) -> Result<Arc<ManagedService<S>>, EngineError> {
        let instance = self.factory.create(endpoint).await?;
        let service = Arc::new(ManagedService::new(
            format!("{}[{}]", self.factory.kind(), endpoint.uri().sanitized()),
            instance,
        ));
        if let Err(err) = service.start().await {
            self.stop_quietly(&service).await;
            return Err(err);
        }
        Ok(service)
    }

    async fn stop_quietly(&self, service: &ManagedService<S>) {
        if let Err(err) = service.stop().await {
            warn!(
                event = events::POOL_SERVICE_STOP_FAILED,
                component = COMPONENT,
                service = service.name(),
                err = %err,
                "ignoring stop failure of pooled service"
            );
        }
    }

    fn stopped_error(&self) -> EngineError {
        EngineError::illegal_state(format!("{} pool is stopped", self.factory.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::{ServiceFactory, ServicePool};
    use crate::endpoint::Endpoint;
    use crate::error::EngineError;
    use crate::routing::endpoint_key::EndpointKey;
    use crate::routing::uri::EndpointUri;
    use crate::service::{Lifecycle, ServiceStatus};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Tracked {
        stops: Arc<AtomicUsize>,
        refuse_start: bool,
    }

    #[async_trait]
    impl Lifecycle for Tracked {
        async fn do_start(&self) -> Result<(), EngineError> {
            if self.refuse_start {
                return Err(EngineError::illegal_state("refused to start"));
            }
            Ok(())
        }

        async fn do_stop(&self) -> Result<(), EngineError> {
            tokio::task::yield_now().await;
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct TrackedFactory {
        shareable: bool,
        fail: AtomicBool,
        fail_start: AtomicBool,
        created: Mutex<Vec<(String, Arc<AtomicUsize>)>>,
    }

    impl TrackedFactory {
        fn new(shareable: bool) -> Arc<Self> {
            Arc::new(Self {
                shareable,
                fail: AtomicBool::new(false),
                fail_start: AtomicBool::new(false),
                created: Mutex::new(Vec::new()),
            })
        }

        fn stops_for(&self, uri: &str) -> usize {
            self.created
                .lock()
                .iter()
                .filter(|(key, _)| key == uri)
                .map(|(_, stops)| stops.load(Ordering::SeqCst))
                .sum()
        }

        fn all_stopped_exactly_once(&self) -> bool {
            self.created
                .lock()
                .iter()
                .all(|(_, stops)| stops.load(Ordering::SeqCst) == 1)
        }
    }

    #[async_trait]
    impl ServiceFactory<Tracked> for TrackedFactory {
        fn kind(&self) -> &'static str {
            "tracked"
        }

        async fn create(&self, endpoint: &Arc<dyn Endpoint>) -> Result<Box<Tracked>, EngineError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(EngineError::processing(endpoint.uri().as_str(), "refused"));
            }
            let stops = Arc::new(AtomicUsize::new(0));
            self.created
                .lock()
                .push((endpoint.uri().as_str().to_string(), stops.clone()));
            Ok(Box::new(Tracked {
                stops,
                refuse_start: self.fail_start.load(Ordering::SeqCst),
            }))
        }

        fn is_shareable(&self, _service: &Tracked) -> bool {
            self.shareable
        }
    }

    struct PlainEndpoint {
        uri: EndpointUri,
    }

    impl Endpoint for PlainEndpoint {
        fn uri(&self) -> &EndpointUri {
            &self.uri
        }
    }

    fn pool(factory: &Arc<TrackedFactory>, capacity: usize) -> ServicePool<Tracked> {
        ServicePool::new(factory.clone(), capacity)
    }

    fn endpoint(name: &str) -> Arc<dyn Endpoint> {
        Arc::new(PlainEndpoint {
            uri: EndpointUri::parse(&format!("tracked:{name}")).expect("uri"),
        })
    }

    #[tokio::test]
    async fn shareable_service_is_borrowed_concurrently() {
        let factory = TrackedFactory::new(true);
        let pool = pool(&factory, 10);
        let target = endpoint("a");

        let first = pool.acquire(&target).await.expect("first");
        let second = pool.acquire(&target).await.expect("second");
        assert!(Arc::ptr_eq(first.managed(), second.managed()));
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.borrowed_count(), 1);

        pool.release(first).await;
        pool.release(second).await;
        let stats = pool.statistics();
        assert_eq!((stats.hits, stats.misses, stats.created), (1, 1, 1));
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn non_shareable_service_gets_one_borrower_at_a_time() {
        let factory = TrackedFactory::new(false);
        let pool = pool(&factory, 10);
        let target = endpoint("a");

        let first = pool.acquire(&target).await.expect("first");
        let second = pool.acquire(&target).await.expect("second");
        assert!(!Arc::ptr_eq(first.managed(), second.managed()));
        assert_eq!(pool.size(), 2);

        pool.release(first).await;
        let third = pool.acquire(&target).await.expect("third");
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.statistics().hits, 1);

        pool.release(second).await;
        pool.release(third).await;
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn release_evicts_least_recently_released_across_pool() {
        let factory = TrackedFactory::new(true);
        let pool = pool(&factory, 2);

        for name in ["1", "1", "2", "2", "2", "3", "4"] {
            let lease = pool.acquire(&endpoint(name)).await.expect("acquire");
            pool.release(lease).await;
        }

        let keys: Vec<String> = pool.keys().iter().map(|key| key.to_string()).collect();
        assert_eq!(keys, vec!["tracked://3", "tracked://4"]);
        assert_eq!(factory.stops_for("tracked://1"), 1);
        assert_eq!(factory.stops_for("tracked://2"), 1);
        assert_eq!(factory.stops_for("tracked://3"), 0);
        assert_eq!(pool.statistics().evictions, 2);
    }

    #[tokio::test]
    async fn borrowed_entries_do_not_count_against_capacity() {
        let factory = TrackedFactory::new(true);
        let pool = pool(&factory, 1);

        let held: Vec<_> = futures::future::join_all(
            ["a", "b", "c"].iter().map(|name| {
                let pool = &pool;
                async move { pool.acquire(&endpoint(name)).await.expect("acquire") }
            }),
        )
        .await;
        assert_eq!(pool.size(), 3);
        assert_eq!(factory.stops_for("tracked://a"), 0);

        for lease in held {
            pool.release(lease).await;
        }
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn forced_eviction_while_borrowed_defers_stop_to_last_release() {
        let factory = TrackedFactory::new(true);
        let pool = pool(&factory, 10);
        let target = endpoint("busy");

        let mut leases = Vec::new();
        for _ in 0..3 {
            leases.push(pool.acquire(&target).await.expect("acquire"));
        }

        assert_eq!(pool.evict(&EndpointKey::from(target.uri())).await, 1);
        assert_eq!(factory.stops_for("tracked://busy"), 0);

        // retired entry is never handed out again
        let replacement = pool.acquire(&target).await.expect("replacement");
        assert!(!Arc::ptr_eq(replacement.managed(), leases[0].managed()));

        let last = leases.pop().expect("lease");
        for lease in leases {
            pool.release(lease).await;
            assert_eq!(factory.stops_for("tracked://busy"), 0);
        }
        let retired_service = last.managed().clone();
        pool.release(last).await;
        assert_eq!(retired_service.stop_count(), 1);
        assert_eq!(retired_service.status(), ServiceStatus::Stopped);

        pool.release(replacement).await;
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test]
    async fn pool_stop_stops_idle_and_borrowed_exactly_once() {
        let factory = TrackedFactory::new(false);
        let pool = pool(&factory, 10);

        let idle = pool.acquire(&endpoint("idle")).await.expect("idle");
        pool.release(idle).await;
        let borrowed = pool.acquire(&endpoint("borrowed")).await.expect("borrowed");

        pool.stop().await;
        assert_eq!(pool.size(), 0);

        pool.release(borrowed).await;
        assert!(factory.all_stopped_exactly_once());
        assert!(pool.acquire(&endpoint("late")).await.is_err());
    }

    #[tokio::test]
    async fn creation_failure_leaves_nothing_behind() {
        let factory = TrackedFactory::new(true);
        factory.fail.store(true, Ordering::SeqCst);
        let pool = pool(&factory, 10);

        assert!(pool.acquire(&endpoint("broken")).await.is_err());
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.statistics().misses, 1);
    }

    #[tokio::test]
    async fn failed_start_is_dropped_without_running_stop_hook() {
        let factory = TrackedFactory::new(true);
        factory.fail_start.store(true, Ordering::SeqCst);
        let pool = pool(&factory, 10);

        assert!(pool.acquire(&endpoint("cold")).await.is_err());
        assert_eq!(pool.size(), 0);
        assert_eq!(factory.stops_for("tracked://cold"), 0);

        factory.fail_start.store(false, Ordering::SeqCst);
        let lease = pool.acquire(&endpoint("cold")).await.expect("second attempt");
        pool.release(lease).await;
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test]
    async fn transient_lease_is_stopped_on_release() {
        let factory = TrackedFactory::new(true);
        let pool = pool(&factory, 10);

        let lease = pool.acquire_transient(&endpoint("t")).await.expect("transient");
        assert!(!lease.is_pooled());
        pool.release(lease).await;
        assert_eq!(pool.size(), 0);
        assert_eq!(factory.stops_for("tracked://t"), 1);
    }

    #[tokio::test]
    async fn zero_capacity_selects_default() {
        let pool = pool(&TrackedFactory::new(true), 0);
        assert_eq!(pool.capacity(), super::DEFAULT_POOL_CAPACITY);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_churn_stops_every_instance_exactly_once() {
        let factory = TrackedFactory::new(true);
        let pool = Arc::new(pool(&factory, 1));
        let names = ["a", "b", "c", "d"];

        let mut tasks = Vec::new();
        for worker in 0..16usize {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                for round in 0..25usize {
                    let target = endpoint(names[(worker + round) % names.len()]);
                    let lease = pool.acquire(&target).await.expect("acquire");
                    tokio::task::yield_now().await;
                    if round % 7 == 0 {
                        pool.evict(&EndpointKey::from(target.uri())).await;
                    }
                    pool.release(lease).await;
                }
            }));
        }
        for task in tasks {
            task.await.expect("join");
        }

        pool.clean_up().await;
        pool.stop().await;
        assert_eq!(pool.size(), 0);
        assert!(factory.all_stopped_exactly_once());
    }
}
