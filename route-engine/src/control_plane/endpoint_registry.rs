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

//! Normalized-URI to endpoint registry with static and dynamic partitions.
//!
//! Endpoints resolved while a route is being set up are static: they are
//! owned by the routes that reference them and leave the registry only when the
//! last owning route is removed. Everything else is dynamic and lives in an LRU
//! that is trimmed whenever the registry grows past its maximum size.

use crate::control_plane::component_registry::ComponentRegistry;
use crate::endpoint::Endpoint;
use crate::error::EngineError;
use crate::observability::events;
use crate::routing::endpoint_key::EndpointKey;
use crate::routing::uri::EndpointUri;
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

const COMPONENT: &str = "endpoint_registry";

pub const DEFAULT_REGISTRY_SIZE: usize = 1000;

struct StaticEntry {
    endpoint: Arc<dyn Endpoint>,
    owners: BTreeSet<String>,
}

struct RegistryState {
    statics: HashMap<EndpointKey, StaticEntry>,
    dynamics: LruCache<EndpointKey, Arc<dyn Endpoint>>,
}

impl RegistryState {
    fn lookup(&mut self, key: &EndpointKey, owner: Option<&str>) -> Option<Arc<dyn Endpoint>> {
        if let Some(entry) = self.statics.get_mut(key) {
            if let Some(owner) = owner {
                entry.owners.insert(owner.to_string());
            }
            return Some(entry.endpoint.clone());
        }
        match owner {
            None => self.dynamics.get(key).cloned(),
            Some(owner) => {
                // a route now references it, so it becomes static
                let endpoint = self.dynamics.pop(key)?;
                self.statics.insert(
                    key.clone(),
                    StaticEntry {
                        endpoint: endpoint.clone(),
                        owners: BTreeSet::from([owner.to_string()]),
                    },
                );
                Some(endpoint)
            }
        }
    }

    fn insert(&mut self, key: EndpointKey, endpoint: Arc<dyn Endpoint>, owner: Option<&str>) {
        match owner {
            Some(owner) => {
                self.statics.insert(
                    key,
                    StaticEntry {
                        endpoint,
                        owners: BTreeSet::from([owner.to_string()]),
                    },
                );
            }
            None => {
                self.dynamics.put(key, endpoint);
            }
        }
    }

    fn size(&self) -> usize {
        self.statics.len() + self.dynamics.len()
    }

    fn evict_dynamic_overflow(&mut self, max_size: usize) -> Vec<EndpointKey> {
        let mut evicted = Vec::new();
        while self.size() > max_size {
            let Some((key, _)) = self.dynamics.pop_lru() else {
                break;
            };
            evicted.push(key);
        }
        evicted
    }
}

pub struct EndpointRegistry {
    components: Arc<ComponentRegistry>,
    max_size: usize,
    state: Mutex<RegistryState>,
}

impl EndpointRegistry {
    /// `max_size` of `0` selects [`DEFAULT_REGISTRY_SIZE`].
    pub fn new(components: Arc<ComponentRegistry>, max_size: usize) -> Self {
        let max_size = if max_size == 0 {
            DEFAULT_REGISTRY_SIZE
        } else {
            max_size
        };
        Self {
            components,
            max_size,
            state: Mutex::new(RegistryState {
                statics: HashMap::new(),
                dynamics: LruCache::unbounded(),
            }),
        }
    }

    /// Resolves an ad-hoc (dynamic) endpoint.
    pub async fn resolve(&self, uri: &str) -> Result<Arc<dyn Endpoint>, EngineError> {
        self.resolve_with_owner(uri, None).await
    }

    /// Starts resolving endpoints on behalf of a route; they are registered as static.
    pub fn begin_route_setup(&self, route_id: &str) -> RouteSetup<'_> {
        RouteSetup {
            registry: self,
            route_id: route_id.to_string(),
            resolved: Vec::new(),
        }
    }

    async fn resolve_with_owner(
        &self,
        uri: &str,
        owner: Option<&str>,
    ) -> Result<Arc<dyn Endpoint>, EngineError> {
        let uri = EndpointUri::parse(uri)?;
        let key = EndpointKey::from(&uri);

        let cached = self.state.lock().lookup(&key, owner);
        if let Some(found) = cached {
            return Ok(found);
        }

        let component =
            self.components
                .get(uri.scheme())
                .ok_or_else(|| EngineError::NoSuchComponent {
                    scheme: uri.scheme().to_string(),
                })?;
        if let Some(known) = component.known_parameters() {
            let unknown = uri.unknown_parameters(known);
            if !unknown.is_empty() {
                return Err(EngineError::resolve_failed(
                    uri.sanitized(),
                    format!(
                        "there are {} parameters that couldn't be set on the endpoint: {}",
                        unknown.len(),
                        unknown.join(", ")
                    ),
                ));
            }
        }

        let created = component.create_endpoint(&uri).await?;

        let (endpoint, evicted) = {
            let mut state = self.state.lock();
            // another resolver may have won while the component was creating
            match state.lookup(&key, owner) {
                Some(existing) => (existing, Vec::new()),
                None => {
                    state.insert(key.clone(), created.clone(), owner);
                    (created, state.evict_dynamic_overflow(self.max_size))
                }
            }
        };

        debug!(
            event = events::ENDPOINT_RESOLVE,
            component = COMPONENT,
            endpoint_uri = %uri.sanitized(),
            static_entry = owner.is_some(),
            "resolved endpoint"
        );
        for key in evicted {
            debug!(
                event = events::ENDPOINT_EVICT,
                component = COMPONENT,
                endpoint_uri = %key,
                max_size = self.max_size,
                "evicted dynamic endpoint"
            );
        }
        Ok(endpoint)
    }

    /// Drops `route_id`'s ownership of static endpoints and deregisters those no
    /// route references any more. Returns the removed URIs.
    pub fn remove_route_endpoints(&self, route_id: &str) -> Vec<String> {
        let mut state = self.state.lock();
        let mut removed = Vec::new();
        state.statics.retain(|key, entry| {
            entry.owners.remove(route_id);
            if entry.owners.is_empty() {
                removed.push(key.as_str().to_string());
                false
            } else {
                true
            }
        });
        removed.sort();
        if !removed.is_empty() {
            debug!(
                event = events::ENDPOINT_DEREGISTER,
                component = COMPONENT,
                route_id,
                removed = removed.len(),
                "deregistered static endpoints of removed route"
            );
        }
        removed
    }

    pub fn contains(&self, uri: &str) -> bool {
        let Ok(uri) = EndpointUri::parse(uri) else {
            return false;
        };
        let key = EndpointKey::from(&uri);
        let state = self.state.lock();
        state.statics.contains_key(&key) || state.dynamics.contains(&key)
    }

    pub fn is_static(&self, uri: &str) -> bool {
        EndpointUri::parse(uri)
            .map(|uri| self.state.lock().statics.contains_key(&EndpointKey::from(&uri)))
            .unwrap_or(false)
    }

    pub fn uris(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut uris: Vec<String> = state
            .statics
            .keys()
            .chain(state.dynamics.iter().map(|(key, _)| key))
            .map(|key| key.as_str().to_string())
            .collect();
        uris.sort();
        uris
    }

    pub fn size(&self) -> usize {
        self.state.lock().size()
    }

    pub fn static_size(&self) -> usize {
        self.state.lock().statics.len()
    }

    pub fn dynamic_size(&self) -> usize {
        self.state.lock().dynamics.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Drops every dynamic entry; route-owned endpoints stay registered.
    pub fn clear_dynamic(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.dynamics.len();
        state.dynamics.clear();
        dropped
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.statics.clear();
        state.dynamics.clear();
    }
}

/// Resolves endpoints on behalf of one route under construction.
pub struct RouteSetup<'a> {
    registry: &'a EndpointRegistry,
    route_id: String,
    resolved: Vec<String>,
}

impl RouteSetup<'_> {
    pub async fn resolve(&mut self, uri: &str) -> Result<Arc<dyn Endpoint>, EngineError> {
        let endpoint = self
            .registry
            .resolve_with_owner(uri, Some(&self.route_id))
            .await?;
        self.resolved.push(endpoint.uri().as_str().to_string());
        Ok(endpoint)
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    /// Normalized URIs resolved so far, in resolution order.
    pub fn resolved(&self) -> &[String] {
        &self.resolved
    }

    /// Releases every ownership taken so far; used when setup fails half way.
    pub fn abandon(self) -> Vec<String> {
        self.registry.remove_route_endpoints(&self.route_id)
    }
}

#[cfg(test)]
mod tests {
    use super::EndpointRegistry;
    use crate::control_plane::component_registry::ComponentRegistry;
    use crate::error::EngineError;
    use crate::testing::{CountingComponent, CountingOptions};
    use std::sync::Arc;

    fn registry(max_size: usize, options: CountingOptions) -> (EndpointRegistry, CountingComponent) {
        let component = CountingComponent::new(options);
        let components = Arc::new(ComponentRegistry::new());
        components.add("counting", Arc::new(component.clone()));
        (EndpointRegistry::new(components, max_size), component)
    }

    #[tokio::test]
    async fn resolving_twice_returns_the_same_instance() {
        let (registry, component) = registry(10, CountingOptions::default());
        let first = registry.resolve("counting:a?x=1&y=2").await.expect("first");
        let second = registry.resolve("counting://a?y=2&x=1").await.expect("second");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(component.endpoints_created(), 1);
        assert_eq!(registry.dynamic_size(), 1);
    }

    #[tokio::test]
    async fn unknown_scheme_is_reported() {
        let (registry, _) = registry(10, CountingOptions::default());
        let err = registry.resolve("nope:x").await.err().expect("must fail");
        assert_eq!(
            err,
            EngineError::NoSuchComponent {
                scheme: "nope".to_string()
            }
        );
    }

    #[tokio::test]
    async fn unknown_parameters_are_rejected() {
        let (registry, _) = registry(
            10,
            CountingOptions {
                known_parameters: Some(vec!["size"]),
                ..Default::default()
            },
        );
        assert!(registry.resolve("counting:a?size=1").await.is_ok());
        let err = registry
            .resolve("counting:b?size=1&colour=red")
            .await
            .err()
            .expect("must fail");
        match err {
            EngineError::ResolveEndpointFailed { reason, .. } => assert!(reason.contains("colour")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn dynamic_entries_are_evicted_lru_but_statics_survive() {
        let (registry, _) = registry(3, CountingOptions::default());
        {
            let mut setup = registry.begin_route_setup("route-1");
            setup.resolve("counting:s1").await.expect("s1");
            setup.resolve("counting:s2").await.expect("s2");
        }
        registry.resolve("counting:d1").await.expect("d1");
        registry.resolve("counting:d2").await.expect("d2");
        registry.resolve("counting:d3").await.expect("d3");

        assert_eq!(registry.size(), 3);
        assert_eq!(registry.static_size(), 2);
        assert!(registry.contains("counting:d3"));
        assert!(!registry.contains("counting:d1"));
        assert!(registry.is_static("counting:s1"));
    }

    #[tokio::test]
    async fn statics_leave_with_their_last_owning_route() {
        let (registry, _) = registry(10, CountingOptions::default());
        let mut first = registry.begin_route_setup("first");
        first.resolve("counting:shared").await.expect("shared");
        first.resolve("counting:only-first").await.expect("only");
        let mut second = registry.begin_route_setup("second");
        second.resolve("counting:shared").await.expect("shared");

        assert_eq!(
            registry.remove_route_endpoints("first"),
            vec!["counting://only-first"]
        );
        assert!(registry.contains("counting:shared"));
        assert_eq!(
            registry.remove_route_endpoints("second"),
            vec!["counting://shared"]
        );
        assert_eq!(registry.size(), 0);
    }

    #[tokio::test]
    async fn route_reference_promotes_dynamic_entry() {
        let (registry, _) = registry(10, CountingOptions::default());
        let dynamic = registry.resolve("counting:x").await.expect("dynamic");
        let mut setup = registry.begin_route_setup("r");
        let promoted = setup.resolve("counting:x").await.expect("static");
        assert!(Arc::ptr_eq(&dynamic, &promoted));
        assert_eq!(registry.dynamic_size(), 0);
        assert_eq!(registry.static_size(), 1);
        assert_eq!(setup.resolved(), ["counting://x".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_resolvers_converge_on_one_instance() {
        let (registry, _) = registry(10, CountingOptions::default());
        let registry = Arc::new(registry);
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry.resolve("counting:race").await.expect("resolve")
            }));
        }
        let mut resolved = Vec::new();
        for task in tasks {
            resolved.push(task.await.expect("join"));
        }
        assert!(resolved.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(registry.size(), 1);
    }
}
