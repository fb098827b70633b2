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

mod support;

use route_engine::testing::{CountingComponent, CountingOptions};
use route_engine::{Endpoint, Exchange, ProducerCache, ServiceStatus};
use std::sync::Arc;
use support::init_logging;

async fn endpoints(component: &CountingComponent, count: usize) -> Vec<Arc<dyn Endpoint>> {
    let mut resolved = Vec::with_capacity(count);
    for index in 1..=count {
        resolved.push(
            component
                .endpoint(&format!("counting:e{index}"))
                .await
                .expect("endpoint should resolve"),
        );
    }
    resolved
}

#[tokio::test]
async fn capacity_five_with_eight_endpoints_stops_three_oldest() {
    init_logging();
    let component = CountingComponent::new(CountingOptions::default());
    let cache = ProducerCache::new("eviction", 5, false, 0);
    cache.start();
    let targets = endpoints(&component, 8).await;

    for target in &targets {
        let mut exchange = Exchange::with_body("ping");
        cache
            .send(target, &mut exchange)
            .await
            .expect("send should succeed");
    }

    assert_eq!(cache.size(), 5);
    for target in &targets[..3] {
        assert_eq!(component.stopped(target.uri().as_str()), 1);
    }
    for target in &targets[3..] {
        assert_eq!(component.stopped(target.uri().as_str()), 0);
        assert_eq!(component.processed(target.uri().as_str()), 1);
    }
    let mut cached = cache.cached_uris();
    cached.sort();
    assert_eq!(
        cached,
        vec![
            "counting://e4",
            "counting://e5",
            "counting://e6",
            "counting://e7",
            "counting://e8"
        ]
    );

    cache.stop().await;
    assert_eq!(cache.size(), 0);
    assert_eq!(component.total_stopped(), 8);
}

#[tokio::test]
async fn size_never_exceeds_capacity_while_idle() {
    init_logging();
    let component = CountingComponent::new(CountingOptions::default());
    let cache = ProducerCache::new("invariant", 3, false, 0);
    let targets = endpoints(&component, 6).await;

    let pattern = [0usize, 1, 2, 3, 0, 4, 5, 5, 1, 2, 3, 0];
    for index in pattern {
        let mut exchange = Exchange::new();
        cache
            .send(&targets[index], &mut exchange)
            .await
            .expect("send should succeed");
        assert!(cache.size() <= cache.capacity());
    }
    assert_eq!(cache.size(), 3);
    assert_eq!(
        component.total_created() - component.total_stopped(),
        cache.size()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn borrowed_producer_evicted_is_stopped_exactly_once() {
    init_logging();
    let component = CountingComponent::new(CountingOptions::default());
    let cache = Arc::new(ProducerCache::new("exactly-once", 4, false, 0));
    let target = component
        .endpoint("counting:shared")
        .await
        .expect("endpoint should resolve");

    let mut leases = Vec::new();
    for _ in 0..8 {
        leases.push(
            cache
                .acquire_producer(&target)
                .await
                .expect("acquire should succeed"),
        );
    }
    assert_eq!(component.created("counting://shared"), 1);

    let evicted = cache.evict(target.uri()).await;
    assert_eq!(evicted, 1);
    assert_eq!(component.stopped("counting://shared"), 0);

    let mut releases = Vec::new();
    for lease in leases {
        let cache = cache.clone();
        releases.push(tokio::spawn(async move {
            cache.release_producer(lease).await;
        }));
    }
    for release in releases {
        release.await.expect("release task should finish");
    }

    assert_eq!(component.stopped("counting://shared"), 1);
    assert_eq!(cache.size(), 0);

    let fresh = cache
        .acquire_producer(&target)
        .await
        .expect("acquire after eviction should create a new producer");
    assert_eq!(fresh.status(), ServiceStatus::Started);
    cache.release_producer(fresh).await;
    assert_eq!(component.created("counting://shared"), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_senders_keep_every_producer_accounted_for() {
    init_logging();
    let component = CountingComponent::new(CountingOptions::default());
    let cache = Arc::new(ProducerCache::new("churn", 4, false, 0));
    let targets = Arc::new(endpoints(&component, 10).await);

    let mut tasks = Vec::new();
    for worker in 0..8usize {
        let cache = cache.clone();
        let targets = targets.clone();
        tasks.push(tokio::spawn(async move {
            for round in 0..50usize {
                let target = &targets[(worker * 7 + round * 3) % targets.len()];
                let mut exchange = Exchange::new();
                cache
                    .send(target, &mut exchange)
                    .await
                    .expect("send should succeed");
            }
        }));
    }
    for task in tasks {
        task.await.expect("sender task should finish");
    }

    assert!(cache.size() <= 4);
    assert_eq!(
        component.total_created() - component.total_stopped(),
        cache.size()
    );
    cache.stop().await;
    assert_eq!(component.total_created(), component.total_stopped());
}
