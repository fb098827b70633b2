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

use route_engine::components::QueueComponent;
use route_engine::testing::{CountingComponent, CountingOptions};
use route_engine::{
    EngineError, RouteContext, RouteDefinition, ServiceStatus, ShutdownRoute, ShutdownRunningTask,
};
use std::sync::Arc;
use std::time::Duration;
use support::{config_with_timeout, init_logging, wait_until, SlowProcessor};

struct Harness {
    context: RouteContext,
    queues: QueueComponent,
    sink: CountingComponent,
}

fn harness(timeout_secs: u64) -> Harness {
    init_logging();
    let context = RouteContext::with_default_components(config_with_timeout(timeout_secs));
    let queues = QueueComponent::new();
    let sink = CountingComponent::new(CountingOptions::default());
    context.add_component("queue", Arc::new(queues.clone()));
    context.add_component("counting", Arc::new(sink.clone()));
    Harness {
        context,
        queues,
        sink,
    }
}

async fn add_slow_route(harness: &Harness, processor: Arc<SlowProcessor>) {
    harness
        .context
        .add_route(
            RouteDefinition::new("slow", "queue:work")
                .process(processor)
                .to("counting:done"),
        )
        .await
        .expect("route should be added");
}

#[tokio::test(start_paused = true)]
async fn stop_waits_for_inflight_exchange() {
    let harness = harness(30);
    let processor = SlowProcessor::new(Duration::from_millis(500));
    add_slow_route(&harness, processor.clone()).await;
    harness.context.start().await.expect("context should start");

    harness
        .context
        .producer_template()
        .send_body("queue:work", "job")
        .await
        .expect("enqueue");
    processor.wait_entered().await;

    let drained = harness
        .context
        .stop_route("slow")
        .await
        .expect("stop should succeed");
    assert!(drained);
    assert_eq!(processor.completed(), 1);
    assert_eq!(harness.sink.processed("counting://done"), 1);
    assert!(!harness.context.shutdown_strategy().has_timeout_occurred());
    assert_eq!(
        harness.context.route_status("slow"),
        Some(ServiceStatus::Stopped)
    );
    assert_eq!(harness.context.inflight_repository().size(), 0);
    harness.context.stop().await.expect("context should stop");
}

#[tokio::test(start_paused = true)]
async fn timeout_forces_stop_and_discards_inflight() {
    let harness = harness(1);
    let processor = SlowProcessor::new(Duration::from_secs(60));
    add_slow_route(&harness, processor.clone()).await;
    harness.context.start().await.expect("context should start");

    harness
        .context
        .producer_template()
        .send_body("queue:work", "stuck")
        .await
        .expect("enqueue");
    processor.wait_entered().await;
    assert_eq!(harness.context.inflight_repository().route_size("slow"), 1);

    let drained = harness
        .context
        .stop_route("slow")
        .await
        .expect("stop should succeed");
    assert!(!drained);
    assert!(harness.context.shutdown_strategy().has_timeout_occurred());
    assert_eq!(processor.completed(), 0);
    assert_eq!(harness.sink.processed("counting://done"), 0);
    assert_eq!(harness.context.inflight_repository().size(), 0);
    assert_eq!(
        harness.context.route_status("slow"),
        Some(ServiceStatus::Stopped)
    );
    harness.context.stop().await.expect("context should stop");
}

#[tokio::test(start_paused = true)]
async fn suspended_route_leaves_messages_queued() {
    let harness = harness(5);
    let processor = SlowProcessor::new(Duration::from_millis(1));
    add_slow_route(&harness, processor.clone()).await;
    harness.context.start().await.expect("context should start");

    harness
        .context
        .suspend_route("slow")
        .await
        .expect("suspend should succeed");
    let template = harness.context.producer_template();
    for index in 0..3 {
        template
            .send_body("queue:work", index)
            .await
            .expect("enqueue while suspended");
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    let queue = harness.queues.queue("work").expect("queue exists");
    assert_eq!(queue.len(), 3);
    assert_eq!(processor.entered(), 0);

    harness
        .context
        .resume_route("slow")
        .await
        .expect("resume should succeed");
    let drained = wait_until(|| processor.completed() == 3, Duration::from_secs(5)).await;
    assert!(drained, "resumed route should consume the backlog");
    assert!(queue.is_empty());
    harness.context.stop().await.expect("context should stop");
}

/// `feeder` drains `queue:work` through a slow step into `direct:tail`, which
/// the `tail` route forwards to `counting:done`.
async fn add_feeder_and_tail(
    harness: &Harness,
    processor: Arc<SlowProcessor>,
    tail: ShutdownRoute,
) {
    harness
        .context
        .add_route(
            RouteDefinition::new("feeder", "queue:work")
                .process(processor)
                .to("direct:tail"),
        )
        .await
        .expect("feeder should be added");
    harness
        .context
        .add_route(
            RouteDefinition::new("tail", "direct:tail")
                .to("counting:done")
                .shutdown_route(tail),
        )
        .await
        .expect("tail should be added");
}

#[tokio::test(start_paused = true)]
async fn deferred_route_keeps_consuming_until_others_drain() {
    let harness = harness(30);
    let processor = SlowProcessor::new(Duration::from_millis(500));
    add_feeder_and_tail(&harness, processor.clone(), ShutdownRoute::Defer).await;
    harness.context.start().await.expect("context should start");

    harness
        .context
        .producer_template()
        .send_body("queue:work", "job")
        .await
        .expect("enqueue");
    processor.wait_entered().await;

    harness.context.stop().await.expect("context should stop");
    assert_eq!(processor.completed(), 1);
    assert_eq!(harness.sink.processed("counting://done"), 1);
    assert!(!harness.context.shutdown_strategy().has_timeout_occurred());
    assert_eq!(harness.context.route_status("tail"), Some(ServiceStatus::Stopped));
    assert_eq!(harness.context.inflight_repository().size(), 0);
}

#[tokio::test(start_paused = true)]
async fn default_route_is_paused_before_upstream_drains() {
    let harness = harness(30);
    let processor = SlowProcessor::new(Duration::from_millis(500));
    add_feeder_and_tail(&harness, processor.clone(), ShutdownRoute::Default).await;
    harness.context.start().await.expect("context should start");

    harness
        .context
        .producer_template()
        .send_body("queue:work", "job")
        .await
        .expect("enqueue");
    processor.wait_entered().await;

    harness.context.stop().await.expect("context should stop");
    assert_eq!(processor.completed(), 1);
    assert_eq!(harness.sink.processed("counting://done"), 0);
    assert_eq!(harness.context.inflight_repository().size(), 0);
}

async fn add_batch_route(
    harness: &Harness,
    processor: Arc<SlowProcessor>,
    task: ShutdownRunningTask,
) {
    harness
        .context
        .add_route(
            RouteDefinition::new("batch", "queue:jobs")
                .process(processor)
                .to("counting:done")
                .shutdown_running_task(task),
        )
        .await
        .expect("route should be added");
}

async fn enqueue_jobs(harness: &Harness, count: usize) {
    let template = harness.context.producer_template();
    for index in 0..count {
        template
            .send_body("queue:jobs", index)
            .await
            .expect("enqueue");
    }
}

#[tokio::test(start_paused = true)]
async fn complete_all_tasks_drains_queued_backlog() {
    let harness = harness(30);
    let processor = SlowProcessor::new(Duration::from_secs(1));
    add_batch_route(&harness, processor.clone(), ShutdownRunningTask::CompleteAllTasks).await;
    harness.context.start().await.expect("context should start");
    enqueue_jobs(&harness, 3).await;
    processor.wait_entered().await;

    let drained = harness
        .context
        .stop_route("batch")
        .await
        .expect("stop should succeed");
    assert!(drained);
    assert_eq!(processor.completed(), 3);
    assert_eq!(harness.sink.processed("counting://done"), 3);
    assert!(harness.queues.queue("jobs").expect("queue exists").is_empty());
    assert_eq!(
        harness.context.route_status("batch"),
        Some(ServiceStatus::Stopped)
    );
    harness.context.stop().await.expect("context should stop");
}

#[tokio::test(start_paused = true)]
async fn complete_current_task_leaves_backlog_queued() {
    let harness = harness(30);
    let processor = SlowProcessor::new(Duration::from_secs(1));
    add_batch_route(
        &harness,
        processor.clone(),
        ShutdownRunningTask::CompleteCurrentTaskOnly,
    )
    .await;
    harness.context.start().await.expect("context should start");
    enqueue_jobs(&harness, 3).await;
    processor.wait_entered().await;

    let drained = harness
        .context
        .stop_route("batch")
        .await
        .expect("stop should succeed");
    assert!(drained);
    assert_eq!(processor.completed(), 1);
    assert_eq!(harness.sink.processed("counting://done"), 1);
    assert_eq!(harness.queues.queue("jobs").expect("queue exists").len(), 2);
    harness.context.stop().await.expect("context should stop");
}

#[tokio::test]
async fn zero_timeout_is_rejected() {
    let harness = harness(5);
    add_slow_route(&harness, SlowProcessor::new(Duration::from_millis(1))).await;
    harness.context.start().await.expect("context should start");

    let err = harness
        .context
        .stop_route_with_timeout("slow", Duration::ZERO)
        .await
        .expect_err("zero timeout");
    assert!(matches!(err, EngineError::IllegalState(_)));
    assert_eq!(
        harness.context.route_status("slow"),
        Some(ServiceStatus::Started)
    );
    harness.context.stop().await.expect("context should stop");
}

#[tokio::test]
async fn context_stop_forgets_dynamic_endpoints_only() {
    let harness = harness(5);
    add_slow_route(&harness, SlowProcessor::new(Duration::from_millis(1))).await;
    harness.context.start().await.expect("context should start");

    harness
        .context
        .producer_template()
        .send_body("counting:adhoc", "direct send")
        .await
        .expect("send to dynamic endpoint");
    let registry = harness.context.endpoint_registry();
    assert!(registry.contains("counting:adhoc"));
    assert!(!registry.is_static("counting:adhoc"));
    assert!(harness.context.producer_cache().size() > 0);

    harness.context.stop().await.expect("context should stop");
    assert_eq!(harness.context.status(), ServiceStatus::Stopped);
    assert_eq!(
        harness.context.route_status("slow"),
        Some(ServiceStatus::Stopped)
    );
    assert_eq!(harness.context.producer_cache().size(), 0);
    assert!(!registry.contains("counting:adhoc"));
    assert!(registry.is_static("queue:work"));
    assert!(registry.is_static("counting:done"));
}

#[tokio::test]
async fn shutdown_removes_routes_and_is_final() {
    let harness = harness(5);
    add_slow_route(&harness, SlowProcessor::new(Duration::from_millis(1))).await;
    harness.context.start().await.expect("context should start");

    harness.context.shutdown().await.expect("shutdown");
    assert_eq!(harness.context.status(), ServiceStatus::Shutdown);
    assert!(harness.context.route_ids().is_empty());
    assert_eq!(harness.context.endpoint_registry().size(), 0);

    let err = harness.context.start().await.expect_err("cannot restart");
    assert!(matches!(err, EngineError::IllegalState(_)));
}
