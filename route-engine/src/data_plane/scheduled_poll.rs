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

//! Consumer that polls on a fixed delay with optional back-off.
//!
//! After `backoff_idle_threshold` consecutive empty polls, or
//! `backoff_error_threshold` consecutive failed polls, the next
//! `backoff_multiplier` scheduled runs are skipped. The counters reset once the
//! skipped runs are used up or a poll returns messages.

use crate::endpoint::Consumer;
use crate::error::EngineError;
use crate::observability::events;
use crate::routing::uri::EndpointUri;
use crate::runtime::worker_runtime::{spawn_worker, StopSignal, WorkerHandle};
use crate::service::Lifecycle;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const COMPONENT: &str = "scheduled_poll";

/// One poll against the underlying resource, returning how many messages were handled.
#[async_trait]
pub trait Poller: Send + Sync + 'static {
    async fn poll(&self) -> Result<usize, EngineError>;
}

/// Hooks around each poll.
pub trait PollStrategy: Send + Sync {
    /// Returning `false` skips this poll.
    fn begin(&self, _uri: &EndpointUri) -> bool {
        true
    }

    fn commit(&self, _uri: &EndpointUri, _polled: usize) {}

    /// Returning `true` retries the poll immediately.
    fn rollback(&self, uri: &EndpointUri, retry_count: u32, err: &EngineError) -> bool;
}

/// Logs a failed poll and waits for the next scheduled run.
pub struct DefaultPollStrategy;

impl PollStrategy for DefaultPollStrategy {
    fn rollback(&self, uri: &EndpointUri, retry_count: u32, err: &EngineError) -> bool {
        warn!(
            event = events::POLL_FAILED,
            component = COMPONENT,
            endpoint_uri = %uri.sanitized(),
            retry_count,
            err = %err,
            "consumer poll failed; will try again on next poll"
        );
        false
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledPollConfig {
    pub initial_delay: Duration,
    pub delay: Duration,
    pub backoff_multiplier: u32,
    pub backoff_idle_threshold: u32,
    pub backoff_error_threshold: u32,
    /// Stop polling after this many executed polls; `0` polls forever.
    pub repeat_count: u64,
    /// Poll again immediately while the previous poll returned messages.
    pub greedy: bool,
}

impl Default for ScheduledPollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            delay: Duration::from_millis(500),
            backoff_multiplier: 0,
            backoff_idle_threshold: 0,
            backoff_error_threshold: 0,
            repeat_count: 0,
            greedy: false,
        }
    }
}

impl ScheduledPollConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.backoff_multiplier > 0
            && self.backoff_idle_threshold == 0
            && self.backoff_error_threshold == 0
        {
            return Err(EngineError::illegal_state(
                "backoff_idle_threshold and/or backoff_error_threshold must be configured when backoff_multiplier is set",
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PollOutcome {
    Messages,
    Idle,
    Failed,
}

#[derive(Debug, Default)]
struct Backoff {
    multiplier: u32,
    idle_threshold: u32,
    error_threshold: u32,
    idle: u32,
    errors: u32,
    skipped: u32,
}

impl Backoff {
    fn new(config: &ScheduledPollConfig) -> Self {
        Self {
            multiplier: config.backoff_multiplier,
            idle_threshold: config.backoff_idle_threshold,
            error_threshold: config.backoff_error_threshold,
            ..Default::default()
        }
    }

    fn should_skip(&mut self) -> bool {
        if self.multiplier == 0 {
            return false;
        }
        let idle = self.idle_threshold > 0 && self.idle >= self.idle_threshold;
        let failing = self.error_threshold > 0 && self.errors >= self.error_threshold;
        if !(idle || failing) {
            return false;
        }
        self.skipped += 1;
        if self.skipped <= self.multiplier {
            return true;
        }
        self.idle = 0;
        self.errors = 0;
        self.skipped = 0;
        false
    }

    fn record(&mut self, outcome: PollOutcome) {
        match outcome {
            PollOutcome::Messages => {
                self.idle = 0;
                self.errors = 0;
            }
            PollOutcome::Idle => {
                self.idle += 1;
                self.errors = 0;
            }
            PollOutcome::Failed => {
                self.errors += 1;
                self.idle = 0;
            }
        }
    }
}

/// Event-driven [`Consumer`] driven by a timer instead of by incoming messages.
pub struct ScheduledPollConsumer<P: Poller> {
    uri: EndpointUri,
    poller: Arc<P>,
    strategy: Arc<dyn PollStrategy>,
    config: ScheduledPollConfig,
    suspended: Arc<AtomicBool>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl<P: Poller> ScheduledPollConsumer<P> {
    pub fn new(uri: EndpointUri, poller: P, config: ScheduledPollConfig) -> Self {
        Self {
            uri,
            poller: Arc::new(poller),
            strategy: Arc::new(DefaultPollStrategy),
            config,
            suspended: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn with_strategy(mut self, strategy: Arc<dyn PollStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn config(&self) -> &ScheduledPollConfig {
        &self.config
    }
}

#[async_trait]
impl<P: Poller> Lifecycle for ScheduledPollConsumer<P> {
    async fn do_start(&self) -> Result<(), EngineError> {
        self.config.validate()?;
        self.suspended.store(false, Ordering::Release);

        let task = PollTask {
            uri: self.uri.clone(),
            poller: self.poller.clone(),
            strategy: self.strategy.clone(),
            config: self.config.clone(),
            suspended: self.suspended.clone(),
        };
        let handle = spawn_worker(format!("poll[{}]", self.uri.sanitized()), move |stop| {
            task.run(stop)
        });
        let previous = self.worker.lock().replace(handle);
        if let Some(previous) = previous {
            previous.stop().await;
        }
        Ok(())
    }

    async fn do_stop(&self) -> Result<(), EngineError> {
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
        Ok(())
    }

    fn supports_suspension(&self) -> bool {
        true
    }

    async fn do_suspend(&self) -> Result<(), EngineError> {
        self.suspended.store(true, Ordering::Release);
        Ok(())
    }

    async fn do_resume(&self) -> Result<(), EngineError> {
        self.suspended.store(false, Ordering::Release);
        Ok(())
    }
}

impl<P: Poller> Consumer for ScheduledPollConsumer<P> {
    fn endpoint_uri(&self) -> &EndpointUri {
        &self.uri
    }
}

struct PollTask<P: Poller> {
    uri: EndpointUri,
    poller: Arc<P>,
    strategy: Arc<dyn PollStrategy>,
    config: ScheduledPollConfig,
    suspended: Arc<AtomicBool>,
}

impl<P: Poller> PollTask<P> {
    async fn run(self, mut stop: StopSignal) {
        if stop.sleep(self.config.initial_delay).await {
            return;
        }

        let mut backoff = Backoff::new(&self.config);
        let mut executed: u64 = 0;
        loop {
            if !self.suspended.load(Ordering::Acquire) {
                if backoff.should_skip() {
                    debug!(
                        event = events::POLL_BACKOFF_SKIP,
                        component = COMPONENT,
                        endpoint_uri = %self.uri.sanitized(),
                        idle = backoff.idle,
                        errors = backoff.errors,
                        "skipping poll due to back-off"
                    );
                } else {
                    let outcome = self.poll_once(&stop).await;
                    backoff.record(outcome);
                    executed += 1;
                    if self.config.repeat_count > 0 && executed >= self.config.repeat_count {
                        debug!(
                            event = events::POLL_REPEAT_LIMIT,
                            component = COMPONENT,
                            endpoint_uri = %self.uri.sanitized(),
                            executed,
                            "repeat count reached"
                        );
                        return;
                    }
                }
            }

            if stop.sleep(self.config.delay).await {
                return;
            }
        }
    }

    async fn poll_once(&self, stop: &StopSignal) -> PollOutcome {
        if !self.strategy.begin(&self.uri) {
            return PollOutcome::Idle;
        }

        let mut retry_count = 0u32;
        let mut total = 0usize;
        loop {
            match self.poller.poll().await {
                Ok(polled) => {
                    self.strategy.commit(&self.uri, polled);
                    total += polled;
                    if self.config.greedy && polled > 0 && !stop.is_stopped() {
                        continue;
                    }
                    return if total > 0 {
                        PollOutcome::Messages
                    } else {
                        PollOutcome::Idle
                    };
                }
                Err(err) => {
                    if self.strategy.rollback(&self.uri, retry_count, &err) && !stop.is_stopped()
                    {
                        retry_count += 1;
                        continue;
                    }
                    return PollOutcome::Failed;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Backoff, PollOutcome, PollStrategy, Poller, ScheduledPollConfig, ScheduledPollConsumer,
    };
    use crate::error::EngineError;
    use crate::routing::uri::EndpointUri;
    use crate::service::ManagedService;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingPoller {
        polls: Arc<AtomicUsize>,
        fail_first: u32,
        seen: AtomicU32,
    }

    #[async_trait]
    impl Poller for CountingPoller {
        async fn poll(&self) -> Result<usize, EngineError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.seen.fetch_add(1, Ordering::SeqCst) < self.fail_first {
                return Err(EngineError::processing("timer://t", "transient"));
            }
            Ok(0)
        }
    }

    fn poller(polls: &Arc<AtomicUsize>, fail_first: u32) -> CountingPoller {
        CountingPoller {
            polls: polls.clone(),
            fail_first,
            seen: AtomicU32::new(0),
        }
    }

    fn uri() -> EndpointUri {
        EndpointUri::parse("timer:t").expect("uri")
    }

    #[test]
    fn backoff_skips_multiplier_runs_after_idle_threshold() {
        let mut backoff = Backoff::new(&ScheduledPollConfig {
            backoff_multiplier: 2,
            backoff_idle_threshold: 3,
            ..Default::default()
        });
        let mut executed = Vec::new();
        for run in 0..10 {
            if !backoff.should_skip() {
                executed.push(run);
                backoff.record(PollOutcome::Idle);
            }
        }
        assert_eq!(executed, vec![0, 1, 2, 5, 6, 7]);
    }

    #[test]
    fn successful_poll_resets_error_counter() {
        let mut backoff = Backoff::new(&ScheduledPollConfig {
            backoff_multiplier: 1,
            backoff_error_threshold: 2,
            ..Default::default()
        });
        backoff.record(PollOutcome::Failed);
        backoff.record(PollOutcome::Messages);
        backoff.record(PollOutcome::Failed);
        assert!(!backoff.should_skip());
        backoff.record(PollOutcome::Failed);
        assert!(backoff.should_skip());
        assert!(!backoff.should_skip());
    }

    #[tokio::test]
    async fn multiplier_without_threshold_refuses_to_start() {
        let polls = Arc::new(AtomicUsize::new(0));
        let consumer = ManagedService::new(
            "poll",
            Box::new(ScheduledPollConsumer::new(
                uri(),
                poller(&polls, 0),
                ScheduledPollConfig {
                    backoff_multiplier: 2,
                    ..Default::default()
                },
            )),
        );
        let err = consumer.start().await.expect_err("must fail");
        assert!(matches!(err, EngineError::IllegalState(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn polls_after_initial_delay_then_every_delay() {
        let polls = Arc::new(AtomicUsize::new(0));
        let consumer = ManagedService::new(
            "poll",
            Box::new(ScheduledPollConsumer::new(
                uri(),
                poller(&polls, 0),
                ScheduledPollConfig::default(),
            )),
        );
        consumer.start().await.expect("start");

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(polls.load(Ordering::SeqCst), 0);
        // polls at 1000, 1500, 2000
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(polls.load(Ordering::SeqCst), 3);

        consumer.suspend().await.expect("suspend");
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(polls.load(Ordering::SeqCst), 3);

        consumer.stop().await.expect("stop");
    }

    struct RetryOnce;

    impl PollStrategy for RetryOnce {
        fn rollback(&self, _uri: &EndpointUri, retry_count: u32, _err: &EngineError) -> bool {
            retry_count == 0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rollback_can_retry_immediately() {
        let polls = Arc::new(AtomicUsize::new(0));
        let consumer = ManagedService::new(
            "poll",
            Box::new(
                ScheduledPollConsumer::new(
                    uri(),
                    poller(&polls, 1),
                    ScheduledPollConfig {
                        initial_delay: Duration::from_millis(10),
                        repeat_count: 1,
                        ..Default::default()
                    },
                )
                .with_strategy(Arc::new(RetryOnce)),
            ),
        );
        consumer.start().await.expect("start");
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(polls.load(Ordering::SeqCst), 2);
        consumer.stop().await.expect("stop");
    }
}
