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

//! Runtime helper for spawning background consumer and poll loops.

use crate::observability::events;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const COMPONENT: &str = "worker_runtime";

/// Cooperative stop flag handed to a worker loop.
pub(crate) struct StopSignal(watch::Receiver<bool>);

impl StopSignal {
    pub(crate) fn is_stopped(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once a stop was requested or the handle was dropped.
    pub(crate) async fn stopped(&mut self) {
        while !*self.0.borrow() {
            if self.0.changed().await.is_err() {
                return;
            }
        }
    }

    /// Sleeps for `duration`; returns `true` when woken by a stop request instead.
    pub(crate) async fn sleep(&mut self, duration: Duration) -> bool {
        let interrupted = tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.stopped() => true,
        };
        interrupted || self.is_stopped()
    }
}

/// Owner side of a spawned worker loop.
pub(crate) struct WorkerHandle {
    name: String,
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub(crate) fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signals the loop and waits for it to finish.
    pub(crate) async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.join.await {
            if !err.is_cancelled() {
                warn!(
                    event = events::RUNTIME_WORKER_JOIN_FAILED,
                    component = COMPONENT,
                    worker = %self.name,
                    err = %err,
                    "worker loop ended abnormally"
                );
            }
        }
    }
}

pub(crate) fn spawn_worker<F, Fut>(name: impl Into<String>, run_loop: F) -> WorkerHandle
where
    F: FnOnce(StopSignal) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let name = name.into();
    let (stop, signal) = watch::channel(false);
    debug!(
        event = events::RUNTIME_SPAWN_OK,
        component = COMPONENT,
        worker = %name,
        "spawning worker loop"
    );
    let join = tokio::spawn(run_loop(StopSignal(signal)));
    WorkerHandle { name, stop, join }
}
