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

//! Service lifecycle state machine.
//!
//! Every stateful piece of the engine (producers, consumers, pools, routes, the
//! context itself) moves through the same states. [`ManagedService`] wraps a
//! [`Lifecycle`] implementation and guarantees that its hooks run once per
//! effective transition no matter how many tasks race on `start`/`stop`.

use crate::error::EngineError;
use crate::observability::events;
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

const COMPONENT: &str = "service";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServiceStatus {
    New = 0,
    Starting = 1,
    Started = 2,
    Stopping = 3,
    Stopped = 4,
    Suspending = 5,
    Suspended = 6,
    Resuming = 7,
    Shutdown = 8,
    Failed = 9,
}

impl ServiceStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ServiceStatus::New,
            1 => ServiceStatus::Starting,
            2 => ServiceStatus::Started,
            3 => ServiceStatus::Stopping,
            4 => ServiceStatus::Stopped,
            5 => ServiceStatus::Suspending,
            6 => ServiceStatus::Suspended,
            7 => ServiceStatus::Resuming,
            8 => ServiceStatus::Shutdown,
            _ => ServiceStatus::Failed,
        }
    }

    pub fn is_started(self) -> bool {
        self == ServiceStatus::Started
    }

    /// `true` for every state in which the service does no work.
    pub fn is_stopped(self) -> bool {
        matches!(
            self,
            ServiceStatus::New
                | ServiceStatus::Stopped
                | ServiceStatus::Shutdown
                | ServiceStatus::Failed
        )
    }

    pub fn is_suspended(self) -> bool {
        self == ServiceStatus::Suspended
    }

    pub fn is_terminal(self) -> bool {
        self == ServiceStatus::Shutdown
    }
}

impl Display for ServiceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ServiceStatus::New => "New",
            ServiceStatus::Starting => "Starting",
            ServiceStatus::Started => "Started",
            ServiceStatus::Stopping => "Stopping",
            ServiceStatus::Stopped => "Stopped",
            ServiceStatus::Suspending => "Suspending",
            ServiceStatus::Suspended => "Suspended",
            ServiceStatus::Resuming => "Resuming",
            ServiceStatus::Shutdown => "Shutdown",
            ServiceStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Hooks invoked by [`ManagedService`] on each effective transition.
///
/// Implementations only contain the work; state bookkeeping, idempotency and
/// serialization of concurrent callers are handled by the wrapper.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    async fn do_start(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn do_stop(&self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Services that cannot suspend are stopped on `suspend` and started on `resume`.
    fn supports_suspension(&self) -> bool {
        false
    }

    async fn do_suspend(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn do_resume(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn do_shutdown(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Atomic status cell plus the gate that serializes transitions.
///
/// Reads of the status never block; transitions hold the gate across the hook
/// they run.
pub struct ServiceState {
    status: AtomicU8,
    gate: Mutex<()>,
}

impl ServiceState {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(ServiceStatus::New as u8),
            gate: Mutex::new(()),
        }
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, status: ServiceStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    pub(crate) async fn transition(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::new()
    }
}

/// A named [`Lifecycle`] implementation with a tracked status.
pub struct ManagedService<S: ?Sized> {
    name: String,
    state: ServiceState,
    stop_count: AtomicUsize,
    service: Box<S>,
}

impl<S: ?Sized + Lifecycle> ManagedService<S> {
    pub fn new(name: impl Into<String>, service: Box<S>) -> Self {
        Self {
            name: name.into(),
            state: ServiceState::new(),
            stop_count: AtomicUsize::new(0),
            service,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> ServiceStatus {
        self.state.status()
    }

    pub fn get(&self) -> &S {
        &self.service
    }

    /// Number of times the stop hook actually ran.
    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::Acquire)
    }

    pub async fn start(&self) -> Result<(), EngineError> {
        let _gate = self.state.transition().await;
        self.start_locked().await
    }

    /// Runs the stop hook at most once. A service that never finished
    /// starting (`New` or `Failed`) moves to `Stopped` without the hook.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let _gate = self.state.transition().await;
        self.stop_locked().await
    }

    pub async fn suspend(&self) -> Result<(), EngineError> {
        let _gate = self.state.transition().await;
        match self.state.status() {
            ServiceStatus::Suspended => Ok(()),
            ServiceStatus::Stopped if !self.service.supports_suspension() => Ok(()),
            ServiceStatus::Started => {
                if !self.service.supports_suspension() {
                    return self.stop_locked().await;
                }
                self.state.set(ServiceStatus::Suspending);
                match self.service.do_suspend().await {
                    Ok(()) => {
                        self.state.set(ServiceStatus::Suspended);
                        debug!(
                            event = events::SERVICE_SUSPEND_OK,
                            component = COMPONENT,
                            service = %self.name,
                            "service suspended"
                        );
                        Ok(())
                    }
                    Err(err) => {
                        self.state.set(ServiceStatus::Started);
                        Err(err)
                    }
                }
            }
            other => Err(EngineError::illegal_state(format!(
                "cannot suspend {} while {other}",
                self.name
            ))),
        }
    }

    pub async fn resume(&self) -> Result<(), EngineError> {
        let _gate = self.state.transition().await;
        match self.state.status() {
            ServiceStatus::Started => Ok(()),
            ServiceStatus::Suspended => self.resume_locked().await,
            ServiceStatus::Stopped if !self.service.supports_suspension() => {
                self.start_locked().await
            }
            other => Err(EngineError::illegal_state(format!(
                "cannot resume {} while {other}",
                self.name
            ))),
        }
    }

    /// Stops the service if needed and moves it to the terminal state.
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let _gate = self.state.transition().await;
        if self.state.status() == ServiceStatus::Shutdown {
            return Ok(());
        }
        if let Err(err) = self.stop_locked().await {
            warn!(
                event = events::SERVICE_STOP_FAILED,
                component = COMPONENT,
                service = %self.name,
                err = %err,
                "stop failed during shutdown"
            );
        }
        let outcome = self.service.do_shutdown().await;
        self.state.set(ServiceStatus::Shutdown);
        outcome
    }

    async fn start_locked(&self) -> Result<(), EngineError> {
        match self.state.status() {
            ServiceStatus::Started => return Ok(()),
            ServiceStatus::Suspended => return self.resume_locked().await,
            ServiceStatus::Shutdown => {
                return Err(EngineError::illegal_state(format!(
                    "{} is shut down and cannot be started",
                    self.name
                )))
            }
            _ => {}
        }

        self.state.set(ServiceStatus::Starting);
        match self.service.do_start().await {
            Ok(()) => {
                self.state.set(ServiceStatus::Started);
                debug!(
                    event = events::SERVICE_START_OK,
                    component = COMPONENT,
                    service = %self.name,
                    "service started"
                );
                Ok(())
            }
            Err(err) => {
                self.state.set(ServiceStatus::Failed);
                warn!(
                    event = events::SERVICE_START_FAILED,
                    component = COMPONENT,
                    service = %self.name,
                    err = %err,
                    "service failed to start"
                );
                Err(err)
            }
        }
    }

    async fn resume_locked(&self) -> Result<(), EngineError> {
        self.state.set(ServiceStatus::Resuming);
        match self.service.do_resume().await {
            Ok(()) => {
                self.state.set(ServiceStatus::Started);
                Ok(())
            }
            Err(err) => {
                self.state.set(ServiceStatus::Suspended);
                Err(err)
            }
        }
    }

    async fn stop_locked(&self) -> Result<(), EngineError> {
        match self.state.status() {
            ServiceStatus::Stopped | ServiceStatus::Shutdown => Ok(()),
            ServiceStatus::New | ServiceStatus::Failed => {
                self.state.set(ServiceStatus::Stopped);
                Ok(())
            }
            _ => {
                self.state.set(ServiceStatus::Stopping);
                self.stop_count.fetch_add(1, Ordering::AcqRel);
                let outcome = self.service.do_stop().await;
                self.state.set(ServiceStatus::Stopped);
                match &outcome {
                    Ok(()) => debug!(
                        event = events::SERVICE_STOP_OK,
                        component = COMPONENT,
                        service = %self.name,
                        "service stopped"
                    ),
                    Err(err) => warn!(
                        event = events::SERVICE_STOP_FAILED,
                        component = COMPONENT,
                        service = %self.name,
                        err = %err,
                        "service stop hook failed"
                    ),
                }
                outcome
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Lifecycle, ManagedService, ServiceStatus};
    use crate::error::EngineError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        starts: AtomicUsize,
        stops: AtomicUsize,
        suspends: AtomicUsize,
        resumes: AtomicUsize,
        suspendable: bool,
        fail_start: AtomicBool,
    }

    #[async_trait]
    impl Lifecycle for Recorder {
        async fn do_start(&self) -> Result<(), EngineError> {
            if self.fail_start.load(Ordering::SeqCst) {
                return Err(EngineError::illegal_state("boom"));
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn do_stop(&self) -> Result<(), EngineError> {
            tokio::task::yield_now().await;
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn supports_suspension(&self) -> bool {
            self.suspendable
        }

        async fn do_suspend(&self) -> Result<(), EngineError> {
            self.suspends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn do_resume(&self) -> Result<(), EngineError> {
            self.resumes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn managed(suspendable: bool) -> ManagedService<Recorder> {
        ManagedService::new(
            "recorder",
            Box::new(Recorder {
                suspendable,
                ..Default::default()
            }),
        )
    }

    #[tokio::test]
    async fn stop_twice_runs_hook_once() {
        let service = managed(false);
        service.start().await.expect("start");
        service.stop().await.expect("first stop");
        service.stop().await.expect("second stop");
        assert_eq!(service.get().stops.load(Ordering::SeqCst), 1);
        assert_eq!(service.status(), ServiceStatus::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_stops_run_hook_once() {
        let service = Arc::new(managed(false));
        service.start().await.expect("start");

        let mut handles = Vec::new();
        for _ in 0..16 {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.stop().await }));
        }
        for handle in handles {
            handle.await.expect("join").expect("stop");
        }

        assert_eq!(service.get().stops.load(Ordering::SeqCst), 1);
        assert_eq!(service.stop_count(), 1);
    }

    #[tokio::test]
    async fn stopping_a_new_service_skips_the_hook() {
        let service = managed(false);
        service.stop().await.expect("stop");
        assert_eq!(service.status(), ServiceStatus::Stopped);
        assert_eq!(service.get().stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let service = managed(false);
        service.start().await.expect("start");
        service.start().await.expect("start again");
        assert_eq!(service.get().starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn suspend_and_resume_use_hooks_when_supported() {
        let service = managed(true);
        service.start().await.expect("start");
        service.suspend().await.expect("suspend");
        assert_eq!(service.status(), ServiceStatus::Suspended);
        service.resume().await.expect("resume");
        assert_eq!(service.status(), ServiceStatus::Started);
        assert_eq!(service.get().suspends.load(Ordering::SeqCst), 1);
        assert_eq!(service.get().resumes.load(Ordering::SeqCst), 1);
        assert_eq!(service.get().stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn suspend_falls_back_to_stop_without_support() {
        let service = managed(false);
        service.start().await.expect("start");
        service.suspend().await.expect("suspend");
        assert_eq!(service.status(), ServiceStatus::Stopped);
        service.resume().await.expect("resume");
        assert_eq!(service.status(), ServiceStatus::Started);
        assert_eq!(service.get().stops.load(Ordering::SeqCst), 1);
        assert_eq!(service.get().starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn start_on_suspended_resumes() {
        let service = managed(true);
        service.start().await.expect("start");
        service.suspend().await.expect("suspend");
        service.start().await.expect("start resumes");
        assert_eq!(service.status(), ServiceStatus::Started);
        assert_eq!(service.get().starts.load(Ordering::SeqCst), 1);
        assert_eq!(service.get().resumes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resume_of_new_service_is_rejected() {
        let service = managed(true);
        let err = service.resume().await.expect_err("resume must fail");
        assert!(matches!(err, EngineError::IllegalState(_)));
    }

    #[tokio::test]
    async fn failed_start_marks_failed_and_can_retry() {
        let service = managed(false);
        service.get().fail_start.store(true, Ordering::SeqCst);
        assert!(service.start().await.is_err());
        assert_eq!(service.status(), ServiceStatus::Failed);

        service.get().fail_start.store(false, Ordering::SeqCst);
        service.start().await.expect("retry start");
        assert_eq!(service.status(), ServiceStatus::Started);
    }

    #[tokio::test]
    async fn stopping_a_failed_service_skips_the_hook() {
        let service = managed(false);
        service.get().fail_start.store(true, Ordering::SeqCst);
        assert!(service.start().await.is_err());

        service.stop().await.expect("stop after failed start");
        assert_eq!(service.status(), ServiceStatus::Stopped);
        assert_eq!(service.get().stops.load(Ordering::SeqCst), 0);
        assert_eq!(service.stop_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_is_terminal() {
        let service = managed(false);
        service.start().await.expect("start");
        service.shutdown().await.expect("shutdown");
        service.shutdown().await.expect("second shutdown");
        assert_eq!(service.status(), ServiceStatus::Shutdown);
        assert_eq!(service.get().stops.load(Ordering::SeqCst), 1);
        assert!(service.start().await.is_err());
    }
}
