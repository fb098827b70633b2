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

//! Canonical structured event names used across `route-engine`.

// Service lifecycle events.
pub const SERVICE_START_OK: &str = "service_start_ok";
pub const SERVICE_START_FAILED: &str = "service_start_failed";
pub const SERVICE_STOP_OK: &str = "service_stop_ok";
pub const SERVICE_STOP_FAILED: &str = "service_stop_failed";
pub const SERVICE_SUSPEND_OK: &str = "service_suspend_ok";

// Service pool and cache events.
pub const POOL_ENTRY_REUSE: &str = "pool_entry_reuse";
pub const POOL_ENTRY_CREATE: &str = "pool_entry_create";
pub const POOL_ENTRY_EVICT: &str = "pool_entry_evict";
pub const POOL_ENTRY_RETIRE: &str = "pool_entry_retire";
pub const POOL_STOP: &str = "pool_stop";
pub const POOL_SERVICE_STOP_FAILED: &str = "pool_service_stop_failed";
pub const PRODUCER_SEND: &str = "producer_send";
pub const CONSUMER_RECEIVE: &str = "consumer_receive";

// Endpoint registry events.
pub const ENDPOINT_RESOLVE: &str = "endpoint_resolve";
pub const ENDPOINT_EVICT: &str = "endpoint_evict";
pub const ENDPOINT_DEREGISTER: &str = "endpoint_deregister";

// Control-plane lifecycle events.
pub const ROUTE_ADD_OK: &str = "route_add_ok";
pub const ROUTE_ADD_FAILED: &str = "route_add_failed";
pub const ROUTE_START_OK: &str = "route_start_ok";
pub const ROUTE_START_FAILED: &str = "route_start_failed";
pub const ROUTE_STARTUP_ORDER_CLASH: &str = "route_startup_order_clash";
pub const ROUTE_STOP_OK: &str = "route_stop_ok";
pub const ROUTE_STOP_FAILED: &str = "route_stop_failed";
pub const ROUTE_STOP_ALL: &str = "route_stop_all";
pub const ROUTE_SUSPEND: &str = "route_suspend";
pub const ROUTE_SUSPEND_FAILED: &str = "route_suspend_failed";
pub const ROUTE_RESUME: &str = "route_resume";
pub const ROUTE_REMOVE_OK: &str = "route_remove_ok";
pub const ROUTE_REMOVE_FAILED: &str = "route_remove_failed";
pub const ROUTE_POLICY_TRIGGERED: &str = "route_policy_triggered";
pub const ROUTE_RESTART_SCHEDULED: &str = "route_restart_scheduled";
pub const ROUTE_RESTART_OK: &str = "route_restart_ok";
pub const ROUTE_RESTART_FAILED: &str = "route_restart_failed";
pub const ROUTE_RESTART_EXHAUSTED: &str = "route_restart_exhausted";

// Graceful shutdown events.
pub const SHUTDOWN_BEGIN: &str = "shutdown_begin";
pub const SHUTDOWN_ROUTE_DEFERRED: &str = "shutdown_route_deferred";
pub const SHUTDOWN_COMPLETE: &str = "shutdown_complete";
pub const SHUTDOWN_TIMEOUT: &str = "shutdown_timeout";
pub const SHUTDOWN_INFLIGHT: &str = "shutdown_inflight";
pub const SHUTDOWN_CONSUMER_FAILED: &str = "shutdown_consumer_failed";

// Context events.
pub const CONTEXT_START_OK: &str = "context_start_ok";
pub const CONTEXT_START_FAILED: &str = "context_start_failed";
pub const CONTEXT_STOP_OK: &str = "context_stop_ok";
pub const CONTEXT_SHUTDOWN: &str = "context_shutdown";

// Built-in component events.
pub const DIRECT_DISPATCH: &str = "direct_dispatch";
pub const QUEUE_PROCESS_FAILED: &str = "queue_process_failed";
pub const QUEUE_PROCESS_ABANDONED: &str = "queue_process_abandoned";
pub const LOG_EXCHANGE: &str = "log_exchange";
pub const POLL_FAILED: &str = "poll_failed";
pub const POLL_BACKOFF_SKIP: &str = "poll_backoff_skip";
pub const POLL_REPEAT_LIMIT: &str = "poll_repeat_limit";

// Runtime events.
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_WORKER_JOIN_FAILED: &str = "runtime_worker_join_failed";
