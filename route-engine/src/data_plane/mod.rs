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

//! Data-plane layer.
//!
//! Producer and polling-consumer caches built on one capacity-bounded service
//! pool, endpoint utilization statistics, inflight exchange tracking and the
//! scheduled polling consumer.

pub(crate) mod consumer_cache;
pub(crate) mod inflight;
pub(crate) mod producer_cache;
pub(crate) mod scheduled_poll;
pub(crate) mod service_pool;
pub(crate) mod utilization;
