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

//! Built-in components registered by `RouteContext::with_default_components`.

pub mod direct;
pub mod log;
pub mod queue;
pub mod scheduler;

pub use direct::DirectComponent;
pub use log::LogComponent;
pub use queue::QueueComponent;
pub use scheduler::SchedulerComponent;
