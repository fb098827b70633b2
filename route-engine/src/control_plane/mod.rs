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

//! Control-plane layer.
//!
//! Owns component and endpoint registration, route definitions and their
//! lifecycle, route policies and graceful shutdown. Every route transition is
//! serialized per route and fires its policy callbacks exactly once.

pub(crate) mod component_registry;
pub(crate) mod endpoint_registry;
pub(crate) mod route;
pub(crate) mod route_controller;
pub(crate) mod route_policy;
pub(crate) mod route_table;
pub(crate) mod shutdown_strategy;
