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

//! Scheme to component lookup.

use crate::endpoint::Component;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ComponentRegistry {
    components: RwLock<HashMap<String, Arc<dyn Component>>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `component` for `scheme`, returning the one it replaced.
    pub fn add(&self, scheme: &str, component: Arc<dyn Component>) -> Option<Arc<dyn Component>> {
        self.components
            .write()
            .insert(scheme.to_ascii_lowercase(), component)
    }

    pub fn get(&self, scheme: &str) -> Option<Arc<dyn Component>> {
        self.components
            .read()
            .get(&scheme.to_ascii_lowercase())
            .cloned()
    }

    pub fn remove(&self, scheme: &str) -> Option<Arc<dyn Component>> {
        self.components.write().remove(&scheme.to_ascii_lowercase())
    }

    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.components.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }
}
