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

//! Immutable normalized-URI key used for registry and pool map identity.

use crate::routing::uri::EndpointUri;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Cheaply clonable canonical URI string.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub struct EndpointKey(Arc<str>);

impl EndpointKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&EndpointUri> for EndpointKey {
    fn from(uri: &EndpointUri) -> Self {
        Self(Arc::from(uri.as_str()))
    }
}

impl From<EndpointUri> for EndpointKey {
    fn from(uri: EndpointUri) -> Self {
        Self::from(&uri)
    }
}

impl Display for EndpointKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
