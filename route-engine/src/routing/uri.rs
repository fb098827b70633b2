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

//! Endpoint URI normalization and sanitizing.
//!
//! Two spellings of the same endpoint (`queue:orders?size=10&block=true` and
//! `queue://orders?block=true&size=10`) normalize to one canonical string, which
//! is what registries and caches key on.

use crate::error::EngineError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const MASK: &str = "xxxxxx";
const SECRET_PARAMETERS: [&str; 7] = [
    "password",
    "passphrase",
    "secret",
    "secretkey",
    "accesstoken",
    "authorizationtoken",
    "apikey",
];

/// A parsed endpoint URI in canonical `scheme://path?a=1&b=2` form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EndpointUri {
    normalized: String,
    scheme: String,
    path: String,
    parameters: Vec<(String, String)>,
}

impl EndpointUri {
    pub fn parse(uri: &str) -> Result<Self, EngineError> {
        let trimmed = uri.trim();
        let Some((scheme, remainder)) = trimmed.split_once(':') else {
            return Err(EngineError::resolve_failed(uri, "missing scheme"));
        };
        if scheme.is_empty() {
            return Err(EngineError::resolve_failed(uri, "empty scheme"));
        }
        if !scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(EngineError::resolve_failed(
                uri,
                format!("invalid characters in scheme '{scheme}'"),
            ));
        }
        let scheme = scheme.to_ascii_lowercase();

        let remainder = remainder.strip_prefix("//").unwrap_or(remainder);
        let (path, query) = match remainder.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (remainder, None),
        };

        let mut parameters = Vec::new();
        if let Some(query) = query {
            for pair in query.split('&').filter(|pair| !pair.is_empty()) {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                if name.is_empty() {
                    return Err(EngineError::resolve_failed(
                        uri,
                        format!("empty parameter name in '{pair}'"),
                    ));
                }
                parameters.push((name.to_string(), value.to_string()));
            }
        }
        // stable, so repeated keys keep their relative order
        parameters.sort_by(|left, right| left.0.cmp(&right.0));

        let normalized = render(&scheme, path, &parameters);
        Ok(Self {
            normalized,
            scheme,
            path: path.to_string(),
            parameters,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Parses a typed option, failing resolution when the value does not parse.
    pub fn parameter_as<T: FromStr>(&self, name: &str) -> Result<Option<T>, EngineError> {
        match self.parameter(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                EngineError::resolve_failed(
                    self.sanitized(),
                    format!("invalid value '{raw}' for parameter '{name}'"),
                )
            }),
        }
    }

    /// Parameter names not present in `known`, in canonical order.
    pub(crate) fn unknown_parameters(&self, known: &[&str]) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .parameters
            .iter()
            .filter(|(name, _)| !known.contains(&name.as_str()))
            .map(|(name, _)| name.clone())
            .collect();
        unknown.dedup();
        unknown
    }

    pub fn sanitized(&self) -> String {
        sanitize_uri(&self.normalized)
    }
}

impl Display for EndpointUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl FromStr for EndpointUri {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn render(scheme: &str, path: &str, parameters: &[(String, String)]) -> String {
    let mut out = format!("{scheme}://{path}");
    for (index, (name, value)) in parameters.iter().enumerate() {
        out.push(if index == 0 { '?' } else { '&' });
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Masks credentials in a URI so it can be logged.
///
/// Handles `user:password@` user-info and well known secret query options.
pub fn sanitize_uri(uri: &str) -> String {
    let (base, query) = match uri.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (uri, None),
    };

    let mut out = mask_user_info(base);
    if let Some(query) = query {
        out.push('?');
        let masked: Vec<String> = query
            .split('&')
            .map(|pair| match pair.split_once('=') {
                Some((name, _)) if is_secret(name) => format!("{name}={MASK}"),
                _ => pair.to_string(),
            })
            .collect();
        out.push_str(&masked.join("&"));
    }
    out
}

fn is_secret(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    SECRET_PARAMETERS.contains(&lowered.as_str())
}

fn mask_user_info(base: &str) -> String {
    let Some((scheme, rest)) = base.split_once("://") else {
        return base.to_string();
    };
    let Some((user_info, host)) = rest.split_once('@') else {
        return base.to_string();
    };
    match user_info.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:{MASK}@{host}"),
        None => base.to_string(),
    }
}
