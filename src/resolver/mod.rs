// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Backend resolution.
//!
//! A [`Resolver`] maps an inbound request to a physical origin base URL;
//! the front door concatenates the resolved base with the request path.
//! The configuration carries one default resolver plus a set of named
//! alternates as an extension point for per-include backend selection.

use std::fmt;
use std::sync::Arc;

/// Health probe attached to a resolver entry.
pub trait HealthCheck: fmt::Debug + Send + Sync {
    fn healthy(&self) -> bool;
}

/// Default health check that always reports healthy.
#[derive(Debug, Default)]
pub struct AlwaysHealthy;

impl HealthCheck for AlwaysHealthy {
    fn healthy(&self) -> bool {
        true
    }
}

/// Maps a logical backend to a physical origin base URL.
pub trait Resolver: fmt::Debug + Send + Sync {
    /// The origin base URL requests are forwarded to.
    fn resolve(&self) -> String;

    /// Whether the backend is currently usable.
    fn healthy(&self) -> bool {
        true
    }
}

/// Resolver backed by a fixed base URI.
#[derive(Debug)]
pub struct StaticResolver {
    base_uri: String,
    health: Arc<dyn HealthCheck>,
}

impl StaticResolver {
    pub fn new(base_uri: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            health: Arc::new(AlwaysHealthy),
        }
    }

    pub fn with_health_check(mut self, health: Arc<dyn HealthCheck>) -> Self {
        self.health = health;
        self
    }
}

impl Resolver for StaticResolver {
    fn resolve(&self) -> String {
        self.base_uri.clone()
    }

    fn healthy(&self) -> bool {
        self.health.healthy()
    }
}
