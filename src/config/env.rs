// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment variable-based configuration provider implementation.
//!
//! A key like `proxy.origin` maps to the variable `ESIX_PROXY__ORIGIN`:
//! the configured prefix, then the key upper-cased with `.` replaced by
//! `__`.  Values are parsed as JSON scalars where possible and fall back
//! to plain strings, so `ESIX_SERVER__PORT=8080` yields a number while
//! `ESIX_PROXY__ORIGIN=http://origin` yields a string.

use std::collections::HashMap;
use std::env;

use serde_json::Value;

use super::{ConfigError, ConfigProvider};

const DEFAULT_PREFIX: &str = "ESIX_";

/// Environment variable configuration provider.
///
/// The environment is snapshotted at construction time; later changes to
/// the process environment are not observed.
#[derive(Debug)]
pub struct EnvConfigProvider {
    prefix: String,
    values: HashMap<String, Value>,
}

impl EnvConfigProvider {
    /// Create a new provider with a custom variable prefix.
    pub fn new(prefix: &str) -> Self {
        let values = env::vars()
            .filter_map(|(name, raw)| {
                let suffix = name.strip_prefix(prefix)?;
                let key = suffix.to_lowercase().replace("__", ".");
                Some((key, Self::parse_value(&raw)))
            })
            .collect();

        Self {
            prefix: prefix.to_string(),
            values,
        }
    }

    /// The variable prefix this provider matches on.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Scalars that parse as JSON become typed values; anything else is a string.
    fn parse_value(raw: &str) -> Value {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn provider_name(&self) -> &str {
        "env"
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }
}
