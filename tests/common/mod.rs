// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Common test utilities and helpers for Esix tests.

use esix::config::{ConfigError, ConfigProvider};
use esix::ProxyRequest;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;

/// Test configuration provider for consistent test setups
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct TestConfigProvider {
    values: HashMap<String, Value>,
    name: String,
}

#[allow(dead_code)]
impl TestConfigProvider {
    /// Create a new test config provider with default values
    pub fn new(name: &str) -> Self {
        let mut values = HashMap::new();

        // Default server configuration
        values.insert(
            "server.host".to_string(),
            Value::String("127.0.0.1".to_string()),
        );
        values.insert("server.port".to_string(), Value::Number(8080.into()));

        // Default proxy configuration
        values.insert("proxy.timeout".to_string(), Value::Number(30.into()));

        Self {
            values,
            name: name.to_string(),
        }
    }

    /// Add a configuration value
    pub fn with_value<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }
}

impl TestConfigProvider {
    /// Get a nested value from the configuration by a dot-separated key path.
    fn get_nested_value(&self, key_path: &str) -> Option<Value> {
        // First check if we have the exact key
        if let Some(value) = self.values.get(key_path) {
            return Some(value.clone());
        }

        // Try to build nested object from individual keys
        let prefix = format!("{key_path}.");
        let mut nested_obj = serde_json::Map::new();

        for (key, value) in &self.values {
            if key.starts_with(&prefix) {
                let suffix = &key[prefix.len()..];
                if !suffix.contains('.') {
                    // This is a direct child
                    nested_obj.insert(suffix.to_string(), value.clone());
                }
            }
        }

        if !nested_obj.is_empty() {
            Some(Value::Object(nested_obj))
        } else {
            None
        }
    }
}

impl ConfigProvider for TestConfigProvider {
    fn has(&self, key: &str) -> bool {
        self.get_nested_value(key).is_some()
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
        Ok(self.get_nested_value(key))
    }
}

/// Create a test request with common defaults
#[allow(dead_code)]
pub fn create_test_request(
    path: &str,
    headers: Vec<(&str, &str)>,
    client_ip: Option<&str>,
) -> ProxyRequest {
    let mut header_map = HeaderMap::new();
    for (name, value) in headers {
        header_map.append(
            reqwest::header::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            reqwest::header::HeaderValue::from_str(value).unwrap(),
        );
    }

    ProxyRequest {
        method: reqwest::Method::GET,
        path: path.to_string(),
        query: None,
        headers: header_map,
        client_ip: client_ip.map(|ip| ip.to_string()),
    }
}

/// Initialize test logging (call once per test module)
#[allow(dead_code)]
pub fn init_test_logging() {
    // Don't initialize logging in tests - let the library handle it
    // This prevents conflicts with the library's logging initialization
}
