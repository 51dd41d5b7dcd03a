// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests {
    use crate::config::{Config, ConfigError, ConfigProvider, EnvConfigProvider, FileConfigProvider};
    use serde_json::{json, Value};
    use serial_test::serial;
    use std::io::Write;

    #[derive(Debug)]
    struct MapConfigProvider {
        name: String,
        values: serde_json::Map<String, Value>,
    }

    impl MapConfigProvider {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                values: serde_json::Map::new(),
            }
        }

        fn with(mut self, key: &str, value: Value) -> Self {
            self.values.insert(key.to_string(), value);
            self
        }
    }

    impl ConfigProvider for MapConfigProvider {
        fn has(&self, key: &str) -> bool {
            self.values.contains_key(key)
        }

        fn provider_name(&self) -> &str {
            &self.name
        }

        fn get_raw(&self, key: &str) -> Result<Option<Value>, ConfigError> {
            Ok(self.values.get(key).cloned())
        }
    }

    #[test]
    fn test_later_provider_wins() {
        let base = MapConfigProvider::new("base")
            .with("server.port", json!(8080))
            .with("proxy.origin", json!("http://origin.local"));
        let overlay = MapConfigProvider::new("overlay").with("server.port", json!(9000));

        let config = Config::builder()
            .with_provider(base)
            .with_provider(overlay)
            .build();

        assert_eq!(config.get::<u16>("server.port").unwrap(), Some(9000));
        assert_eq!(
            config.get::<String>("proxy.origin").unwrap().as_deref(),
            Some("http://origin.local")
        );
    }

    #[test]
    fn test_get_or_default() {
        let config = Config::builder()
            .with_provider(MapConfigProvider::new("base").with("proxy.timeout", json!(5)))
            .build();

        assert_eq!(config.get_or_default("proxy.timeout", 10u64).unwrap(), 5);
        assert_eq!(config.get_or_default("proxy.missing", 10u64).unwrap(), 10);
    }

    #[test]
    fn test_type_mismatch_is_parse_error() {
        let config = Config::builder()
            .with_provider(MapConfigProvider::new("base").with("server.port", json!("not a port")))
            .build();

        assert!(matches!(
            config.get::<u16>("server.port"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_file_provider_toml_nested_lookup() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nhost = \"0.0.0.0\"\nport = 8080\n\n[proxy]\norigin = \"http://origin.local\"\ntimeout = 10\n\n[proxy.cache]\nenabled = true\ndefault_ttl = 60"
        )
        .unwrap();

        let provider = FileConfigProvider::new(file.path().to_str().unwrap()).unwrap();

        assert!(provider.has("server.host"));
        assert!(provider.has("proxy.cache.enabled"));
        assert!(!provider.has("proxy.cache.backend"));
        assert_eq!(
            provider.get_raw("proxy.origin").unwrap(),
            Some(json!("http://origin.local"))
        );
        assert_eq!(
            provider.get_raw("proxy.cache.default_ttl").unwrap(),
            Some(json!(60))
        );
    }

    #[test]
    fn test_file_provider_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"proxy": {{"origins": {{"assets": "http://assets.local"}}}}}}"#
        )
        .unwrap();

        let provider = FileConfigProvider::new(file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            provider.get_raw("proxy.origins.assets").unwrap(),
            Some(json!("http://assets.local"))
        );
    }

    #[test]
    fn test_file_provider_rejects_unknown_extension() {
        assert!(FileConfigProvider::new("/tmp/esix-config.ini").is_err());
    }

    #[test]
    #[serial]
    fn test_env_provider_maps_and_types_values() {
        unsafe {
            std::env::set_var("ESIX_SERVER__PORT", "9090");
            std::env::set_var("ESIX_PROXY__ORIGIN", "http://origin.local");
        }

        let provider = EnvConfigProvider::default();

        assert_eq!(provider.get_raw("server.port").unwrap(), Some(json!(9090)));
        assert_eq!(
            provider.get_raw("proxy.origin").unwrap(),
            Some(json!("http://origin.local"))
        );
        assert!(!provider.has("proxy.timeout"));

        unsafe {
            std::env::remove_var("ESIX_SERVER__PORT");
            std::env::remove_var("ESIX_PROXY__ORIGIN");
        }
    }

    #[test]
    #[serial]
    fn test_env_provider_custom_prefix() {
        unsafe {
            std::env::set_var("MYAPP_PROXY__TIMEOUT", "30");
        }

        let provider = EnvConfigProvider::new("MYAPP_");
        assert_eq!(provider.prefix(), "MYAPP_");
        assert_eq!(provider.get_raw("proxy.timeout").unwrap(), Some(json!(30)));

        unsafe {
            std::env::remove_var("MYAPP_PROXY__TIMEOUT");
        }
    }
}
