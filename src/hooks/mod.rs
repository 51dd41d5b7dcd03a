// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Before/after hooks around every include fetch.
//!
//! Hooks are **opt-in** – register them on the loader or reference them in
//! the `proxy.before_hooks` / `proxy.after_hooks` configuration arrays.
//! The engine invokes each list sequentially, in order, around every
//! include resolution; hooks may mutate the directive (for example to
//! rewrite its URL) but must not block indefinitely, since the batch
//! barrier depends on timely completion.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use log::Level;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::{IncludeDirective, ProxyError};

/// Observer invoked immediately before an include fetch.
#[async_trait]
pub trait BeforeFetchHook: std::fmt::Debug + Send + Sync {
    /// Get the hook name.
    fn name(&self) -> &str;

    /// Inspect or mutate the directive before its fetch.
    async fn before_fetch(&self, directive: &mut IncludeDirective);
}

/// Observer invoked immediately after an include fetch.
#[async_trait]
pub trait AfterFetchHook: std::fmt::Debug + Send + Sync {
    /// Get the hook name.
    fn name(&self) -> &str;

    /// Inspect or mutate the now-populated directive.
    async fn after_fetch(&self, directive: &mut IncludeDirective);
}

/// Constructor signature every dynamic before-hook must implement
pub type BeforeHookConstructor =
    fn(serde_json::Value) -> Result<Arc<dyn BeforeFetchHook>, ProxyError>;

/// Constructor signature every dynamic after-hook must implement
pub type AfterHookConstructor =
    fn(serde_json::Value) -> Result<Arc<dyn AfterFetchHook>, ProxyError>;

/// Global registries – `register_*_hook()` writes to them,
/// `HookFactory` reads from them.
static BEFORE_HOOK_REGISTRY: Lazy<RwLock<HashMap<String, BeforeHookConstructor>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static AFTER_HOOK_REGISTRY: Lazy<RwLock<HashMap<String, AfterHookConstructor>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Register a before-hook under a unique name so configuration can refer
/// to it.  Call this **before** you build Esix.
pub fn register_before_hook(name: &str, ctor: BeforeHookConstructor) {
    BEFORE_HOOK_REGISTRY
        .write()
        .expect("BEFORE_HOOK_REGISTRY poisoned")
        .insert(name.to_string(), ctor);
}

/// Register an after-hook under a unique name.
pub fn register_after_hook(name: &str, ctor: AfterHookConstructor) {
    AFTER_HOOK_REGISTRY
        .write()
        .expect("AFTER_HOOK_REGISTRY poisoned")
        .insert(name.to_string(), ctor);
}

fn get_registered_before_hook(name: &str) -> Option<BeforeHookConstructor> {
    BEFORE_HOOK_REGISTRY
        .read()
        .expect("BEFORE_HOOK_REGISTRY poisoned")
        .get(name)
        .copied()
}

fn get_registered_after_hook(name: &str) -> Option<AfterHookConstructor> {
    AFTER_HOOK_REGISTRY
        .read()
        .expect("AFTER_HOOK_REGISTRY poisoned")
        .get(name)
        .copied()
}

/// One hook reference in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Hook type name, built-in or registered
    #[serde(rename = "type")]
    pub hook_type: String,

    /// Hook-specific configuration
    #[serde(default)]
    pub config: serde_json::Value,
}

/// Configuration for the trace hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceHookConfig {
    /// Log level to use
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "debug".to_string()
}

impl Default for TraceHookConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// A hook that logs every include resolution on both sides of the fetch.
#[derive(Debug)]
pub struct TraceHook {
    config: TraceHookConfig,
}

impl Default for TraceHook {
    fn default() -> Self {
        Self::new(TraceHookConfig::default())
    }
}

impl TraceHook {
    /// Create a new trace hook with the given configuration.
    pub fn new(config: TraceHookConfig) -> Self {
        Self { config }
    }

    fn log(&self, message: &str) {
        let level = match self.config.log_level.to_lowercase().as_str() {
            "error" => Level::Error,
            "warn" => Level::Warn,
            "info" => Level::Info,
            "debug" => Level::Debug,
            _ => Level::Trace,
        };
        log::log!(level, "[TraceHook] {message}");
    }
}

#[async_trait]
impl BeforeFetchHook for TraceHook {
    fn name(&self) -> &str {
        "trace"
    }

    async fn before_fetch(&self, directive: &mut IncludeDirective) {
        self.log(&format!(
            ">> include {}",
            directive.src.as_deref().unwrap_or("<no src>")
        ));
    }
}

#[async_trait]
impl AfterFetchHook for TraceHook {
    fn name(&self) -> &str {
        "trace"
    }

    async fn after_fetch(&self, directive: &mut IncludeDirective) {
        self.log(&format!(
            "<< include {} -> {} ({} bytes)",
            directive.src.as_deref().unwrap_or("<no src>"),
            directive
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            directive.body.as_ref().map_or(0, |b| b.len())
        ));
    }
}

/// Configuration for the URL rewrite hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteHookConfig {
    /// The pattern to match against the include URL (regex)
    pub pattern: String,
    /// The replacement pattern
    pub replacement: String,
}

/// A before-hook that rewrites include URLs based on a regex pattern.
///
/// Useful to redirect includes authored against a logical host onto a
/// physical backend without touching the documents.
#[derive(Debug)]
pub struct RewriteHook {
    config: RewriteHookConfig,
    regex: Regex,
}

impl RewriteHook {
    /// Create a new rewrite hook with the given configuration.
    pub fn new(config: RewriteHookConfig) -> Result<Self, ProxyError> {
        let regex = Regex::new(&config.pattern).map_err(|e| {
            ProxyError::HookError(format!("invalid regex pattern '{}': {e}", config.pattern))
        })?;
        Ok(Self { config, regex })
    }
}

#[async_trait]
impl BeforeFetchHook for RewriteHook {
    fn name(&self) -> &str {
        "rewrite"
    }

    async fn before_fetch(&self, directive: &mut IncludeDirective) {
        if let Some(src) = &directive.src {
            let rewritten = self
                .regex
                .replace_all(src, &self.config.replacement)
                .to_string();
            if &rewritten != src {
                log::debug!("[RewriteHook] rewriting include {src} to {rewritten}");
                directive.src = Some(rewritten);
            }
        }
    }
}

/// Factory for creating hooks based on configuration.
#[derive(Debug)]
pub struct HookFactory;

impl HookFactory {
    /// Create a before-hook from its type name and configuration.
    pub fn create_before_hook(
        hook_type: &str,
        config: serde_json::Value,
    ) -> Result<Arc<dyn BeforeFetchHook>, ProxyError> {
        if let Some(ctor) = get_registered_before_hook(hook_type) {
            return ctor(config);
        }

        match hook_type {
            "trace" => {
                let config: TraceHookConfig = serde_json::from_value(config).map_err(|e| {
                    ProxyError::HookError(format!("invalid trace hook config: {e}"))
                })?;
                Ok(Arc::new(TraceHook::new(config)))
            }
            "rewrite" => {
                let config: RewriteHookConfig = serde_json::from_value(config).map_err(|e| {
                    ProxyError::HookError(format!("invalid rewrite hook config: {e}"))
                })?;
                Ok(Arc::new(RewriteHook::new(config)?))
            }
            _ => Err(ProxyError::HookError(format!(
                "unknown before-hook type: {hook_type}"
            ))),
        }
    }

    /// Create an after-hook from its type name and configuration.
    pub fn create_after_hook(
        hook_type: &str,
        config: serde_json::Value,
    ) -> Result<Arc<dyn AfterFetchHook>, ProxyError> {
        if let Some(ctor) = get_registered_after_hook(hook_type) {
            return ctor(config);
        }

        match hook_type {
            "trace" => {
                let config: TraceHookConfig = serde_json::from_value(config).map_err(|e| {
                    ProxyError::HookError(format!("invalid trace hook config: {e}"))
                })?;
                Ok(Arc::new(TraceHook::new(config)))
            }
            _ => Err(ProxyError::HookError(format!(
                "unknown after-hook type: {hook_type}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_rewrite_hook_rewrites_src() {
        let hook = RewriteHook::new(RewriteHookConfig {
            pattern: "^http://internal/".to_string(),
            replacement: "http://origin.local/".to_string(),
        })
        .unwrap();

        let mut directive = IncludeDirective::new(vec![0]);
        directive.src = Some("http://internal/frag".to_string());

        hook.before_fetch(&mut directive).await;

        assert_eq!(directive.src.as_deref(), Some("http://origin.local/frag"));
    }

    #[tokio::test]
    async fn test_rewrite_hook_leaves_non_matching_src() {
        let hook = RewriteHook::new(RewriteHookConfig {
            pattern: "^http://internal/".to_string(),
            replacement: "http://origin.local/".to_string(),
        })
        .unwrap();

        let mut directive = IncludeDirective::new(vec![0]);
        directive.src = Some("http://elsewhere/frag".to_string());

        hook.before_fetch(&mut directive).await;

        assert_eq!(directive.src.as_deref(), Some("http://elsewhere/frag"));
    }

    #[test]
    fn test_rewrite_hook_rejects_bad_pattern() {
        let result = RewriteHook::new(RewriteHookConfig {
            pattern: "[".to_string(),
            replacement: "".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_factory_creates_builtin_hooks() {
        assert!(HookFactory::create_before_hook("trace", json!({})).is_ok());
        assert!(HookFactory::create_after_hook("trace", json!({})).is_ok());
        assert!(HookFactory::create_before_hook(
            "rewrite",
            json!({"pattern": "a", "replacement": "b"})
        )
        .is_ok());
    }

    #[test]
    fn test_factory_rejects_unknown_hook() {
        assert!(HookFactory::create_before_hook("nope", json!({})).is_err());
        assert!(HookFactory::create_after_hook("rewrite", json!({})).is_err());
    }

    #[derive(Debug)]
    struct MarkerHook;

    #[async_trait]
    impl AfterFetchHook for MarkerHook {
        fn name(&self) -> &str {
            "marker"
        }

        async fn after_fetch(&self, directive: &mut IncludeDirective) {
            directive.body = Some("marked".to_string());
        }
    }

    #[test]
    fn test_registered_hook_takes_priority() {
        register_after_hook("marker", |_cfg| Ok(Arc::new(MarkerHook)));
        let hook = HookFactory::create_after_hook("marker", json!({})).unwrap();
        assert_eq!(hook.name(), "marker");
    }
}
