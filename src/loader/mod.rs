// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level entry-point – "turn the key and go".
//!
//! The [`EsixLoader`] consumes configuration, wires up resolvers, hooks
//! and the cache, and returns a single [`Esix`] handle ready to be
//! started.


use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::{Cache, MemoryCache};
use crate::config::{Config, ConfigError, ConfigProvider, EnvConfigProvider, FileConfigProvider};
use crate::core::ProxyError;
use crate::engine::EsiEngine;
use crate::hooks::{AfterFetchHook, BeforeFetchHook, HookConfig, HookFactory};
use crate::logging::{log_error, log_info};
use crate::resolver::{Resolver, StaticResolver};
use crate::server::{ProxyServer, ServerConfig};

/// Errors that can occur during Esix initialization.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(#[from] ConfigError),

    /// Proxy error
    #[error("proxy error: {0}")]
    ProxyError(#[from] ProxyError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Builder for initializing and configuring Esix.
#[derive(Debug, Default)]
pub struct EsixLoader {
    config: Option<Config>,
    config_file_path: Option<String>,
    use_env_vars: bool,
    env_prefix: Option<String>,
    extra_providers: Vec<Arc<dyn ConfigProvider>>,
    default_resolver: Option<Arc<dyn Resolver>>,
    named_resolvers: HashMap<String, Arc<dyn Resolver>>,
    before_hooks: Vec<Arc<dyn BeforeFetchHook>>,
    after_hooks: Vec<Arc<dyn AfterFetchHook>>,
    cache: Option<Arc<dyn Cache>>,
}

impl EsixLoader {
    /// Create a new Esix loader with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a pre-built configuration; file/env settings are then ignored.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a configuration file to load.
    pub fn with_config_file(mut self, file_path: &str) -> Self {
        self.config_file_path = Some(file_path.to_string());
        self
    }

    /// Enable environment variable configuration.
    pub fn with_env_vars(mut self) -> Self {
        self.use_env_vars = true;
        self
    }

    /// Set a custom prefix for environment variables (default is "ESIX_").
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self.use_env_vars = true;
        self
    }

    /// Add a custom configuration provider; it overrides file and env.
    pub fn with_provider<P: ConfigProvider + 'static>(mut self, provider: P) -> Self {
        self.extra_providers.push(Arc::new(provider));
        self
    }

    /// Set the default resolver mapping requests to the origin.
    pub fn with_default_resolver<R: Resolver + 'static>(mut self, resolver: R) -> Self {
        self.default_resolver = Some(Arc::new(resolver));
        self
    }

    /// Add a named alternate resolver.
    pub fn with_named_resolver<R: Resolver + 'static>(mut self, name: &str, resolver: R) -> Self {
        self.named_resolvers
            .insert(name.to_string(), Arc::new(resolver));
        self
    }

    /// Add a hook invoked before every include fetch.
    pub fn with_before_hook<H: BeforeFetchHook + 'static>(mut self, hook: H) -> Self {
        self.before_hooks.push(Arc::new(hook));
        self
    }

    /// Add a hook invoked after every include fetch.
    pub fn with_after_hook<H: AfterFetchHook + 'static>(mut self, hook: H) -> Self {
        self.after_hooks.push(Arc::new(hook));
        self
    }

    /// Use the given cache for include fetches.
    pub fn with_cache<C: Cache + 'static>(mut self, cache: C) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Build and initialize Esix.
    pub async fn build(self) -> Result<Esix, LoaderError> {
        // Build the configuration: file first, env second, custom
        // providers last, so later sources override earlier ones.
        let config = if let Some(config) = self.config {
            config
        } else {
            let mut builder = Config::builder();

            if let Some(file_path) = &self.config_file_path {
                builder = builder.with_provider(FileConfigProvider::new(file_path)?);
            }

            if self.use_env_vars {
                let env_provider = match &self.env_prefix {
                    Some(prefix) => EnvConfigProvider::new(prefix),
                    None => EnvConfigProvider::default(),
                };
                builder = builder.with_provider(env_provider);
            }

            for provider in self.extra_providers {
                builder = builder.with_shared_provider(provider);
            }

            builder.build()
        };

        let config_arc = Arc::new(config);

        crate::logging::init(None);
        log_info("Startup", "Esix starting up");

        // Default resolver: programmatic wins, configuration second
        let default_resolver = match self.default_resolver {
            Some(resolver) => resolver,
            None => match config_arc.get::<String>("proxy.origin")? {
                Some(origin) => Arc::new(StaticResolver::new(origin)) as Arc<dyn Resolver>,
                None => {
                    return Err(log_error(
                        "Startup",
                        LoaderError::Other(
                            "no default resolver configured; set proxy.origin or call with_default_resolver()".into(),
                        ),
                    ));
                }
            },
        };

        // Named alternates from configuration, overlaid by programmatic ones
        let mut named_resolvers: HashMap<String, Arc<dyn Resolver>> = config_arc
            .get::<HashMap<String, String>>("proxy.origins")?
            .unwrap_or_default()
            .into_iter()
            .map(|(name, uri)| (name, Arc::new(StaticResolver::new(uri)) as Arc<dyn Resolver>))
            .collect();
        named_resolvers.extend(self.named_resolvers);

        // Hooks from configuration run ahead of programmatic ones
        let mut before_hooks = Vec::new();
        for hook_config in config_arc
            .get::<Vec<HookConfig>>("proxy.before_hooks")?
            .unwrap_or_default()
        {
            before_hooks.push(HookFactory::create_before_hook(
                &hook_config.hook_type,
                hook_config.config.clone(),
            )?);
            log_info("Startup", format!("Added before-hook: {}", hook_config.hook_type));
        }
        before_hooks.extend(self.before_hooks);

        let mut after_hooks = Vec::new();
        for hook_config in config_arc
            .get::<Vec<HookConfig>>("proxy.after_hooks")?
            .unwrap_or_default()
        {
            after_hooks.push(HookFactory::create_after_hook(
                &hook_config.hook_type,
                hook_config.config.clone(),
            )?);
            log_info("Startup", format!("Added after-hook: {}", hook_config.hook_type));
        }
        after_hooks.extend(self.after_hooks);

        // Cache: programmatic wins, otherwise configuration may enable
        // the in-memory implementation
        let cache = match self.cache {
            Some(cache) => Some(cache),
            None => {
                if config_arc.get_or_default("proxy.cache.enabled", false)? {
                    let default_ttl: u64 =
                        config_arc.get_or_default("proxy.cache.default_ttl", 0)?;
                    let cache: Arc<dyn Cache> = if default_ttl > 0 {
                        Arc::new(MemoryCache::with_default_ttl(Duration::from_secs(default_ttl)))
                    } else {
                        Arc::new(MemoryCache::new())
                    };
                    Some(cache)
                } else {
                    None
                }
            }
        };

        let engine = EsiEngine::new(
            config_arc.clone(),
            default_resolver,
            named_resolvers,
            before_hooks,
            after_hooks,
            cache,
        )?;

        // Get server configuration
        let server_config: ServerConfig =
            config_arc.get_or_default("server", ServerConfig::default())?;

        let proxy_server = ProxyServer::new(server_config, Arc::new(engine));

        Ok(Esix {
            config: config_arc,
            server: proxy_server,
        })
    }
}

/// Main Esix struct that holds the initialized proxy.
#[derive(Debug, Clone)]
pub struct Esix {
    config: Arc<Config>,
    server: ProxyServer,
}

impl Esix {
    /// Create a new loader for initializing Esix.
    pub fn loader() -> EsixLoader {
        EsixLoader::new()
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start the proxy server.
    pub async fn start(&self) -> Result<(), LoaderError> {
        self.server.start().await.map_err(LoaderError::ProxyError)
    }
}
