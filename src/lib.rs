// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Esix - A recursive Edge Side Includes (ESI) resolving reverse proxy library
//!
//! Esix sits in front of an HTTP origin, fetches the requested document,
//! discovers embedded `<esi:include>` directives, recursively and
//! concurrently fetches the referenced fragments (which may themselves
//! contain further includes), and streams the assembled document back to
//! the client.
//!
//! # Core Principles
//!
//! - **Concurrency**: every include in a document is fetched on its own
//!   task; nested includes fan out again per recursion level.
//! - **Caching**: a pluggable [`Cache`] is consulted before every include
//!   fetch and populated after every live fetch.
//! - **Extensibility**: before/after hooks around every include fetch,
//!   plus pluggable backend [`Resolver`]s.
//! - **Pass-through**: document content outside include tags is relayed
//!   byte-for-byte; Esix is not a template engine.
//!
//! # Custom Hooks
//!
//! You can observe or mutate every include resolution by implementing the
//! [`BeforeFetchHook`] and/or [`AfterFetchHook`] traits:
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use esix::{BeforeFetchHook, IncludeDirective};
//!
//! #[derive(Debug)]
//! struct CanonicalHostHook;
//!
//! #[async_trait]
//! impl BeforeFetchHook for CanonicalHostHook {
//!     fn name(&self) -> &str {
//!         "canonical_host"
//!     }
//!
//!     async fn before_fetch(&self, directive: &mut IncludeDirective) {
//!         if let Some(src) = directive.src.as_mut() {
//!             *src = src.replace("http://internal/", "http://origin.local/");
//!         }
//!     }
//! }
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use esix::{Esix, StaticResolver};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let proxy = Esix::loader()
//!     .with_default_resolver(StaticResolver::new("http://origin.local:8080"))
//!     .build()
//!     .await?;
//!
//! proxy.start().await?;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod config;
pub mod core;
pub mod esi;
pub mod engine;
pub mod render;
pub mod cache;
pub mod resolver;
pub mod hooks;
pub mod loader;
pub mod logging;
pub mod server;

// Re-export key types at the crate root for convenience
pub use config::{ConfigProvider, ConfigProviderExt, ConfigError};
pub use loader::{Esix, EsixLoader, LoaderError};
pub use core::{
    IncludeDirective, Node, NodeKind,
    ProxyRequest, ProxyResponse, ProxyError, RequestContext,
};
pub use cache::{Cache, MemoryCache};
pub use resolver::{Resolver, StaticResolver, HealthCheck, AlwaysHealthy};
pub use hooks::{
    BeforeFetchHook, AfterFetchHook, HookFactory,
    TraceHook, RewriteHook, RewriteHookConfig,
};
pub use engine::EsiEngine;
pub use render::{render, render_to_string};
pub use server::{ProxyServer, ServerConfig};
