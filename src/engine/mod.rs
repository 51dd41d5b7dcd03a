// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The fetch-and-resolve engine.
//!
//! Given the include directives of a document, the engine fans out one
//! task per directive, consults the cache before every fetch, recursively
//! parses and resolves fetched fragments and attaches each resolved
//! sub-tree back onto the document tree.  Resolution is depth-first in
//! blocking order but breadth-concurrent within each recursion level:
//! sibling fetches race, a nested batch must drain before its parent task
//! completes.
//!
//! There is no bound on fan-out width or recursion depth – both are driven
//! entirely by the content being resolved.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tokio::task::JoinSet;
use tokio::time::timeout;

use crate::cache::Cache;
use crate::config::Config;
use crate::core::{
    append_forwarded_for, sanitize_response_headers, strip_hop_headers, IncludeDirective, Node,
    ProxyError, ProxyRequest, ProxyResponse, RequestContext,
};
use crate::esi::{build_tree, tokenize};
use crate::hooks::{AfterFetchHook, BeforeFetchHook};
use crate::logging::log_warning;
use crate::render::render_to_string;
use crate::resolver::Resolver;

/// Upstream fetch timeout applied when `proxy.timeout` is not configured.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Synthetic status marking a directive served from cache.
const STATUS_NOT_MODIFIED: u16 = 304;

/// Core resolution pipeline, shared read-only by all request tasks.
#[derive(Debug)]
pub struct EsiEngine {
    /// Configuration for the proxy
    pub config: Arc<Config>,
    /// HTTP client for making outbound requests
    client: reqwest::Client,
    /// Maps inbound requests to the origin base URL
    default_resolver: Arc<dyn Resolver>,
    /// Named alternates, an extension point for per-include backends
    named_resolvers: HashMap<String, Arc<dyn Resolver>>,
    /// Invoked in order before every include fetch
    before_hooks: Vec<Arc<dyn BeforeFetchHook>>,
    /// Invoked in order after every include fetch
    after_hooks: Vec<Arc<dyn AfterFetchHook>>,
    /// Consulted before and populated after every include fetch
    cache: Option<Arc<dyn Cache>>,
}

impl EsiEngine {
    /// Create a new engine with the given configuration and collaborators.
    pub fn new(
        config: Arc<Config>,
        default_resolver: Arc<dyn Resolver>,
        named_resolvers: HashMap<String, Arc<dyn Resolver>>,
        before_hooks: Vec<Arc<dyn BeforeFetchHook>>,
        after_hooks: Vec<Arc<dyn AfterFetchHook>>,
        cache: Option<Arc<dyn Cache>>,
    ) -> Result<Self, ProxyError> {
        let timeout_secs: u64 = config.get_or_default("proxy.timeout", DEFAULT_TIMEOUT_SECS)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(ProxyError::ClientError)?;

        Ok(Self {
            config,
            client,
            default_resolver,
            named_resolvers,
            before_hooks,
            after_hooks,
            cache,
        })
    }

    /// Look up a named alternate resolver.
    pub fn alternate_resolver(&self, name: &str) -> Option<&Arc<dyn Resolver>> {
        self.named_resolvers.get(name)
    }

    /// Drive one inbound request through fetch → parse → resolve → render.
    pub async fn process_request(
        self: &Arc<Self>,
        mut request: ProxyRequest,
    ) -> Result<ProxyResponse, ProxyError> {
        let overall_start = Instant::now();

        /* ---------- sanitise inbound ---------- */
        strip_hop_headers(&mut request.headers);
        if let Some(client_ip) = &request.client_ip {
            append_forwarded_for(&mut request.headers, client_ip);
        }

        /* ---------- top-level document fetch ---------- */
        if !self.default_resolver.healthy() {
            return Err(ProxyError::ResolverError(
                "default resolver reports an unhealthy backend".to_string(),
            ));
        }

        let mut url = format!("{}{}", self.default_resolver.resolve(), request.path);
        if let Some(query) = &request.query {
            url.push('?');
            url.push_str(query);
        }

        let timeout_dur =
            Duration::from_secs(self.config.get_or_default("proxy.timeout", DEFAULT_TIMEOUT_SECS)?);

        let upstream_start = Instant::now();
        let response = timeout(
            timeout_dur,
            self.client
                .request(request.method.clone(), &url)
                .headers(request.headers.clone())
                .send(),
        )
        .await
        .map_err(|_| ProxyError::Timeout(timeout_dur))?
        .map_err(ProxyError::ClientError)?;

        let status = response.status().as_u16();
        let mut headers = response.headers().clone();
        let document = response.text().await.map_err(ProxyError::ClientError)?;
        log::debug!(
            "[Engine] {:.2}s document loaded from {url}",
            upstream_start.elapsed().as_secs_f64()
        );

        /* ---------- parse ---------- */
        let parse_start = Instant::now();
        let (mut root, directives) = build_tree(tokenize(&document));
        log::debug!(
            "[Engine] {:.2}s document parsed, {} include(s) found",
            parse_start.elapsed().as_secs_f64(),
            directives.len()
        );

        /* ---------- resolve includes ---------- */
        let context = RequestContext::new(request.headers.clone(), request.client_ip.clone());
        let resolve_start = Instant::now();
        self.resolve_batch(&mut root, directives, context).await;
        log::debug!(
            "[Engine] {:.2}s includes resolved",
            resolve_start.elapsed().as_secs_f64()
        );

        /* ---------- render ---------- */
        sanitize_response_headers(&mut headers);
        let body = render_to_string(&root);

        log::debug!(
            "[Engine] {} {} -> {} | total={:?}",
            request.method,
            request.path,
            status,
            overall_start.elapsed()
        );

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }

    /// Resolve a batch of directives belonging to one document or fragment.
    ///
    /// Spawns one task per directive with a resolvable URL and blocks until
    /// every spawned task has reported completion – a fan-out/fan-in
    /// barrier whose width is the batch size.  No directive's failure
    /// aborts the batch.  Each resolved fragment is attached as an
    /// additional child of its directive's node.
    pub fn resolve_batch<'a>(
        self: &'a Arc<Self>,
        root: &'a mut Node,
        directives: Vec<IncludeDirective>,
        context: Arc<RequestContext>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let mut tasks: JoinSet<(Vec<usize>, Option<Node>)> = JoinSet::new();

            for mut directive in directives {
                if let Some(node) = root.node(&directive.path) {
                    directive.src = node.attribute("src").map(str::to_string);
                    // Malformed ttl values default to zero
                    directive.ttl = node
                        .attribute("ttl")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }

                // Directives without a src are skipped: no fetch, no error
                if directive.src.is_none() {
                    continue;
                }

                let engine = Arc::clone(self);
                let context = Arc::clone(&context);
                tasks.spawn(async move {
                    let path = directive.path.clone();
                    let fragment = engine.resolve_one(&mut directive, &context).await;
                    (path, fragment)
                });
            }

            // Fan-in barrier: exactly one completion per spawned task,
            // success or failure alike.
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok((path, Some(fragment))) => {
                        if let Some(node) = root.node_mut(&path) {
                            // Observed placement: the fragment is appended
                            // after the include node's own children rather
                            // than replacing the node.
                            node.children.push(fragment);
                        }
                    }
                    Ok((_, None)) => {}
                    Err(e) => log::error!("[Engine] include task panicked: {e}"),
                }
            }
        })
    }

    /// Resolve a single directive: hooks, cache lookup or live fetch, then
    /// recursive resolution of the fetched fragment's own includes.
    ///
    /// Returns the fully resolved fragment sub-tree, or `None` when no
    /// body could be obtained.  Never propagates an error upward – the
    /// batch barrier relies on every task completing.
    async fn resolve_one(
        self: &Arc<Self>,
        directive: &mut IncludeDirective,
        context: &Arc<RequestContext>,
    ) -> Option<Node> {
        let start = Instant::now();

        for hook in &self.before_hooks {
            hook.before_fetch(directive).await;
        }

        // Hooks may have rewritten or cleared the target
        let url = directive.src.clone()?;

        let mut from_cache = false;
        if let Some(cache) = &self.cache {
            if let Some(body) = cache.get(&url).await {
                directive.body = Some(body);
                directive.status = Some(STATUS_NOT_MODIFIED);
                from_cache = true;
            }
        }

        if !from_cache {
            match self
                .client
                .get(&url)
                .headers(context.headers.clone())
                .send()
                .await
            {
                Ok(response) => {
                    directive.status = Some(response.status().as_u16());
                    match response.text().await {
                        Ok(body) => {
                            if let Some(cache) = &self.cache {
                                cache.set(&url, body.clone(), directive.ttl).await;
                            }
                            directive.body = Some(body);
                        }
                        Err(e) => {
                            log_warning("Engine", format!("include body read failed for {url}: {e}"));
                        }
                    }
                }
                Err(e) => {
                    log_warning("Engine", format!("include fetch failed for {url}: {e}"));
                }
            }
        }

        for hook in &self.after_hooks {
            hook.after_fetch(directive).await;
        }

        log::debug!(
            "[Engine] {:.2}s elapsed with response length: {} {}",
            start.elapsed().as_secs_f64(),
            directive.body.as_ref().map_or(0, |b| b.len()),
            url
        );

        let body = directive.body.as_deref()?;
        let (mut fragment, nested) = build_tree(tokenize(body));

        // Depth-first in blocking order: the nested batch must drain
        // before this task reports its own completion upward.
        self.resolve_batch(&mut fragment, nested, Arc::clone(context))
            .await;

        Some(fragment)
    }
}
