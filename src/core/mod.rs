// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core primitives – errors, the document tree, include directives and
//! header sanitisation.
//!
//! Everything that physically moves through the resolution pipeline is
//! defined in this module.  No protocol-level logic lives here; that sits
//! in `server` (IO) and `engine` (behaviour).

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH};
use thiserror::Error;

/// Errors that can occur during proxy operations.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// HTTP client error
    #[error("HTTP client error: {0}")]
    ClientError(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Timeout error
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Resolver error
    #[error("resolver error: {0}")]
    ResolverError(String),

    /// Hook error
    #[error("hook error: {0}")]
    HookError(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<crate::config::error::ConfigError> for ProxyError {
    fn from(err: crate::config::error::ConfigError) -> Self {
        ProxyError::ConfigError(err.to_string())
    }
}

/// Classification of one parsed structural unit of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic root wrapping a whole document or fragment
    Root,
    /// Verbatim document text, rendered as-is
    Text,
    /// A recognised ESI tag
    Tag,
}

/// One node of the parsed document tree.
///
/// Children are exclusively owned by their parent.  A `Text` node renders
/// its payload verbatim; every other kind renders its children only.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Literal text payload, present on `Text` nodes
    pub text: Option<String>,
    /// Ordered attribute pairs, present on `Tag` nodes
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    /// Create a synthetic root node.
    pub fn root() -> Self {
        Self {
            kind: NodeKind::Root,
            text: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a verbatim text node.
    pub fn text(payload: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text,
            text: Some(payload.into()),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a tag node with the given attribute pairs.
    pub fn tag(attributes: Vec<(String, String)>) -> Self {
        Self {
            kind: NodeKind::Tag,
            text: None,
            attributes,
            children: Vec::new(),
        }
    }

    /// Look up the value of an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Walk a child-index path down from this node.
    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let mut current = self;
        for &idx in path {
            current = current.children.get(idx)?;
        }
        Some(current)
    }

    /// Walk a child-index path down from this node, mutably.
    pub fn node_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut current = self;
        for &idx in path {
            current = current.children.get_mut(idx)?;
        }
        Some(current)
    }
}

/// One include instruction plus its resolution state.
///
/// Created by the tree builder alongside the tree, mutated exclusively by
/// the engine during resolution and discarded once the fragment has been
/// attached.
#[derive(Debug, Clone)]
pub struct IncludeDirective {
    /// Child-index path from the owning tree's root to the include node
    pub path: Vec<usize>,
    /// Fetch target, taken from the node's `src` attribute
    pub src: Option<String>,
    /// Cache lifetime in seconds, taken from the node's `ttl` attribute.
    /// Malformed or absent values default to zero.
    pub ttl: u64,
    /// Fetched response body, absent until resolved
    pub body: Option<String>,
    /// Response status code; a synthetic 304 marks a cache hit
    pub status: Option<u16>,
}

impl IncludeDirective {
    pub fn new(path: Vec<usize>) -> Self {
        Self {
            path,
            src: None,
            ttl: 0,
            body: None,
            status: None,
        }
    }
}

/// Represents an inbound HTTP request to be proxied.
///
/// Request bodies are not forwarded; the proxy serves documents and the
/// origin fetch replays only method, path, query and headers.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: reqwest::Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    /// The original client's IP address
    pub client_ip: Option<String>,
}

/// Represents the fully assembled HTTP response returned by the proxy.
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// The rendered, include-resolved document
    pub body: String,
}

/// Per-request state shared read-only by every include-fetch task.
#[derive(Debug, Default)]
pub struct RequestContext {
    /// Sanitised inbound headers, replayed verbatim on every include fetch
    pub headers: HeaderMap,
    /// The original client's IP address
    pub client_ip: Option<String>,
}

impl RequestContext {
    pub fn new(headers: HeaderMap, client_ip: Option<String>) -> Arc<Self> {
        Arc::new(Self { headers, client_ip })
    }
}

/// Hop-by-hop headers, removed on every proxied leg.
/// <http://www.w3.org/Protocols/rfc2616/rfc2616-sec13.html>
pub const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Strip hop-by-hop headers from a header map in place.
pub fn strip_hop_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// Append the connecting client's address to the `X-Forwarded-For` chain.
///
/// Prior hops are retained as a comma-separated list; multiple existing
/// header instances are folded into one.
pub fn append_forwarded_for(headers: &mut HeaderMap, client_ip: &str) {
    let prior: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    let chain = if prior.is_empty() {
        client_ip.to_string()
    } else {
        format!("{}, {}", prior.join(", "), client_ip)
    };

    if let Ok(value) = HeaderValue::from_str(&chain) {
        headers.insert("x-forwarded-for", value);
    }
}

/// Prepare origin response headers for relay to the client.
///
/// Hop-by-hop headers go; `Content-Length` goes too, since the rendered
/// body differs in length from the origin document.
pub fn sanitize_response_headers(headers: &mut HeaderMap) {
    strip_hop_headers(headers);
    headers.remove(CONTENT_LENGTH);
}
