// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests {
    use crate::core::{
        append_forwarded_for, sanitize_response_headers, strip_hop_headers, IncludeDirective,
        Node, NodeKind,
    };
    use reqwest::header::{HeaderMap, HeaderValue};

    #[test]
    fn test_strip_hop_headers_removes_all_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("upgrade", HeaderValue::from_static("h2c"));
        headers.insert("te", HeaderValue::from_static("trailers"));
        headers.insert("host", HeaderValue::from_static("example.com"));
        headers.insert("cookie", HeaderValue::from_static("session=abc"));

        strip_hop_headers(&mut headers);

        assert!(headers.get("connection").is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("transfer-encoding").is_none());
        assert!(headers.get("upgrade").is_none());
        assert!(headers.get("te").is_none());
        // End-to-end headers survive
        assert_eq!(headers.get("host").unwrap(), "example.com");
        assert_eq!(headers.get("cookie").unwrap(), "session=abc");
    }

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        append_forwarded_for(&mut headers, "10.0.0.2");
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "10.0.0.2");
    }

    #[test]
    fn test_forwarded_for_appends_to_prior_chain() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));
        append_forwarded_for(&mut headers, "10.0.0.2");
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "10.0.0.1, 10.0.0.2");
    }

    #[test]
    fn test_forwarded_for_folds_multiple_instances() {
        let mut headers = HeaderMap::new();
        headers.append("x-forwarded-for", HeaderValue::from_static("10.0.0.1"));
        headers.append("x-forwarded-for", HeaderValue::from_static("172.16.0.1"));
        append_forwarded_for(&mut headers, "10.0.0.2");

        let all: Vec<_> = headers.get_all("x-forwarded-for").iter().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], "10.0.0.1, 172.16.0.1, 10.0.0.2");
    }

    #[test]
    fn test_sanitize_response_headers_drops_content_length() {
        let mut headers = HeaderMap::new();
        headers.insert("content-length", HeaderValue::from_static("42"));
        headers.insert("connection", HeaderValue::from_static("close"));
        headers.insert("content-type", HeaderValue::from_static("text/html"));

        sanitize_response_headers(&mut headers);

        assert!(headers.get("content-length").is_none());
        assert!(headers.get("connection").is_none());
        assert_eq!(headers.get("content-type").unwrap(), "text/html");
    }

    #[test]
    fn test_node_path_navigation() {
        let mut root = Node::root();
        root.children.push(Node::text("a"));
        let mut tag = Node::tag(vec![("src".into(), "http://x/frag".into())]);
        tag.children.push(Node::text("fallback"));
        root.children.push(tag);

        assert_eq!(root.node(&[0]).unwrap().text.as_deref(), Some("a"));
        assert_eq!(root.node(&[1]).unwrap().kind, NodeKind::Tag);
        assert_eq!(
            root.node(&[1, 0]).unwrap().text.as_deref(),
            Some("fallback")
        );
        assert!(root.node(&[2]).is_none());
        assert!(root.node(&[1, 5]).is_none());

        // Mutation through a path lands on the right node
        root.node_mut(&[1]).unwrap().children.push(Node::text("frag"));
        assert_eq!(root.node(&[1, 1]).unwrap().text.as_deref(), Some("frag"));
    }

    #[test]
    fn test_node_attribute_lookup() {
        let tag = Node::tag(vec![
            ("src".into(), "http://x/frag".into()),
            ("ttl".into(), "60".into()),
        ]);
        assert_eq!(tag.attribute("src"), Some("http://x/frag"));
        assert_eq!(tag.attribute("ttl"), Some("60"));
        assert_eq!(tag.attribute("alt"), None);
    }

    #[test]
    fn test_include_directive_defaults() {
        let directive = IncludeDirective::new(vec![3]);
        assert_eq!(directive.path, vec![3]);
        assert!(directive.src.is_none());
        assert_eq!(directive.ttl, 0);
        assert!(directive.body.is_none());
        assert!(directive.status.is_none());
    }
}
