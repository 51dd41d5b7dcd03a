// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serialises a resolved document tree back into a byte stream.
//!
//! Rendering is a pre-order depth-first walk: a `Text` node writes its
//! payload verbatim, every node then renders its children in order –
//! including any fragment sub-trees the engine attached.  Output order is
//! therefore fixed by tree structure alone, never by fetch completion
//! order.  Must only run once resolution of the tree has completed.

use crate::core::{Node, NodeKind};

/// Render a node and its subtree into `out`.
pub fn render(node: &Node, out: &mut String) {
    if node.kind == NodeKind::Text {
        if let Some(payload) = &node.text {
            if !payload.is_empty() {
                out.push_str(payload);
            }
        }
    }

    for child in &node.children {
        render(child, out);
    }
}

/// Convenience wrapper returning the rendered output as a `String`.
pub fn render_to_string(node: &Node) -> String {
    let mut out = String::new();
    render(node, &mut out);
    out
}
