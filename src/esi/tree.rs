// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builds the document tree from a token stream and extracts the include
//! directives the engine will resolve.

use super::tokenizer::Token;
use crate::core::{IncludeDirective, Node};

/// The one tag name that produces an include directive.
pub const INCLUDE_TAG: &str = "esi:include";

/// Build a document tree from a token stream.
///
/// Returns the tree root plus one [`IncludeDirective`] per `esi:include`
/// tag, each carrying the child-index path to its node.  Content between
/// an include's opening and closing tag becomes the node's own children
/// and renders ahead of the fetched fragment.
pub fn build_tree(tokens: Vec<Token>) -> (Node, Vec<IncludeDirective>) {
    let mut root = Node::root();
    let mut directives = Vec::new();
    // Child-index path to the innermost open tag
    let mut stack: Vec<usize> = Vec::new();

    for token in tokens {
        match token {
            Token::Text(payload) => {
                parent(&mut root, &stack).children.push(Node::text(payload));
            }
            Token::OpenTag {
                name,
                attributes,
                self_closing,
            } => {
                let parent = parent(&mut root, &stack);
                parent.children.push(Node::tag(attributes));
                let idx = parent.children.len() - 1;

                if name == INCLUDE_TAG {
                    let mut path = stack.clone();
                    path.push(idx);
                    directives.push(IncludeDirective::new(path));
                }

                if !self_closing {
                    stack.push(idx);
                }
            }
            // Stray closers at the top level are ignored
            Token::CloseTag { .. } => {
                stack.pop();
            }
        }
    }

    (root, directives)
}

fn parent<'a>(root: &'a mut Node, stack: &[usize]) -> &'a mut Node {
    // Stack entries are indices of nodes pushed above, so the path is
    // always walkable.
    root.node_mut(stack).expect("tag stack points into the tree")
}
