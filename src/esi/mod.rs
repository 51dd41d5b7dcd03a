// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ESI lexing and tree building.
//!
//! The grammar is deliberately tiny: only `esi:`-prefixed tags are lexed
//! as tags, everything else in the document – markup included – passes
//! through as verbatim text tokens.  A document without includes therefore
//! rebuilds byte-identically.
//!
//! [`tokenize`] turns raw document text into a token stream and
//! [`build_tree`] turns the stream into a document tree plus the list of
//! include directives found in it.

mod tokenizer;
mod tree;


pub use tokenizer::{tokenize, Token};
pub use tree::{build_tree, INCLUDE_TAG};
