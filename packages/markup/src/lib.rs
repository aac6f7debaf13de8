//! # Quire Markup
//!
//! A small, forgiving reader for the HTML-like markup that flows in and out
//! of the editor: the HTML data processor in `quire-view` and the string
//! notations used to describe model and view trees in tests.
//!
//! ```text
//! "<p>foo<b>bar</b></p>" → lexer (logos) → tree builder → Vec<MarkupNode>
//! ```

pub mod error;
pub mod escape;
pub mod lexer;
pub mod tree;

pub use error::{MarkupError, MarkupResult};
pub use escape::{decode_entities, escape_attribute, escape_text};
pub use lexer::{lex, tokenize, SpannedToken, Token};
pub use tree::{parse, parse_strict, write_start_tag, MarkupNode, VOID_ELEMENTS};
