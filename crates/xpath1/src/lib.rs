//! An XPath 1.0 expression parser.
//!
//! The parser is split the classical way: a `nom`-based tokenizer produces a
//! token stream, and a re-entrant recursive-descent parser turns it into an
//! operator tree. Construction of expression nodes is delegated to an
//! [`ExprBuilder`] supplied to the parser constructor, so an embedder can
//! build its own evaluation structures directly instead of walking the
//! default AST. The crate ships [`AstBuilder`], which produces [`Expr`].
//!
//! Only parsing lives here; evaluation belongs to the host.

pub mod ast;
pub mod builder;
pub mod error;
pub mod lexer;
pub mod parser;

pub use ast::{Axis, BinaryOp, Expr, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOp};
pub use builder::{AstBuilder, ExprBuilder};
pub use error::XPathError;
pub use lexer::{Token, tokenize};
pub use parser::{ExprParser, parse_expression};
