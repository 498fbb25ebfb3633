//! Schema-directed translation between data trees, XML, JSON, and request
//! paths.
//!
//! A [`Translator`] borrows a loaded schema tree and optionally a
//! [`ConditionEvaluator`]; every operation is a synchronous traversal on the
//! caller's thread and never retains references to the trees it is given.
//!
//! - **query**: request paths with query parameters to skeleton data trees
//! - **xml** / **json**: document to and from data tree translation
//! - **traverse**: defaulting, trimming, nulling, and depth passes
//! - **condition**: the `when`/`must`/`if-feature` seam to the host

pub mod condition;
pub mod error;
pub mod json;
pub mod query;
pub mod traverse;
pub mod xml;

pub use condition::ConditionEvaluator;
pub use error::{EditError, EditErrorTag, TranslateError};
pub use query::{ContentFilter, Query, WithDefaults, parse_query};
pub use xml::{EditOps, XmlParse};

use canopy_schema::SchemaTree;

/// Whether an inbound document is a retrieval request or an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Get,
    Edit,
}

/// The translation entry points, bound to one schema instance.
pub struct Translator<'a> {
    pub(crate) tree: &'a SchemaTree,
    pub(crate) evaluator: Option<&'a dyn ConditionEvaluator>,
}

impl<'a> Translator<'a> {
    pub fn new(tree: &'a SchemaTree) -> Self {
        Translator {
            tree,
            evaluator: None,
        }
    }

    /// A translator that evaluates conditions through `evaluator` whenever
    /// the `CONDITIONS` flag is passed.
    pub fn with_evaluator(tree: &'a SchemaTree, evaluator: &'a dyn ConditionEvaluator) -> Self {
        Translator {
            tree,
            evaluator: Some(evaluator),
        }
    }

    pub fn schema(&self) -> &'a SchemaTree {
        self.tree
    }
}
