//! Schema loading and the merged schema tree model.
//!
//! A schema instance is built once by [`load`] (or
//! [`load_with_model_list`]) from a colon-separated directory search path
//! holding `*.xml` / `*.xml.gz` schema files and `*.map` namespace maps. The
//! result is a single read-only tree: lookups, validation, and the canonical
//! dump never mutate it, so one instance can serve many threads.
//!
//! The crate covers:
//! - **load**: discovery, dependency-sorted parsing, and merging
//! - **node**: the arena tree and the [`SchemaNode`] handle with kind and
//!   access-mode predicates
//! - **ns**: namespace interning, match rules, and `.map` files
//! - **path**: absolute-path resolution, both plain and XPath dialects
//! - **range**: the `min..max|value` range sublanguage
//! - value validation and canonical-to-display translation on [`SchemaNode`]

pub mod error;
pub mod load;
pub mod node;
pub mod ns;
pub mod path;
pub mod range;

mod dump;
mod validate;

pub use error::SchemaError;
pub use load::{load, load_with_model_list};
pub use node::{ModelInfo, NodeId, SchemaNode, SchemaNodeKind, SchemaTree};
pub use ns::{NATIVE_NAMESPACE, Namespace, NamespaceMap};
pub use path::{ResolvedPath, expand_double_slash, split_key, strip_list_key};
pub use range::{RangeBound, RangeSpec, RangeTerm};
