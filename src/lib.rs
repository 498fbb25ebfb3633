//! # canopy
//!
//! A schema-directed data translation library. canopy loads a collection of
//! YANG-flavored XML schema modules from a directory search path, merges them
//! into a single read-only schema tree, and uses that tree as the
//! authoritative description of a hierarchical configuration/state store.
//! Against it the library validates paths and values, parses request paths
//! with query parameters into retrieval skeletons, and translates
//! bidirectionally between the store's key-based data trees and XML or JSON
//! documents.
//!
//! The work is split across focused crates, re-exported here:
//! - **canopy-types**: the data tree, the flag word, the store seam
//! - **canopy-xpath1**: XPath 1.0 parsing for `when`/`must` conditions
//! - **canopy-schema**: loading, merging, lookup, and value validation
//! - **canopy-translate**: the query parser and the XML/JSON translators
//!
//! This crate adds the store bridge: [`fetch`] materializes the data a query
//! skeleton describes from a [`Store`], and [`apply`] writes a parsed edit
//! back.
//!
//! ## A round trip
//!
//! ```no_run
//! use canopy::{Flags, InMemoryStore, ParseMode, Translator};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = canopy::load("/etc/canopy/schemas")?;
//! let translator = Translator::new(&schema);
//! let mut store = InMemoryStore::new();
//!
//! // Apply an inbound edit.
//! let edit = translator.from_xml(
//!     "<test><settings><priority>1</priority></settings></test>",
//!     Flags::empty(),
//!     ParseMode::Edit,
//! )?;
//! canopy::apply(&mut store, &edit.tree, &edit.ops)?;
//!
//! // Serve a retrieval request.
//! let query = canopy::parse_query(&schema, "/test/settings?depth=2", Flags::empty())?;
//! let data = canopy::fetch(&store, &query);
//! println!("{}", translator.to_xml(&data, Flags::empty())?);
//! # Ok(())
//! # }
//! ```

// Re-export the member crates under stable names
pub use canopy_schema as schema;
pub use canopy_translate as translate;
pub use canopy_types as types;
pub use canopy_xpath1 as xpath1;

mod store;

// Foundation types
pub use canopy_types::{DataTree, Flags, InMemoryStore, Store, StoreError};

// Schema model
pub use canopy_schema::{
    ModelInfo, NATIVE_NAMESPACE, Namespace, NamespaceMap, RangeSpec, SchemaError, SchemaNode,
    SchemaNodeKind, SchemaTree, load, load_with_model_list,
};

// Translation
pub use canopy_translate::{
    ConditionEvaluator, ContentFilter, EditError, EditErrorTag, EditOps, ParseMode, Query,
    TranslateError, Translator, WithDefaults, XmlParse, parse_query,
};

// Store bridging
pub use store::{apply, fetch};
