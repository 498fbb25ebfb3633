//! The flag word passed to most schema and translation entry points.

use bitflags::bitflags;

bitflags! {
    /// Behavior flags for lookup, query parsing, and tree translation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u32 {
        /// Emit trace lines to the logger.
        const DEBUG = 1 << 0;
        /// Omit list keys from generated paths.
        const STRIP_KEY = 1 << 1;
        /// Encode lists and leaf-lists as JSON arrays.
        const JSON_ARRAYS = 1 << 2;
        /// Use typed JSON values (integer/boolean) where the schema allows.
        const JSON_TYPES = 1 << 3;
        /// Input paths use the XPath dialect (`name[key='value']`, `//`).
        const XPATH = 1 << 4;
        /// Restrict processing to config (writable) nodes.
        const CONFIG = 1 << 5;
        /// Prefix cross-namespace names with `module:`.
        const NS_PREFIX = 1 << 6;
        /// Resolve name prefixes against model names rather than namespace
        /// prefixes.
        const NS_MODEL_NAME = 1 << 7;
        /// Drop data values, producing skeleton trees.
        const STRIP_DATA = 1 << 8;
        /// Query restricted to a single level.
        const DEPTH_ONE = 1 << 9;
        /// Add leaves carrying their default value.
        const ADD_DEFAULTS = 1 << 10;
        /// Delete leaves whose value equals their default.
        const TRIM_DEFAULTS = 1 << 11;
        /// Insert missing leaves with empty values.
        const ADD_MISSING_NULL = 1 << 12;
        /// Set existing leaves to empty values.
        const SET_NULL = 1 << 13;
        /// Apply default/null policies only at or below the restriction depth.
        const FILTER_RDEPTH = 1 << 14;
        /// Apply the depth cap when traversing.
        const FILTER_DEPTH = 1 << 15;
        /// Prefix identityref values with their module name.
        const IDREF_VALUES = 1 << 16;
        /// Reject writes through read-only proxy nodes.
        const MODIFY_DATA = 1 << 17;
        /// Evaluate `when`/`must`/`if-feature` conditions during translation.
        const CONDITIONS = 1 << 18;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_compose() {
        let f = Flags::JSON_ARRAYS | Flags::JSON_TYPES;
        assert!(f.contains(Flags::JSON_ARRAYS));
        assert!(!f.contains(Flags::XPATH));
    }

    #[test]
    fn test_default_is_empty() {
        assert_eq!(Flags::default(), Flags::empty());
    }
}
