//! Value validation and canonical-to-display translation for leaves.
//!
//! The check order is fixed: pattern, else range, else enumeration, else
//! accept. Patterns were compiled when the instance was loaded, so this path
//! never mutates the tree.

use crate::error::SchemaError;
use crate::node::SchemaNode;

impl<'a> SchemaNode<'a> {
    /// Validates a candidate string value against this node's constraints.
    pub fn validate(&self, value: &str) -> Result<(), SchemaError> {
        if self.pattern().is_some() {
            return self.check_pattern(value);
        }
        if let Some(range) = self.range() {
            if range.contains(value) {
                return Ok(());
            }
            return Err(SchemaError::OutOfRange {
                value: value.to_string(),
                range: self.range_raw().unwrap_or_default().to_string(),
            });
        }
        if self.enums().next().is_some() {
            let matched = self
                .enums()
                .any(|e| e.name() == value || e.enum_value() == Some(value));
            if !matched {
                return Err(SchemaError::EnumInvalid {
                    node: self.path(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_pattern(&self, value: &str) -> Result<(), SchemaError> {
        if let Some(message) = self.tree.bad_patterns.get(&self.id) {
            return Err(SchemaError::PatternRegex {
                node: self.path(),
                message: message.clone(),
            });
        }
        let Some(regex) = self.tree.patterns.get(&self.id) else {
            return Err(SchemaError::Internal(format!(
                "pattern on '{}' was never compiled",
                self.path()
            )));
        };
        if regex.is_match(value) {
            Ok(())
        } else {
            Err(SchemaError::PatternRegex {
                node: self.path(),
                message: format!(
                    "'{}' does not match pattern '{}'",
                    value,
                    self.pattern().unwrap_or_default()
                ),
            })
        }
    }

    /// Maps a canonical store value to its display (enum name) form. A
    /// missing value is replaced by the node's default before lookup.
    pub fn translate_to(&self, value: Option<&str>) -> Option<String> {
        let value = value.or_else(|| self.default_value())?;
        for e in self.enums() {
            if e.enum_value() == Some(value) {
                return Some(e.name().to_string());
            }
        }
        Some(value.to_string())
    }

    /// Maps a display (enum name) value back to its canonical store form.
    pub fn translate_from(&self, value: &str) -> String {
        for e in self.enums() {
            if e.name() == value {
                if let Some(canonical) = e.enum_value() {
                    return canonical.to_string();
                }
            }
        }
        value.to_string()
    }
}
