//! Evaluation of `when`/`must`/`if-feature` conditions during translation.
//!
//! The library parses condition expressions for well-formedness but never
//! evaluates them itself; evaluation belongs to the host, which supplies a
//! [`ConditionEvaluator`] when constructing the translator.

use canopy_schema::SchemaNode;
use canopy_types::{DataTree, Flags};

/// Host-provided evaluator for condition expressions.
///
/// Receives the root of the data tree being translated, the path of the node
/// the condition is attached to, and the condition string. Returning `false`
/// drops the node from output or rejects it on input.
pub trait ConditionEvaluator {
    fn evaluate(&self, root: &DataTree, path: &str, expr: &str) -> bool;
}

pub(crate) struct Conditions<'a> {
    evaluator: Option<&'a dyn ConditionEvaluator>,
}

impl<'a> Conditions<'a> {
    pub fn new(evaluator: Option<&'a dyn ConditionEvaluator>) -> Self {
        Conditions { evaluator }
    }

    /// True when every condition on `node` passes (or conditions are not
    /// being evaluated).
    pub fn check(&self, node: SchemaNode, root: &DataTree, path: &str, flags: Flags) -> bool {
        if !flags.contains(Flags::CONDITIONS) {
            return true;
        }
        let mut exprs: Vec<String> = Vec::new();
        if let Some(when) = node.when_condition() {
            exprs.push(when.to_string());
        }
        if let Some(must) = node.must_condition() {
            exprs.push(must.to_string());
        }
        if let Some(feature) = node.if_feature() {
            // The raw attribute carries just the feature name.
            exprs.push(format!("if-feature(\"{}\")", feature));
        }
        for expr in exprs {
            if let Err(e) = canopy_xpath1::parse_expression(&expr) {
                log::warn!("ignoring malformed condition '{}' on {}: {}", expr, path, e);
                continue;
            }
            match self.evaluator {
                Some(evaluator) => {
                    if !evaluator.evaluate(root, path, &expr) {
                        if flags.contains(Flags::DEBUG) {
                            log::debug!("condition '{}' false at {}", expr, path);
                        }
                        return false;
                    }
                }
                None => {
                    log::debug!("no condition evaluator; '{}' assumed true", expr);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectAll;
    impl ConditionEvaluator for RejectAll {
        fn evaluate(&self, _root: &DataTree, _path: &str, _expr: &str) -> bool {
            false
        }
    }

    struct Recorder(std::cell::RefCell<Vec<String>>);
    impl ConditionEvaluator for Recorder {
        fn evaluate(&self, _root: &DataTree, _path: &str, expr: &str) -> bool {
            self.0.borrow_mut().push(expr.to_string());
            true
        }
    }

    fn tree_with_when() -> canopy_schema::SchemaTree {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("cond.xml"),
            r#"<MODULE xmlns="https://canopy.dev/schema">
                 <NODE name="svc">
                   <NODE name="address" mode="rw" when="../enable = 'true'"/>
                   <NODE name="enable" mode="rw"/>
                   <NODE name="extra" mode="rw" if-feature="routing"/>
                 </NODE>
               </MODULE>"#,
        )
        .unwrap();
        canopy_schema::load(dir.path().to_str().unwrap()).unwrap()
    }

    #[test]
    fn test_conditions_skipped_without_flag() {
        let tree = tree_with_when();
        let node = tree.lookup("/svc/address", Flags::empty()).unwrap();
        let conds = Conditions::new(Some(&RejectAll));
        let data = DataTree::new("svc");
        assert!(conds.check(node, &data, "/svc/address", Flags::empty()));
    }

    #[test]
    fn test_condition_false_drops_node() {
        let tree = tree_with_when();
        let node = tree.lookup("/svc/address", Flags::empty()).unwrap();
        let conds = Conditions::new(Some(&RejectAll));
        let data = DataTree::new("svc");
        assert!(!conds.check(node, &data, "/svc/address", Flags::CONDITIONS));
    }

    #[test]
    fn test_if_feature_is_rewritten() {
        let tree = tree_with_when();
        let node = tree.lookup("/svc/extra", Flags::empty()).unwrap();
        let recorder = Recorder(Default::default());
        let conds = Conditions::new(Some(&recorder));
        let data = DataTree::new("svc");
        assert!(conds.check(node, &data, "/svc/extra", Flags::CONDITIONS));
        assert_eq!(recorder.0.borrow().as_slice(), ["if-feature(\"routing\")"]);
    }

    #[test]
    fn test_missing_evaluator_accepts() {
        let tree = tree_with_when();
        let node = tree.lookup("/svc/address", Flags::empty()).unwrap();
        let conds = Conditions::new(None);
        let data = DataTree::new("svc");
        assert!(conds.check(node, &data, "/svc/address", Flags::CONDITIONS));
    }
}
