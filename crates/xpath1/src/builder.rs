//! The builder seam between the parser and the host's expression
//! representation.

use crate::ast::{BinaryOp, Expr, LocationPath, UnaryOp};

/// Constructs expression nodes on the parser's behalf.
///
/// The parser drives precedence and grouping; what each recognized node
/// becomes is up to the builder, so a host can assemble its own evaluation
/// structures without an intermediate AST walk. A builder is handed to
/// [`crate::ExprParser::new`]; there is no process-wide registration.
pub trait ExprBuilder {
    type Expr;

    fn literal(&mut self, value: &str) -> Self::Expr;
    fn number(&mut self, value: f64) -> Self::Expr;
    fn variable(&mut self, name: &str) -> Self::Expr;
    fn function(&mut self, name: &str, args: Vec<Self::Expr>) -> Self::Expr;
    fn path(&mut self, path: LocationPath<Self::Expr>) -> Self::Expr;
    fn unary(&mut self, op: UnaryOp, operand: Self::Expr) -> Self::Expr;
    fn binary(&mut self, op: BinaryOp, left: Self::Expr, right: Self::Expr) -> Self::Expr;
}

/// The default builder: produces the [`Expr`] tree from [`crate::ast`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AstBuilder;

impl ExprBuilder for AstBuilder {
    type Expr = Expr;

    fn literal(&mut self, value: &str) -> Expr {
        Expr::Literal(value.to_string())
    }

    fn number(&mut self, value: f64) -> Expr {
        Expr::Number(value)
    }

    fn variable(&mut self, name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn function(&mut self, name: &str, args: Vec<Expr>) -> Expr {
        Expr::Function {
            name: name.to_string(),
            args,
        }
    }

    fn path(&mut self, path: LocationPath<Expr>) -> Expr {
        Expr::Path(path)
    }

    fn unary(&mut self, op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    fn binary(&mut self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeTest;
    use crate::parser::ExprParser;

    /// A builder that renders every node straight to a parenthesized string,
    /// skipping the AST entirely.
    struct RenderBuilder;

    fn op_symbol(op: BinaryOp) -> &'static str {
        match op {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Equals => "=",
            BinaryOp::NotEquals => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "div",
            BinaryOp::Modulo => "mod",
            BinaryOp::Union => "|",
        }
    }

    impl ExprBuilder for RenderBuilder {
        type Expr = String;

        fn literal(&mut self, value: &str) -> String {
            format!("'{}'", value)
        }

        fn number(&mut self, value: f64) -> String {
            format!("{}", value)
        }

        fn variable(&mut self, name: &str) -> String {
            format!("${}", name)
        }

        fn function(&mut self, name: &str, args: Vec<String>) -> String {
            format!("{}({})", name, args.join(", "))
        }

        fn path(&mut self, path: LocationPath<String>) -> String {
            let mut out = String::new();
            if let Some(start) = path.start {
                out.push_str(&start);
            }
            for (i, step) in path.steps.iter().enumerate() {
                if i > 0 || path.absolute || !out.is_empty() {
                    out.push('/');
                }
                match &step.test {
                    NodeTest::Name(name) => out.push_str(name),
                    NodeTest::Wildcard => out.push('*'),
                    NodeTest::NodeType(_) => out.push_str("node()"),
                }
                for predicate in &step.predicates {
                    out.push('[');
                    out.push_str(predicate);
                    out.push(']');
                }
            }
            out
        }

        fn unary(&mut self, _op: UnaryOp, operand: String) -> String {
            format!("(-{})", operand)
        }

        fn binary(&mut self, op: BinaryOp, left: String, right: String) -> String {
            format!("({} {} {})", left, op_symbol(op), right)
        }
    }

    #[test]
    fn test_custom_builder_sees_precedence() {
        let mut parser = ExprParser::new(RenderBuilder);
        assert_eq!(parser.parse("1 + 2 * 3").unwrap(), "(1 + (2 * 3))");
        assert_eq!(
            parser.parse("a = b or c = d and e = f").unwrap(),
            "((a = b) or ((c = d) and (e = f)))"
        );
    }

    #[test]
    fn test_custom_builder_builds_predicates() {
        let mut parser = ExprParser::new(RenderBuilder);
        assert_eq!(
            parser.parse("animal[name='cat']").unwrap(),
            "animal[(name = 'cat')]"
        );
    }

    #[test]
    fn test_custom_builder_path_from_variable() {
        let mut parser = ExprParser::new(RenderBuilder);
        assert_eq!(parser.parse("$base/foo").unwrap(), "$base/foo");
    }
}
