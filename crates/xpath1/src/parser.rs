//! A recursive-descent parser over the token stream.
//!
//! Each binding level gets its own method, or < and < equality < relational
//! < additive < multiplicative < unary minus < union, with location paths at
//! the bottom. The parser is re-entrant; every call to
//! [`ExprParser::parse`] builds a fresh tree.

use crate::ast::{Axis, BinaryOp, LocationPath, NodeTest, NodeTypeTest, Step, UnaryOp};
use crate::builder::{AstBuilder, ExprBuilder};
use crate::error::XPathError;
use crate::lexer::{Token, tokenize};

/// Parses `input` with the default [`AstBuilder`].
pub fn parse_expression(input: &str) -> Result<crate::ast::Expr, XPathError> {
    ExprParser::new(AstBuilder).parse(input)
}

/// An XPath parser bound to an expression builder.
pub struct ExprParser<B: ExprBuilder> {
    builder: B,
}

struct Cursor<'t> {
    input: &'t str,
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consumes a keyword operator spelled as a name token.
    fn eat_name(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(n)) if n == keyword) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {}", what)))
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn error(&self, message: &str) -> XPathError {
        let at = match self.peek() {
            Some(t) => format!("{} at token {:?}", message, t),
            None => format!("{} at end of input", message),
        };
        XPathError::Parse {
            expression: self.input.to_string(),
            message: at,
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Name(_))
                | Some(Token::Star)
                | Some(Token::At)
                | Some(Token::Dot)
                | Some(Token::DotDot)
        )
    }
}

fn descendant_or_self_step<E>() -> Step<E> {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::NodeType(NodeTypeTest::Node),
        predicates: Vec::new(),
    }
}

impl<B: ExprBuilder> ExprParser<B> {
    pub fn new(builder: B) -> Self {
        ExprParser { builder }
    }

    /// Tokenizes and parses a complete expression.
    pub fn parse(&mut self, input: &str) -> Result<B::Expr, XPathError> {
        let tokens = tokenize(input)?;
        let mut cur = Cursor {
            input,
            tokens: &tokens,
            pos: 0,
        };
        let expr = self.parse_expr(&mut cur)?;
        if !cur.at_end() {
            return Err(cur.error("trailing input after expression"));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        self.parse_or(cur)
    }

    fn parse_or(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        let mut left = self.parse_and(cur)?;
        while cur.eat_name("or") {
            let right = self.parse_and(cur)?;
            left = self.builder.binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        let mut left = self.parse_equality(cur)?;
        while cur.eat_name("and") {
            let right = self.parse_equality(cur)?;
            left = self.builder.binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        let mut left = self.parse_relational(cur)?;
        loop {
            let op = match cur.peek() {
                Some(Token::Equals) => BinaryOp::Equals,
                Some(Token::NotEquals) => BinaryOp::NotEquals,
                _ => break,
            };
            cur.bump();
            let right = self.parse_relational(cur)?;
            left = self.builder.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        let mut left = self.parse_additive(cur)?;
        loop {
            let op = match cur.peek() {
                Some(Token::Less) => BinaryOp::Less,
                Some(Token::LessOrEqual) => BinaryOp::LessOrEqual,
                Some(Token::Greater) => BinaryOp::Greater,
                Some(Token::GreaterOrEqual) => BinaryOp::GreaterOrEqual,
                _ => break,
            };
            cur.bump();
            let right = self.parse_additive(cur)?;
            left = self.builder.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        let mut left = self.parse_multiplicative(cur)?;
        loop {
            let op = match cur.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            cur.bump();
            let right = self.parse_multiplicative(cur)?;
            left = self.builder.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        let mut left = self.parse_unary(cur)?;
        loop {
            // `*`, `div`, and `mod` are only operators in operator position,
            // which is exactly here: an operand has just been parsed.
            let op = if cur.eat(&Token::Star) {
                BinaryOp::Multiply
            } else if cur.eat_name("div") {
                BinaryOp::Divide
            } else if cur.eat_name("mod") {
                BinaryOp::Modulo
            } else {
                break;
            };
            let right = self.parse_unary(cur)?;
            left = self.builder.binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        if cur.eat(&Token::Minus) {
            let operand = self.parse_unary(cur)?;
            Ok(self.builder.unary(UnaryOp::Negate, operand))
        } else {
            self.parse_union(cur)
        }
    }

    fn parse_union(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        let mut left = self.parse_path_expr(cur)?;
        while cur.eat(&Token::Pipe) {
            let right = self.parse_path_expr(cur)?;
            left = self.builder.binary(BinaryOp::Union, left, right);
        }
        Ok(left)
    }

    /// Handles the ambiguity between location paths and primary expressions
    /// followed by a path (`$var/foo`, `id('x')/bar`).
    fn parse_path_expr(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        match cur.peek() {
            Some(Token::Slash) | Some(Token::SlashSlash) => {
                let path = self.parse_location_path(cur)?;
                Ok(self.builder.path(path))
            }
            Some(Token::Number(_))
            | Some(Token::Literal(_))
            | Some(Token::Variable(_))
            | Some(Token::LParen) => {
                let start = self.parse_primary(cur)?;
                self.parse_path_continuation(cur, start)
            }
            Some(Token::Name(n)) => {
                // A QName followed by `(` is a function call, unless the name
                // is a node-type test, which belongs to the step parser.
                let is_call =
                    cur.peek2() == Some(&Token::LParen) && NodeTypeTest::from_name(n).is_none();
                if is_call {
                    let start = self.parse_primary(cur)?;
                    self.parse_path_continuation(cur, start)
                } else {
                    let path = self.parse_location_path(cur)?;
                    Ok(self.builder.path(path))
                }
            }
            Some(Token::At) | Some(Token::Dot) | Some(Token::DotDot) | Some(Token::Star) => {
                let path = self.parse_location_path(cur)?;
                Ok(self.builder.path(path))
            }
            _ => Err(cur.error("expected expression")),
        }
    }

    fn parse_path_continuation(
        &mut self,
        cur: &mut Cursor,
        start: B::Expr,
    ) -> Result<B::Expr, XPathError> {
        if !matches!(cur.peek(), Some(Token::Slash) | Some(Token::SlashSlash)) {
            return Ok(start);
        }
        let mut steps = Vec::new();
        self.parse_following_steps(cur, &mut steps)?;
        Ok(self.builder.path(LocationPath {
            start: Some(Box::new(start)),
            absolute: false,
            steps,
        }))
    }

    fn parse_location_path(&mut self, cur: &mut Cursor) -> Result<LocationPath<B::Expr>, XPathError> {
        let mut steps = Vec::new();
        let absolute = match cur.peek() {
            Some(Token::SlashSlash) => {
                cur.bump();
                steps.push(descendant_or_self_step());
                steps.push(self.parse_step(cur)?);
                true
            }
            Some(Token::Slash) => {
                cur.bump();
                // A path of just "/" selects the root.
                if cur.starts_step() {
                    steps.push(self.parse_step(cur)?);
                }
                true
            }
            _ => {
                steps.push(self.parse_step(cur)?);
                false
            }
        };
        self.parse_following_steps(cur, &mut steps)?;
        Ok(LocationPath {
            start: None,
            absolute,
            steps,
        })
    }

    fn parse_following_steps(
        &mut self,
        cur: &mut Cursor,
        steps: &mut Vec<Step<B::Expr>>,
    ) -> Result<(), XPathError> {
        loop {
            if cur.eat(&Token::Slash) {
                steps.push(self.parse_step(cur)?);
            } else if cur.eat(&Token::SlashSlash) {
                steps.push(descendant_or_self_step());
                steps.push(self.parse_step(cur)?);
            } else {
                return Ok(());
            }
        }
    }

    fn parse_step(&mut self, cur: &mut Cursor) -> Result<Step<B::Expr>, XPathError> {
        let (axis, test) = if cur.eat(&Token::Dot) {
            (Axis::SelfAxis, NodeTest::NodeType(NodeTypeTest::Node))
        } else if cur.eat(&Token::DotDot) {
            (Axis::Parent, NodeTest::NodeType(NodeTypeTest::Node))
        } else if cur.eat(&Token::At) {
            (Axis::Attribute, self.parse_node_test(cur)?)
        } else {
            let axis_name = match (cur.peek(), cur.peek2()) {
                (Some(Token::Name(n)), Some(Token::ColonColon)) => Some(n.clone()),
                _ => None,
            };
            match axis_name {
                Some(name) => {
                    let axis =
                        Axis::from_name(&name).ok_or_else(|| XPathError::UnknownAxis(name))?;
                    cur.bump();
                    cur.bump();
                    (axis, self.parse_node_test(cur)?)
                }
                None => (Axis::Child, self.parse_node_test(cur)?),
            }
        };
        let mut predicates = Vec::new();
        while cur.eat(&Token::LBracket) {
            predicates.push(self.parse_expr(cur)?);
            cur.expect(&Token::RBracket, "']'")?;
        }
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self, cur: &mut Cursor) -> Result<NodeTest, XPathError> {
        if cur.eat(&Token::Star) {
            return Ok(NodeTest::Wildcard);
        }
        let name = match cur.peek() {
            Some(Token::Name(n)) => n.clone(),
            _ => return Err(cur.error("expected node test")),
        };
        cur.bump();
        if let Some(tt) = NodeTypeTest::from_name(&name) {
            if cur.eat(&Token::LParen) {
                if tt == NodeTypeTest::ProcessingInstruction {
                    if let Some(Token::Literal(_)) = cur.peek() {
                        cur.bump();
                    }
                }
                cur.expect(&Token::RParen, "')'")?;
                return Ok(NodeTest::NodeType(tt));
            }
        }
        Ok(NodeTest::Name(name))
    }

    fn parse_primary(&mut self, cur: &mut Cursor) -> Result<B::Expr, XPathError> {
        let token = cur.peek().cloned();
        match token {
            Some(Token::Number(v)) => {
                cur.bump();
                Ok(self.builder.number(v))
            }
            Some(Token::Literal(s)) => {
                cur.bump();
                Ok(self.builder.literal(&s))
            }
            Some(Token::Variable(v)) => {
                cur.bump();
                Ok(self.builder.variable(&v))
            }
            Some(Token::LParen) => {
                cur.bump();
                let expr = self.parse_expr(cur)?;
                cur.expect(&Token::RParen, "')'")?;
                Ok(expr)
            }
            Some(Token::Name(name)) => {
                cur.bump();
                cur.expect(&Token::LParen, "'('")?;
                let mut args = Vec::new();
                if cur.peek() != Some(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr(cur)?);
                        if !cur.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                cur.expect(&Token::RParen, "')'")?;
                Ok(self.builder.function(&name, args))
            }
            _ => Err(cur.error("expected primary expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;

    fn name_step(name: &str) -> Step<Expr> {
        Step {
            axis: Axis::Child,
            test: NodeTest::Name(name.to_string()),
            predicates: vec![],
        }
    }

    fn name_path(name: &str) -> Expr {
        Expr::Path(LocationPath {
            start: None,
            absolute: false,
            steps: vec![name_step(name)],
        })
    }

    #[test]
    fn test_parse_simple_path() {
        let result = parse_expression("foo/bar").unwrap();
        assert_eq!(
            result,
            Expr::Path(LocationPath {
                start: None,
                absolute: false,
                steps: vec![name_step("foo"), name_step("bar")],
            })
        );
    }

    #[test]
    fn test_parse_absolute_path() {
        let result = parse_expression("/test/settings").unwrap();
        if let Expr::Path(lp) = result {
            assert!(lp.absolute);
            assert_eq!(lp.steps.len(), 2);
        } else {
            panic!("expected path");
        }
    }

    #[test]
    fn test_parse_unary_minus() {
        let result = parse_expression("-5").unwrap();
        assert_eq!(
            result,
            Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(Expr::Number(5.0)),
            }
        );

        let result = parse_expression("10 - -5").unwrap();
        if let Expr::Binary { op, left, right } = result {
            assert_eq!(op, BinaryOp::Subtract);
            assert_eq!(*left, Expr::Number(10.0));
            assert_eq!(
                *right,
                Expr::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(Expr::Number(5.0)),
                }
            );
        } else {
            panic!("expected binary op");
        }
    }

    #[test]
    fn test_parse_axes() {
        let result = parse_expression("following-sibling::foo").unwrap();
        if let Expr::Path(lp) = result {
            assert_eq!(lp.steps[0].axis, Axis::FollowingSibling);
        } else {
            panic!("expected path");
        }

        let result = parse_expression("ancestor-or-self::*").unwrap();
        if let Expr::Path(lp) = result {
            assert_eq!(lp.steps[0].axis, Axis::AncestorOrSelf);
            assert_eq!(lp.steps[0].test, NodeTest::Wildcard);
        } else {
            panic!("expected path");
        }
    }

    #[test]
    fn test_parse_unknown_axis_fails() {
        assert!(matches!(
            parse_expression("sideways::foo"),
            Err(XPathError::UnknownAxis(_))
        ));
    }

    #[test]
    fn test_parse_path_starting_with_variable() {
        let result = parse_expression("$myVar/foo").unwrap();
        assert_eq!(
            result,
            Expr::Path(LocationPath {
                start: Some(Box::new(Expr::Variable("myVar".to_string()))),
                absolute: false,
                steps: vec![name_step("foo")],
            })
        );
    }

    #[test]
    fn test_parse_predicate() {
        let result = parse_expression("animal[name='cat']").unwrap();
        assert_eq!(
            result,
            Expr::Path(LocationPath {
                start: None,
                absolute: false,
                steps: vec![Step {
                    axis: Axis::Child,
                    test: NodeTest::Name("animal".to_string()),
                    predicates: vec![Expr::Binary {
                        op: BinaryOp::Equals,
                        left: Box::new(name_path("name")),
                        right: Box::new(Expr::Literal("cat".to_string())),
                    }],
                }],
            })
        );
    }

    #[test]
    fn test_parse_attribute_predicate() {
        let result = parse_expression("foo[@id = 'a']").unwrap();
        if let Expr::Path(lp) = result {
            if let Expr::Binary { left, .. } = &lp.steps[0].predicates[0] {
                if let Expr::Path(pred_path) = left.as_ref() {
                    assert_eq!(pred_path.steps[0].axis, Axis::Attribute);
                } else {
                    panic!("expected attribute path");
                }
            } else {
                panic!("expected comparison");
            }
        } else {
            panic!("expected path");
        }
    }

    #[test]
    fn test_parse_numeric_predicate() {
        let result = parse_expression("foo[1]").unwrap();
        if let Expr::Path(lp) = result {
            assert_eq!(lp.steps[0].predicates, vec![Expr::Number(1.0)]);
        } else {
            panic!("expected path");
        }
    }

    #[test]
    fn test_parse_function_in_predicate() {
        let result = parse_expression("para[position()=1]").unwrap();
        if let Expr::Path(lp) = result {
            assert!(lp.steps[0].predicates[0].is_binary());
        } else {
            panic!("expected path");
        }
    }

    #[test]
    fn test_parse_text_node_test() {
        let result = parse_expression("foo/text()").unwrap();
        if let Expr::Path(lp) = result {
            assert_eq!(lp.steps[1].test, NodeTest::NodeType(NodeTypeTest::Text));
        } else {
            panic!("expected path");
        }
    }

    #[test]
    fn test_parse_abbreviated_steps() {
        let result = parse_expression(".").unwrap();
        if let Expr::Path(lp) = result {
            assert_eq!(lp.steps[0].axis, Axis::SelfAxis);
            assert_eq!(lp.steps[0].test, NodeTest::NodeType(NodeTypeTest::Node));
        } else {
            panic!("expected path");
        }

        let result = parse_expression("../enable").unwrap();
        if let Expr::Path(lp) = result {
            assert_eq!(lp.steps[0].axis, Axis::Parent);
            assert_eq!(lp.steps[1].test, NodeTest::Name("enable".to_string()));
        } else {
            panic!("expected path");
        }
    }

    #[test]
    fn test_parse_operator_precedence() {
        let result = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            result,
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Number(1.0)),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Multiply,
                    left: Box::new(Expr::Number(2.0)),
                    right: Box::new(Expr::Number(3.0)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_div_and_mod() {
        let result = parse_expression("6 div 2 mod 2").unwrap();
        if let Expr::Binary { op, left, .. } = result {
            assert_eq!(op, BinaryOp::Modulo);
            assert!(matches!(
                *left,
                Expr::Binary {
                    op: BinaryOp::Divide,
                    ..
                }
            ));
        } else {
            panic!("expected binary op");
        }
    }

    #[test]
    fn test_parse_boolean_logic_precedence() {
        let result = parse_expression("a = b or c = d and e = f").unwrap();
        if let Expr::Binary { op, right, .. } = result {
            assert_eq!(op, BinaryOp::Or);
            assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::And,
                    ..
                }
            ));
        } else {
            panic!("expected binary op");
        }
    }

    #[test]
    fn test_parse_union() {
        let result = parse_expression("a | b").unwrap();
        assert_eq!(
            result,
            Expr::Binary {
                op: BinaryOp::Union,
                left: Box::new(name_path("a")),
                right: Box::new(name_path("b")),
            }
        );
    }

    #[test]
    fn test_parse_descendant_or_self() {
        let result = parse_expression("//foo").unwrap();
        if let Expr::Path(lp) = result {
            assert!(lp.absolute);
            assert_eq!(lp.steps.len(), 2);
            assert_eq!(lp.steps[0].axis, Axis::DescendantOrSelf);
            assert_eq!(lp.steps[0].test, NodeTest::NodeType(NodeTypeTest::Node));
            assert_eq!(lp.steps[1].test, NodeTest::Name("foo".to_string()));
        } else {
            panic!("expected path");
        }
    }

    #[test]
    fn test_parse_entity_operators() {
        let result = parse_expression("a &lt; b").unwrap();
        if let Expr::Binary { op, .. } = result {
            assert_eq!(op, BinaryOp::Less);
        } else {
            panic!("expected binary op");
        }
    }

    #[test]
    fn test_parse_function_call() {
        let result = parse_expression("concat('a', 'b')").unwrap();
        assert_eq!(
            result,
            Expr::Function {
                name: "concat".to_string(),
                args: vec![
                    Expr::Literal("a".to_string()),
                    Expr::Literal("b".to_string()),
                ],
            }
        );
    }

    #[test]
    fn test_parse_if_feature_condition() {
        let result = parse_expression("if-feature(\"routing\")").unwrap();
        assert_eq!(
            result,
            Expr::Function {
                name: "if-feature".to_string(),
                args: vec![Expr::Literal("routing".to_string())],
            }
        );
    }

    #[test]
    fn test_parse_when_condition() {
        let result = parse_expression("../enable = 'true'").unwrap();
        if let Expr::Binary { op, left, .. } = result {
            assert_eq!(op, BinaryOp::Equals);
            if let Expr::Path(lp) = *left {
                assert_eq!(lp.steps[0].axis, Axis::Parent);
            } else {
                panic!("expected path");
            }
        } else {
            panic!("expected binary op");
        }
    }

    #[test]
    fn test_trailing_input_is_an_error() {
        assert!(parse_expression("1 2").is_err());
        assert!(parse_expression("foo)").is_err());
    }

    #[test]
    fn test_reparse_is_reentrant() {
        let mut parser = ExprParser::new(AstBuilder);
        let first = parser.parse("a/b").unwrap();
        let second = parser.parse("a/b").unwrap();
        assert_eq!(first, second);
    }
}
