//! The default abstract syntax tree for XPath 1.0 expressions.

/// A binary operator, ordered by the precedence ladder the parser climbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Equals,
    NotEquals,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Union,
}

impl BinaryOp {
    /// Binding strength, 1 (loosest, `or`) through 8 (tightest, `|`).
    /// Unary minus binds at 7, between the multiplicative operators and
    /// union.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Equals | BinaryOp::NotEquals => 3,
            BinaryOp::Less
            | BinaryOp::LessOrEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterOrEqual => 4,
            BinaryOp::Add | BinaryOp::Subtract => 5,
            BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => 6,
            BinaryOp::Union => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
}

/// The axis of movement from the context node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Ancestor,
    AncestorOrSelf,
    Attribute,
    Child,
    Descendant,
    DescendantOrSelf,
    Following,
    FollowingSibling,
    Namespace,
    Parent,
    Preceding,
    PrecedingSibling,
    SelfAxis,
}

impl Axis {
    pub fn from_name(name: &str) -> Option<Axis> {
        Some(match name {
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "attribute" => Axis::Attribute,
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "following" => Axis::Following,
            "following-sibling" => Axis::FollowingSibling,
            "namespace" => Axis::Namespace,
            "parent" => Axis::Parent,
            "preceding" => Axis::Preceding,
            "preceding-sibling" => Axis::PrecedingSibling,
            "self" => Axis::SelfAxis,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTypeTest {
    Node,
    Text,
    Comment,
    ProcessingInstruction,
}

impl NodeTypeTest {
    pub fn from_name(name: &str) -> Option<NodeTypeTest> {
        Some(match name {
            "node" => NodeTypeTest::Node,
            "text" => NodeTypeTest::Text,
            "comment" => NodeTypeTest::Comment,
            "processing-instruction" => NodeTypeTest::ProcessingInstruction,
            _ => return None,
        })
    }
}

/// A test applied to nodes found on an axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// A qualified name test (`foo`, `if:feature`).
    Name(String),
    /// The wildcard test (`*`).
    Wildcard,
    /// A node-type test (`node()`, `text()`, ...).
    NodeType(NodeTypeTest),
}

/// One step of a location path. Generic over the expression type so builders
/// can thread their own node representation through predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<E> {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<E>,
}

/// A location path: optional starting expression (`$var/foo`), absolute
/// marker, and the step sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationPath<E> {
    pub start: Option<Box<E>>,
    pub absolute: bool,
    pub steps: Vec<Step<E>>,
}

/// The default expression tree produced by [`crate::AstBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(String),
    Number(f64),
    Variable(String),
    Function { name: String, args: Vec<Expr> },
    Path(LocationPath<Expr>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
}

impl Expr {
    pub fn is_path(&self) -> bool {
        matches!(self, Expr::Path(_))
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Expr::Binary { .. })
    }
}
