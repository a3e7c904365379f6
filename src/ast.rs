use std::rc::Rc;

use crate::position::Span;
use crate::value::Number;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Pow => "^",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "AND",
            BinOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
}

/// One `IF`/`ELSIF` arm. `suppressed` is set for block bodies
/// (`THEN NEWLINE … END`): the arm runs for effect and the construct
/// yields null instead of the body's value.
#[derive(Debug, Clone)]
pub struct IfCase {
    pub cond: Node,
    pub body: Node,
    pub suppressed: bool,
}

#[derive(Debug, Clone)]
pub struct ElseCase {
    pub body: Node,
    pub suppressed: bool,
}

/// A syntax tree node. The span always covers exactly the node's own
/// tokens: it starts where the first child (or leading keyword) starts and
/// ends where the last one ends, which is what keeps diagnostic carets
/// lined up with the source.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Number(Number),
    Str(String),
    List(Vec<Node>),
    VarAccess(String),
    VarAssign {
        name: String,
        value: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    If {
        cases: Vec<IfCase>,
        else_case: Option<Box<ElseCase>>,
    },
    /// `FOR var = start TO end (STEP step)? …`. The end bound is exclusive;
    /// direction follows the sign of the step (default +1).
    For {
        var: String,
        start: Box<Node>,
        end: Box<Node>,
        step: Option<Box<Node>>,
        body: Box<Node>,
        suppressed: bool,
    },
    /// `FOR var IN iterable …`.
    ForEach {
        var: String,
        iterable: Box<Node>,
        body: Box<Node>,
        suppressed: bool,
    },
    While {
        cond: Box<Node>,
        body: Box<Node>,
        suppressed: bool,
    },
    /// Same shape as `While`, inverted test.
    Until {
        cond: Box<Node>,
        body: Box<Node>,
        suppressed: bool,
    },
    /// A function definition is an expression; a named one additionally
    /// binds its name in the defining environment. The body is shared with
    /// every function value produced from this node.
    FunDef {
        name: Option<String>,
        params: Vec<String>,
        body: Rc<Node>,
        expr_body: bool,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    /// Program root and every block body. Evaluates to the list of its
    /// statements' values.
    Statements(Vec<Node>),
    Return(Option<Box<Node>>),
    Continue,
    Break,
}
