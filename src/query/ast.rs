//! The Sharq abstract syntax tree. Spec.md §3 "Sharq AST".
//!
//! Grounded on the teacher's `ast.rs` (`SelectStatement`, `SelItem`), widened
//! with the node variants spec.md's query language adds: record-id literals,
//! arrow/edge chains, window calls, CASE/CAST, EXISTS, IN-subquery, and
//! compound-query tails. `enum-as-inner` (already a teacher dependency) is
//! reused for the `AsX` accessors spec.md §9 calls for on `ColumnValue`-like
//! sum types; `Expr` itself is matched directly since most call sites need
//! more than one variant.

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Float(f64),
    Str(String),
    Null,
    Bool(bool),
    Column {
        qualifier: Option<String>,
        name: String,
    },
    Wildcard,
    /// `table:id` record-id literal.
    RecordId {
        table: String,
        id: String,
    },
    Parameter(String),
    FunctionCall(FunctionCall),
    Window(Box<WindowCall>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<SelectStatement>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Case {
        whens: Vec<(Expr, Expr)>,
        else_expr: Option<Box<Expr>>,
    },
    Cast {
        expr: Box<Expr>,
        type_name: String,
    },
    Subquery(Box<SelectStatement>),
    Exists {
        subquery: Box<SelectStatement>,
        negated: bool,
    },
    Arrow(Box<ArrowChain>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub distinct: bool,
    /// `true` for `COUNT(*)`.
    pub star: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowCall {
    pub func: FunctionCall,
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderItem>,
    pub frame: Option<WindowFrame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameUnit {
    Rows,
    Range,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameBound {
    UnboundedPreceding,
    UnboundedFollowing,
    CurrentRow,
    Preceding(Box<Expr>),
    Following(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    pub unit: FrameUnit,
    pub start: FrameBound,
    pub end: Option<FrameBound>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    TextMatch,
    TextMatchAnd,
    TextMatchOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowDirection {
    Forward,
    Backward,
    Bidirectional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowStep {
    pub direction: ArrowDirection,
    pub ident: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowTerminal {
    Field(String),
    Wildcard,
}

/// A graph-traversal expression: an optional source expression (absent when
/// the expression *starts* with an edge token), a chain of directed steps,
/// and an optional trailing `.field`/`.* ` terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowChain {
    pub source: Option<Expr>,
    pub steps: Vec<ArrowStep>,
    pub terminal: Option<ArrowTerminal>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Expr { expr: Expr, alias: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub table: String,
    pub alias: Option<String>,
    pub record_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    pub on: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: Expr,
    pub descending: bool,
    pub nulls_first: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub query: Box<SelectStatement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionHint {
    Direct,
    Cached,
    Jit,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectStatement {
    pub distinct: bool,
    pub items: Vec<SelectItem>,
    pub from: Option<FromClause>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
    pub ctes: Vec<Cte>,
    pub compound: Option<(CompoundOp, Box<SelectStatement>)>,
    pub hint: Option<ExecutionHint>,
}
