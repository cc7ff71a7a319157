//! Lowering: flattens a parsed `SelectStatement` into the executor-ready
//! `QueryIntent`/`QueryPlan` forms. Spec.md §4.D.4.
//!
//! Grounded on the teacher's `ast_to_ir.rs` (which walks `ast::SelectStatement`
//! into a flat `ir::Block`), generalized to spec.md's post-order
//! `PredicateIntent` array (rather than the teacher's nested `ir` tree) and
//! to compound-query `QueryPlan`s with hoisted trailing clauses.

use super::ast::{
    BinaryOp, CompoundOp, Expr, ExecutionHint, FunctionCall, SelectItem, SelectStatement, UnaryOp,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LowerError {
    #[error("aggregate function {0} is not supported")]
    UnsupportedAggregate(String),
    #[error("IN list must contain only literal values, not parameters")]
    NonLiteralInList,
    #[error("LIKE pattern must be a string literal")]
    NonStringLikePattern,
    #[error("compile() does not accept compound queries; use compile_plan()")]
    CompoundQuery,
    #[error("select item is not a column reference or supported aggregate")]
    UnsupportedSelectItem,
    #[error("query has no FROM clause")]
    MissingFrom,
    #[error("GROUP BY / ORDER BY expressions must be plain column references")]
    NonColumnOrdering,
    #[error("LIMIT/OFFSET must be literal integers")]
    NonLiteralLimit,
    #[error("{0} is not supported in a lowered predicate")]
    UnsupportedExpr(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Between,
    IsNull,
    IsNotNull,
    StartsWith,
    EndsWith,
    Contains,
    In,
    NotIn,
    Like,
    NotLike,
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntentValue {
    Null,
    Signed64(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Parameter(String),
    Signed64Set(Vec<i64>),
    TextSet(Vec<String>),
}

/// One node of a flat, post-order predicate array: children always appear
/// before their parent. `left_index`/`right_index` are `-1` for absent
/// children (`-1` on both = leaf; `-1` on `right_index` only = unary).
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateNode {
    pub op: IntentOp,
    pub column: Option<String>,
    pub value: IntentValue,
    pub high_value: Option<IntentValue>,
    pub left_index: i32,
    pub right_index: i32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredicateIntent {
    pub nodes: Vec<PredicateNode>,
}

impl PredicateIntent {
    /// Index of the root node (the last one pushed in post-order).
    pub fn root(&self) -> Option<usize> {
        self.nodes.len().checked_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    CountStar,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub kind: AggregateKind,
    pub column: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntentItem {
    pub column: String,
    pub descending: bool,
    pub nulls_first: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryIntent {
    pub table: String,
    pub record_id: Option<String>,
    pub columns: Option<Vec<String>>,
    pub filter: Option<PredicateIntent>,
    pub aggregates: Option<Vec<Aggregate>>,
    pub group_by: Option<Vec<String>>,
    pub having: Option<PredicateIntent>,
    pub order_by: Option<Vec<OrderIntentItem>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub distinct: bool,
    pub hint: ExecutionHint,
}

/// The recursive core of a `QueryPlan`: a single intent, or a left leaf
/// intent joined to a (possibly further-compound) right side.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    Single(QueryIntent),
    Compound {
        left: QueryIntent,
        op: CompoundOp,
        right: Box<PlanNode>,
        final_order_by: Option<Vec<OrderIntentItem>>,
        final_limit: Option<i64>,
        final_offset: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub root: PlanNode,
    pub ctes: Vec<(String, QueryPlan)>,
}

/// Lowers a simple (non-compound, non-CTE) `SELECT` to a `QueryIntent`.
/// Rejects `UNION`/`INTERSECT`/`EXCEPT` and `WITH`; use `compile_plan` for
/// those. Spec.md §4.D.4 / §7 `UnsupportedSharq`.
pub fn compile(sharq: &str) -> Result<QueryIntent, CompileError> {
    let ast = super::parser::parse(sharq)?;
    if ast.compound.is_some() || !ast.ctes.is_empty() {
        return Err(CompileError::Lower(LowerError::CompoundQuery));
    }
    Ok(lower_select(&ast)?)
}

/// Lowers any `SELECT` -- simple, compound, or CTE-qualified -- to a
/// `QueryPlan`.
pub fn compile_plan(sharq: &str) -> Result<QueryPlan, CompileError> {
    let ast = super::parser::parse(sharq)?;
    Ok(lower_plan(&ast)?)
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] super::parser::ParseError),
    #[error(transparent)]
    Lower(#[from] LowerError),
}

fn lower_plan(ast: &SelectStatement) -> Result<QueryPlan, LowerError> {
    let mut ctes = Vec::new();
    for cte in &ast.ctes {
        ctes.push((cte.name.clone(), lower_plan(&cte.query)?));
    }
    Ok(QueryPlan {
        root: lower_plan_node(ast)?,
        ctes,
    })
}

fn lower_plan_node(ast: &SelectStatement) -> Result<PlanNode, LowerError> {
    match &ast.compound {
        None => Ok(PlanNode::Single(lower_select(ast)?)),
        Some((op, right_ast)) => {
            let left = lower_select(ast)?;
            let mut right_node = lower_plan_node(right_ast)?;
            let (final_order_by, final_limit, final_offset) = hoist(&mut right_node);
            Ok(PlanNode::Compound {
                left,
                op: *op,
                right: Box::new(right_node),
                final_order_by,
                final_limit,
                final_offset,
            })
        }
    }
}

/// Pulls the trailing `ORDER BY`/`LIMIT`/`OFFSET` off the rightmost leaf of
/// `node` (recursing through any already-hoisted nested compounds) so the
/// outermost `PlanNode::Compound` carries them once.
#[allow(clippy::type_complexity)]
fn hoist(
    node: &mut PlanNode,
) -> (
    Option<Vec<OrderIntentItem>>,
    Option<i64>,
    Option<i64>,
) {
    match node {
        PlanNode::Single(intent) => (intent.order_by.take(), intent.limit.take(), intent.offset.take()),
        PlanNode::Compound {
            final_order_by,
            final_limit,
            final_offset,
            ..
        } => (final_order_by.take(), final_limit.take(), final_offset.take()),
    }
}

fn lower_select(ast: &SelectStatement) -> Result<QueryIntent, LowerError> {
    let from = ast.from.as_ref().ok_or(LowerError::MissingFrom)?;

    let mut columns = Vec::new();
    let mut aggregates = Vec::new();
    let mut is_wildcard = false;
    for item in &ast.items {
        match item {
            SelectItem::Wildcard => is_wildcard = true,
            SelectItem::Expr { expr, alias } => match expr {
                Expr::Column { name, .. } => columns.push(name.clone()),
                Expr::FunctionCall(fc) => aggregates.push(lower_aggregate(fc, alias.clone())?),
                _ => return Err(LowerError::UnsupportedSelectItem),
            },
        }
    }

    let filter = match &ast.where_clause {
        Some(e) => Some(lower_predicate(e)?),
        None => None,
    };
    let having = match &ast.having {
        Some(e) => Some(lower_predicate(e)?),
        None => None,
    };
    let group_by = if ast.group_by.is_empty() {
        None
    } else {
        let mut out = Vec::new();
        for e in &ast.group_by {
            out.push(column_name(e).ok_or(LowerError::NonColumnOrdering)?.to_string());
        }
        Some(out)
    };
    let order_by = if ast.order_by.is_empty() {
        None
    } else {
        let mut out = Vec::new();
        for item in &ast.order_by {
            out.push(OrderIntentItem {
                column: column_name(&item.expr)
                    .ok_or(LowerError::NonColumnOrdering)?
                    .to_string(),
                descending: item.descending,
                nulls_first: item.nulls_first,
            });
        }
        Some(out)
    };
    let limit = lower_literal_i64(&ast.limit)?;
    let offset = lower_literal_i64(&ast.offset)?;

    Ok(QueryIntent {
        table: from.table.clone(),
        record_id: from.record_id.clone(),
        columns: if is_wildcard { None } else { Some(columns) },
        filter,
        aggregates: if aggregates.is_empty() {
            None
        } else {
            Some(aggregates)
        },
        group_by,
        having,
        order_by,
        limit,
        offset,
        distinct: ast.distinct,
        hint: ast.hint.unwrap_or(ExecutionHint::Direct),
    })
}

fn lower_literal_i64(expr: &Option<Expr>) -> Result<Option<i64>, LowerError> {
    match expr {
        None => Ok(None),
        Some(Expr::Integer(n)) => Ok(Some(*n)),
        Some(_) => Err(LowerError::NonLiteralLimit),
    }
}

fn column_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Column { name, .. } => Some(name),
        _ => None,
    }
}

fn lower_aggregate(fc: &FunctionCall, alias: Option<String>) -> Result<Aggregate, LowerError> {
    let kind = match fc.name.to_ascii_uppercase().as_str() {
        "COUNT" if fc.star => AggregateKind::CountStar,
        "COUNT" => AggregateKind::Count,
        "SUM" => AggregateKind::Sum,
        "AVG" => AggregateKind::Avg,
        "MIN" => AggregateKind::Min,
        "MAX" => AggregateKind::Max,
        other => return Err(LowerError::UnsupportedAggregate(other.to_string())),
    };
    let column = if kind == AggregateKind::CountStar {
        None
    } else {
        match fc.args.first() {
            Some(e) => Some(
                column_name(e)
                    .ok_or(LowerError::UnsupportedSelectItem)?
                    .to_string(),
            ),
            None => None,
        }
    };
    Ok(Aggregate {
        kind,
        column,
        alias,
    })
}

fn literal_to_intent_value(expr: &Expr) -> Option<IntentValue> {
    Some(match expr {
        Expr::Integer(n) => IntentValue::Signed64(*n),
        Expr::Float(f) => IntentValue::Real(*f),
        Expr::Str(s) => IntentValue::Text(s.clone()),
        Expr::Bool(b) => IntentValue::Bool(*b),
        Expr::Null => IntentValue::Null,
        Expr::Parameter(p) => IntentValue::Parameter(p.clone()),
        _ => return None,
    })
}

fn flip_comparison(op: IntentOp) -> IntentOp {
    match op {
        IntentOp::Lt => IntentOp::Gt,
        IntentOp::Lte => IntentOp::Gte,
        IntentOp::Gt => IntentOp::Lt,
        IntentOp::Gte => IntentOp::Lte,
        other => other,
    }
}

fn push_node(nodes: &mut Vec<PredicateNode>, node: PredicateNode) -> i32 {
    nodes.push(node);
    (nodes.len() - 1) as i32
}

fn leaf(
    op: IntentOp,
    column: String,
    value: IntentValue,
    high_value: Option<IntentValue>,
) -> PredicateNode {
    PredicateNode {
        op,
        column: Some(column),
        value,
        high_value,
        left_index: -1,
        right_index: -1,
    }
}

/// Lowers a WHERE/HAVING expression tree to a flat post-order
/// `PredicateIntent`: children are pushed before their parent, so the array
/// is directly evaluable by a single-pass stack machine.
pub fn lower_predicate(expr: &Expr) -> Result<PredicateIntent, LowerError> {
    let mut nodes = Vec::new();
    lower_predicate_into(expr, &mut nodes)?;
    Ok(PredicateIntent { nodes })
}

fn lower_predicate_into(expr: &Expr, nodes: &mut Vec<PredicateNode>) -> Result<i32, LowerError> {
    match expr {
        Expr::Binary {
            op: BinaryOp::And, ..
        }
        | Expr::Binary {
            op: BinaryOp::Or, ..
        } => {
            let (op, left, right) = match expr {
                Expr::Binary { op, left, right } => (*op, left, right),
                _ => unreachable!(),
            };
            let li = lower_predicate_into(left, nodes)?;
            let ri = lower_predicate_into(right, nodes)?;
            let intent_op = if op == BinaryOp::And {
                IntentOp::And
            } else {
                IntentOp::Or
            };
            Ok(push_node(
                nodes,
                PredicateNode {
                    op: intent_op,
                    column: None,
                    value: IntentValue::Null,
                    high_value: None,
                    left_index: li,
                    right_index: ri,
                },
            ))
        }
        Expr::Binary { op, left, right } => {
            let cmp_op = match op {
                BinaryOp::Eq => IntentOp::Eq,
                BinaryOp::Neq => IntentOp::Neq,
                BinaryOp::Lt => IntentOp::Lt,
                BinaryOp::Lte => IntentOp::Lte,
                BinaryOp::Gt => IntentOp::Gt,
                BinaryOp::Gte => IntentOp::Gte,
                _ => return Err(LowerError::UnsupportedExpr("non-comparison binary operator")),
            };
            let (column, final_op, value) = if let Some(col) = column_name(left) {
                let v = literal_to_intent_value(right)
                    .ok_or(LowerError::UnsupportedExpr("non-literal comparison operand"))?;
                (col.to_string(), cmp_op, v)
            } else if let Some(col) = column_name(right) {
                let v = literal_to_intent_value(left)
                    .ok_or(LowerError::UnsupportedExpr("non-literal comparison operand"))?;
                (col.to_string(), flip_comparison(cmp_op), v)
            } else {
                return Err(LowerError::UnsupportedExpr("comparison without a column operand"));
            };
            Ok(push_node(nodes, leaf(final_op, column, value, None)))
        }
        Expr::IsNull { expr, negated } => {
            let col = column_name(expr)
                .ok_or(LowerError::UnsupportedExpr("IS NULL requires a column operand"))?;
            let op = if *negated {
                IntentOp::IsNotNull
            } else {
                IntentOp::IsNull
            };
            Ok(push_node(
                nodes,
                leaf(op, col.to_string(), IntentValue::Null, None),
            ))
        }
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let col = column_name(expr)
                .ok_or(LowerError::UnsupportedExpr("BETWEEN requires a column operand"))?;
            let low_v = literal_to_intent_value(low)
                .ok_or(LowerError::UnsupportedExpr("BETWEEN bounds must be literal"))?;
            let high_v = literal_to_intent_value(high)
                .ok_or(LowerError::UnsupportedExpr("BETWEEN bounds must be literal"))?;
            let idx = push_node(
                nodes,
                leaf(IntentOp::Between, col.to_string(), low_v, Some(high_v)),
            );
            if *negated {
                Ok(push_node(
                    nodes,
                    PredicateNode {
                        op: IntentOp::Not,
                        column: None,
                        value: IntentValue::Null,
                        high_value: None,
                        left_index: idx,
                        right_index: -1,
                    },
                ))
            } else {
                Ok(idx)
            }
        }
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let col = column_name(expr)
                .ok_or(LowerError::UnsupportedExpr("IN requires a column operand"))?;
            let values: Result<Vec<IntentValue>, LowerError> = list
                .iter()
                .map(|e| literal_to_intent_value(e).ok_or(LowerError::NonLiteralInList))
                .collect();
            let values = values?;
            let set = if values
                .iter()
                .all(|v| matches!(v, IntentValue::Signed64(_)))
            {
                IntentValue::Signed64Set(
                    values
                        .iter()
                        .map(|v| match v {
                            IntentValue::Signed64(i) => *i,
                            _ => unreachable!(),
                        })
                        .collect(),
                )
            } else if values.iter().all(|v| matches!(v, IntentValue::Text(_))) {
                IntentValue::TextSet(
                    values
                        .into_iter()
                        .map(|v| match v {
                            IntentValue::Text(s) => s,
                            _ => unreachable!(),
                        })
                        .collect(),
                )
            } else {
                return Err(LowerError::NonLiteralInList);
            };
            let op = if *negated { IntentOp::NotIn } else { IntentOp::In };
            Ok(push_node(nodes, leaf(op, col.to_string(), set, None)))
        }
        Expr::Like {
            expr,
            pattern,
            negated,
        } => {
            let col = column_name(expr)
                .ok_or(LowerError::UnsupportedExpr("LIKE requires a column operand"))?;
            let pattern = match pattern.as_ref() {
                Expr::Str(s) => s.clone(),
                _ => return Err(LowerError::NonStringLikePattern),
            };
            let (op, value) = classify_like_pattern(&pattern, *negated);
            Ok(push_node(nodes, leaf(op, col.to_string(), value, None)))
        }
        Expr::Unary {
            op: UnaryOp::Not,
            expr,
        } => {
            let idx = lower_predicate_into(expr, nodes)?;
            Ok(push_node(
                nodes,
                PredicateNode {
                    op: IntentOp::Not,
                    column: None,
                    value: IntentValue::Null,
                    high_value: None,
                    left_index: idx,
                    right_index: -1,
                },
            ))
        }
        Expr::Exists { .. } | Expr::InSubquery { .. } | Expr::Subquery(_) => {
            Err(LowerError::UnsupportedExpr("subqueries are not supported in a lowered predicate"))
        }
        _ => Err(LowerError::UnsupportedExpr("expression is not a supported predicate shape")),
    }
}

fn classify_like_pattern(pattern: &str, negated: bool) -> (IntentOp, IntentValue) {
    let has_underscore = pattern.contains('_');
    let starts = pattern.starts_with('%');
    let ends = pattern.ends_with('%');
    let inner = &pattern[starts as usize..pattern.len() - (ends as usize)];
    if !has_underscore && starts && ends && pattern.len() >= 2 && !inner.contains('%') {
        (IntentOp::Contains, IntentValue::Text(inner.to_string()))
    } else if !has_underscore && ends && !starts && !pattern[..pattern.len() - 1].contains('%') {
        (
            IntentOp::StartsWith,
            IntentValue::Text(pattern[..pattern.len() - 1].to_string()),
        )
    } else if !has_underscore && starts && !ends && !pattern[1..].contains('%') {
        (IntentOp::EndsWith, IntentValue::Text(pattern[1..].to_string()))
    } else {
        let op = if negated { IntentOp::NotLike } else { IntentOp::Like };
        (op, IntentValue::Text(pattern.to_string()))
    }
}
