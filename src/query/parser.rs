//! Recursive-descent Sharq parser. Spec.md §4.D.2.
//!
//! Grounded on the teacher's `pt_to_ast.rs` (which walks a pest parse tree
//! into the same `ast::SelectStatement`/`ast::SelItem` shapes), rewritten as
//! a direct recursive-descent parser over `query::token::Tokenizer` per
//! spec.md's "zero-allocation tokenizer and recursive-descent parser"
//! requirement -- this crate has no pest grammar file to drive a PT.

use super::ast::*;
use super::token::{is_identifier_whitelisted_keyword, Token, TokenKind, Tokenizer};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("parse error at byte {position}: {message}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

type PResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    src: &'a str,
    tz: Tokenizer<'a>,
}

/// Parses a full Sharq statement (optional `WITH`, a compound `SELECT`
/// chain, optional trailing `;`) into a `SelectStatement`.
pub fn parse(src: &str) -> PResult<SelectStatement> {
    let mut p = Parser {
        src,
        tz: Tokenizer::new(src),
    };
    let stmt = p.parse_statement()?;
    let t = p.tz.peek();
    if t.kind != TokenKind::Eof {
        return Err(p.err(t, "unexpected trailing input"));
    }
    Ok(stmt)
}

impl<'a> Parser<'a> {
    fn err(&self, t: Token, message: &str) -> ParseError {
        ParseError {
            position: t.start,
            message: message.to_string(),
        }
    }

    fn peek(&mut self) -> Token {
        self.tz.peek()
    }

    fn advance(&mut self) -> Token {
        self.tz.next_token()
    }

    fn text(&self, t: Token) -> &'a str {
        t.text(self.src)
    }

    fn eat(&mut self, kind: TokenKind) -> PResult<Token> {
        let t = self.peek();
        if t.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.err(t, &format!("expected {:?}, found {:?}", kind, t.kind)))
        }
    }

    fn at(&mut self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn eat_if(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// An identifier in a position that also accepts the whitelisted
    /// keywords as bare identifiers (spec.md §4.D.2).
    fn eat_identifier_like(&mut self) -> PResult<String> {
        let t = self.peek();
        match t.kind {
            TokenKind::Identifier => {
                self.advance();
                Ok(self.text(t).to_string())
            }
            TokenKind::QuotedIdent => {
                self.advance();
                Ok(self.text(t).to_string())
            }
            k if is_identifier_whitelisted_keyword(k) => {
                self.advance();
                Ok(self.text(t).to_string())
            }
            _ => Err(self.err(t, "expected identifier")),
        }
    }

    // ---- Statement shape ----

    fn parse_statement(&mut self) -> PResult<SelectStatement> {
        let mut ctes = Vec::new();
        if self.eat_if(TokenKind::With) {
            loop {
                let name = self.eat_identifier_like()?;
                self.eat(TokenKind::As)?;
                self.eat(TokenKind::LParen)?;
                let query = self.parse_select_compound()?;
                self.eat(TokenKind::RParen)?;
                ctes.push(Cte {
                    name,
                    query: Box::new(query),
                });
                if !self.eat_if(TokenKind::Comma) {
                    break;
                }
            }
        }
        let mut stmt = self.parse_select_compound()?;
        stmt.ctes = ctes;
        self.eat_if(TokenKind::Semicolon);
        Ok(stmt)
    }

    /// `select_compound`: a left-leaf SELECT, then optionally a compound
    /// operator and a right-recursive `select_compound`.
    fn parse_select_compound(&mut self) -> PResult<SelectStatement> {
        let hint = self.parse_execution_hint();
        let mut left = self.parse_select()?;
        left.hint = hint;
        if let Some(op) = self.parse_compound_op() {
            let right = self.parse_select_compound()?;
            left.compound = Some((op, Box::new(right)));
        }
        Ok(left)
    }

    fn parse_execution_hint(&mut self) -> Option<ExecutionHint> {
        let t = self.peek();
        let hint = match t.kind {
            TokenKind::Direct => ExecutionHint::Direct,
            TokenKind::Cached => ExecutionHint::Cached,
            TokenKind::Jit => ExecutionHint::Jit,
            _ => return None,
        };
        self.advance();
        Some(hint)
    }

    fn parse_compound_op(&mut self) -> Option<CompoundOp> {
        let t = self.peek();
        let op = match t.kind {
            TokenKind::Union => {
                self.advance();
                if self.eat_if(TokenKind::All) {
                    CompoundOp::UnionAll
                } else {
                    CompoundOp::Union
                }
            }
            TokenKind::Intersect => {
                self.advance();
                CompoundOp::Intersect
            }
            TokenKind::Except => {
                self.advance();
                CompoundOp::Except
            }
            TokenKind::PipeUnion => {
                self.advance();
                CompoundOp::Union
            }
            TokenKind::PipeUnionAll => {
                self.advance();
                CompoundOp::UnionAll
            }
            TokenKind::PipeIntersect => {
                self.advance();
                CompoundOp::Intersect
            }
            TokenKind::PipeExcept => {
                self.advance();
                CompoundOp::Except
            }
            _ => return None,
        };
        Some(op)
    }

    fn parse_select(&mut self) -> PResult<SelectStatement> {
        self.eat(TokenKind::Select)?;
        let distinct = self.eat_if(TokenKind::Distinct);
        let items = self.parse_select_items()?;

        let mut stmt = SelectStatement {
            distinct,
            items,
            ..Default::default()
        };

        if self.eat_if(TokenKind::From) {
            stmt.from = Some(self.parse_from_clause()?);
            loop {
                match self.parse_join()? {
                    Some(j) => stmt.joins.push(j),
                    None => break,
                }
            }
        }
        if self.eat_if(TokenKind::Where) {
            stmt.where_clause = Some(self.parse_expr()?);
        }
        if self.eat_if(TokenKind::Group) {
            self.eat(TokenKind::By)?;
            stmt.group_by = self.parse_expr_list()?;
        }
        if self.eat_if(TokenKind::Having) {
            stmt.having = Some(self.parse_expr()?);
        }
        if self.eat_if(TokenKind::Order) {
            self.eat(TokenKind::By)?;
            stmt.order_by = self.parse_order_list()?;
        }
        if self.eat_if(TokenKind::Limit) {
            stmt.limit = Some(self.parse_expr()?);
            if self.eat_if(TokenKind::Offset) {
                stmt.offset = Some(self.parse_expr()?);
            }
        }
        Ok(stmt)
    }

    fn parse_select_items(&mut self) -> PResult<Vec<SelectItem>> {
        if self.at(TokenKind::Star) {
            self.advance();
            return Ok(vec![SelectItem::Wildcard]);
        }
        let mut items = Vec::new();
        loop {
            if self.at(TokenKind::Star) {
                self.advance();
                items.push(SelectItem::Wildcard);
            } else {
                let expr = self.parse_expr()?;
                let alias = self.parse_optional_alias()?;
                items.push(SelectItem::Expr { expr, alias });
            }
            if !self.eat_if(TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    fn parse_optional_alias(&mut self) -> PResult<Option<String>> {
        if self.eat_if(TokenKind::As) {
            return Ok(Some(self.eat_identifier_like()?));
        }
        let t = self.peek();
        if t.kind == TokenKind::Identifier
            || (is_identifier_whitelisted_keyword(t.kind) && t.kind != TokenKind::Only)
        {
            return Ok(Some(self.eat_identifier_like()?));
        }
        Ok(None)
    }

    fn parse_from_clause(&mut self) -> PResult<FromClause> {
        let table = self.eat_identifier_like()?;
        let record_id = if self.eat_if(TokenKind::Colon) {
            Some(self.parse_record_id_tail()?)
        } else {
            None
        };
        self.skip_table_hint();
        let alias = self.parse_optional_alias()?;
        Ok(FromClause {
            table,
            alias,
            record_id,
        })
    }

    fn parse_record_id_tail(&mut self) -> PResult<String> {
        let t = self.peek();
        let id = match t.kind {
            TokenKind::Identifier | TokenKind::QuotedIdent => {
                self.advance();
                self.text(t).to_string()
            }
            TokenKind::IntegerLiteral => {
                self.advance();
                self.text(t).to_string()
            }
            _ => return Err(self.err(t, "expected record-id suffix")),
        };
        Ok(id)
    }

    /// T-SQL leftovers: a stripped `WITH (hint, ...)` table hint may still
    /// appear if the translator wasn't run first; tolerate and discard it so
    /// untranslated T-SQL fragments remain parseable. `WITH` is only ever a
    /// table hint here (a CTE's `WITH` appears solely at statement start),
    /// and a table hint is always followed by `(`, so a plain one-token
    /// lookahead is enough to decide without needing to back out consumed
    /// input.
    fn skip_table_hint(&mut self) {
        if self.at(TokenKind::With) && self.peek_second() == TokenKind::LParen {
            self.advance();
            self.advance();
            let mut depth = 1;
            while depth > 0 && !self.at(TokenKind::Eof) {
                match self.advance().kind {
                    TokenKind::LParen => depth += 1,
                    TokenKind::RParen => depth -= 1,
                    _ => {}
                }
            }
        }
    }

    fn parse_join(&mut self) -> PResult<Option<Join>> {
        let kind = match self.peek().kind {
            TokenKind::Join => {
                self.advance();
                JoinKind::Inner
            }
            TokenKind::Inner => {
                self.advance();
                self.eat(TokenKind::Join)?;
                JoinKind::Inner
            }
            TokenKind::Left => {
                self.advance();
                self.eat_if(TokenKind::Outer);
                self.eat(TokenKind::Join)?;
                JoinKind::Left
            }
            TokenKind::Right => {
                self.advance();
                self.eat_if(TokenKind::Outer);
                self.eat(TokenKind::Join)?;
                JoinKind::Right
            }
            TokenKind::Cross => {
                self.advance();
                self.eat(TokenKind::Join)?;
                JoinKind::Cross
            }
            _ => return Ok(None),
        };
        let table = self.eat_identifier_like()?;
        let alias = self.parse_optional_alias()?;
        let on = if kind == JoinKind::Cross {
            if self.at(TokenKind::On) {
                let t = self.peek();
                return Err(self.err(t, "CROSS JOIN must not carry an ON clause"));
            }
            None
        } else {
            self.eat(TokenKind::On)?;
            Some(self.parse_expr()?)
        };
        Ok(Some(Join {
            kind,
            table,
            alias,
            on,
        }))
    }

    fn parse_expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut out = vec![self.parse_expr()?];
        while self.eat_if(TokenKind::Comma) {
            out.push(self.parse_expr()?);
        }
        Ok(out)
    }

    fn parse_order_list(&mut self) -> PResult<Vec<OrderItem>> {
        let mut out = vec![self.parse_order_item()?];
        while self.eat_if(TokenKind::Comma) {
            out.push(self.parse_order_item()?);
        }
        Ok(out)
    }

    fn parse_order_item(&mut self) -> PResult<OrderItem> {
        let expr = self.parse_expr()?;
        let descending = if self.eat_if(TokenKind::Desc) {
            true
        } else {
            self.eat_if(TokenKind::Asc);
            false
        };
        let nulls_first = if self.eat_if(TokenKind::Nulls) {
            if self.eat_if(TokenKind::First) {
                Some(true)
            } else {
                self.eat(TokenKind::Last)?;
                Some(false)
            }
        } else {
            None
        };
        Ok(OrderItem {
            expr,
            descending,
            nulls_first,
        })
    }

    // ---- Expression grammar (precedence climbing) ----
    //
    // 1 OR, 2 AND, 3 NOT (prefix), 4 comparison/IS/BETWEEN/IN/LIKE/text-match,
    // 5 + -, 6 * / %, 7 unary minus, 8 primary.

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_if(TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_if(TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.eat_if(TokenKind::Not) {
            let expr = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let expr = self.parse_additive()?;
        self.parse_comparison_tail(expr)
    }

    fn parse_comparison_tail(&mut self, expr: Expr) -> PResult<Expr> {
        let t = self.peek();
        let binop = match t.kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Neq => Some(BinaryOp::Neq),
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Lte => Some(BinaryOp::Lte),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Gte => Some(BinaryOp::Gte),
            TokenKind::TextMatch => Some(BinaryOp::TextMatch),
            TokenKind::TextMatchAnd => Some(BinaryOp::TextMatchAnd),
            TokenKind::TextMatchOr => Some(BinaryOp::TextMatchOr),
            _ => None,
        };
        if let Some(op) = binop {
            self.advance();
            let rhs = self.parse_additive()?;
            return Ok(Expr::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(rhs),
            });
        }
        if self.at(TokenKind::Is) {
            self.advance();
            let negated = self.eat_if(TokenKind::Not);
            self.eat(TokenKind::Null)?;
            return Ok(Expr::IsNull {
                expr: Box::new(expr),
                negated,
            });
        }
        // NOT BETWEEN / NOT IN / NOT LIKE disambiguated via one-token peek.
        let negated = if self.at(TokenKind::Not) {
            // Peek past NOT without consuming unless it resolves to one of
            // these three constructs; otherwise NOT belongs to `parse_not`.
            let after = self.peek_second();
            match after {
                TokenKind::Between | TokenKind::In | TokenKind::Like => {
                    self.advance();
                    true
                }
                _ => return Ok(expr),
            }
        } else {
            false
        };
        if self.eat_if(TokenKind::Between) {
            let low = self.parse_additive()?;
            self.eat(TokenKind::And)?;
            let high = self.parse_additive()?;
            return Ok(Expr::Between {
                expr: Box::new(expr),
                low: Box::new(low),
                high: Box::new(high),
                negated,
            });
        }
        if self.eat_if(TokenKind::In) {
            self.eat(TokenKind::LParen)?;
            if self.at(TokenKind::Select) {
                let sub = self.parse_select_compound()?;
                self.eat(TokenKind::RParen)?;
                return Ok(Expr::InSubquery {
                    expr: Box::new(expr),
                    subquery: Box::new(sub),
                    negated,
                });
            }
            let list = self.parse_expr_list()?;
            self.eat(TokenKind::RParen)?;
            return Ok(Expr::InList {
                expr: Box::new(expr),
                list,
                negated,
            });
        }
        if self.eat_if(TokenKind::Like) {
            let pattern = self.parse_additive()?;
            return Ok(Expr::Like {
                expr: Box::new(expr),
                pattern: Box::new(pattern),
                negated,
            });
        }
        Ok(expr)
    }

    /// One-token-of-lookahead beyond `peek()`, used only to disambiguate
    /// `NOT BETWEEN`/`NOT IN`/`NOT LIKE` from a standalone `NOT` prefix.
    fn peek_second(&mut self) -> TokenKind {
        let mut probe = Tokenizer::new(&self.src[self.tz.peek().start..]);
        probe.next_token(); // the NOT itself (re-scanned)
        probe.next_token().kind
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if self.eat_if(TokenKind::Minus) {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let t = self.peek();
        match t.kind {
            TokenKind::IntegerLiteral => {
                self.advance();
                self.maybe_arrow_start(Expr::Integer(t.int_value))
            }
            TokenKind::FloatLiteral => {
                self.advance();
                Ok(Expr::Float(t.float_value))
            }
            TokenKind::StringLiteral => {
                self.advance();
                Ok(Expr::Str(self.text(t).replace("''", "'")))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            TokenKind::Parameter => {
                self.advance();
                Ok(Expr::Parameter(self.text(t).to_string()))
            }
            TokenKind::LParen => {
                self.advance();
                if self.at(TokenKind::Select) {
                    let sub = self.parse_select_compound()?;
                    self.eat(TokenKind::RParen)?;
                    return Ok(Expr::Subquery(Box::new(sub)));
                }
                let e = self.parse_expr()?;
                self.eat(TokenKind::RParen)?;
                Ok(e)
            }
            TokenKind::Case => self.parse_case(),
            TokenKind::Cast => self.parse_cast(),
            TokenKind::Exists => {
                self.advance();
                self.eat(TokenKind::LParen)?;
                let sub = self.parse_select_compound()?;
                self.eat(TokenKind::RParen)?;
                Ok(Expr::Exists {
                    subquery: Box::new(sub),
                    negated: false,
                })
            }
            TokenKind::PipeExists => {
                // Unary-quantifier prefix position, spec.md §9 Open Questions.
                self.advance();
                self.eat(TokenKind::LParen)?;
                let sub = self.parse_select_compound()?;
                self.eat(TokenKind::RParen)?;
                Ok(Expr::Exists {
                    subquery: Box::new(sub),
                    negated: false,
                })
            }
            TokenKind::EdgeForward | TokenKind::EdgeBackward | TokenKind::EdgeBidirectional => {
                self.parse_arrow_chain(None)
            }
            TokenKind::Identifier | TokenKind::QuotedIdent => self.parse_identifier_expr(),
            _ => Err(self.err(t, "expected expression")),
        }
    }

    fn parse_case(&mut self) -> PResult<Expr> {
        self.eat(TokenKind::Case)?;
        let mut whens = Vec::new();
        while self.eat_if(TokenKind::When) {
            let cond = self.parse_expr()?;
            self.eat(TokenKind::Then)?;
            let result = self.parse_expr()?;
            whens.push((cond, result));
        }
        let else_expr = if self.eat_if(TokenKind::Else) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.eat(TokenKind::End)?;
        Ok(Expr::Case { whens, else_expr })
    }

    fn parse_cast(&mut self) -> PResult<Expr> {
        self.eat(TokenKind::Cast)?;
        self.eat(TokenKind::LParen)?;
        let expr = self.parse_expr()?;
        self.eat(TokenKind::As)?;
        let type_name = self.eat_identifier_like()?;
        self.eat(TokenKind::RParen)?;
        Ok(Expr::Cast {
            expr: Box::new(expr),
            type_name,
        })
    }

    /// Parses the tail of an identifier-led expression: a bare column, a
    /// `table:id` record-id literal, a function/window call, a qualified
    /// `table.column`, or the source of an arrow chain.
    fn parse_identifier_expr(&mut self) -> PResult<Expr> {
        let t = self.peek();
        self.advance();
        let first = self.text(t).to_string();

        if self.eat_if(TokenKind::Colon) {
            let id = self.parse_record_id_tail()?;
            return self.maybe_arrow_start(Expr::RecordId { table: first, id });
        }
        if self.at(TokenKind::LParen) {
            return self.parse_call_tail(first);
        }
        if self.eat_if(TokenKind::Dot) {
            if self.eat_if(TokenKind::Star) {
                return Ok(Expr::Column {
                    qualifier: Some(first),
                    name: "*".to_string(),
                });
            }
            let name = self.eat_identifier_like()?;
            return self.maybe_arrow_start(Expr::Column {
                qualifier: Some(first),
                name,
            });
        }
        self.maybe_arrow_start(Expr::Column {
            qualifier: None,
            name: first,
        })
    }

    fn parse_call_tail(&mut self, name: String) -> PResult<Expr> {
        self.eat(TokenKind::LParen)?;
        let mut distinct = false;
        let mut star = false;
        let mut args = Vec::new();
        if self.eat_if(TokenKind::Star) {
            star = true;
        } else if !self.at(TokenKind::RParen) {
            distinct = self.eat_if(TokenKind::Distinct);
            args = self.parse_expr_list()?;
        }
        self.eat(TokenKind::RParen)?;
        let call = FunctionCall {
            name,
            args,
            distinct,
            star,
        };
        if self.eat_if(TokenKind::Over) {
            return self.parse_window_tail(call);
        }
        Ok(Expr::FunctionCall(call))
    }

    fn parse_window_tail(&mut self, func: FunctionCall) -> PResult<Expr> {
        self.eat(TokenKind::LParen)?;
        let mut partition_by = Vec::new();
        if self.eat_if(TokenKind::Partition) {
            self.eat(TokenKind::By)?;
            partition_by = self.parse_expr_list()?;
        }
        let mut order_by = Vec::new();
        if self.eat_if(TokenKind::Order) {
            self.eat(TokenKind::By)?;
            order_by = self.parse_order_list()?;
        }
        let frame = self.parse_window_frame()?;
        self.eat(TokenKind::RParen)?;
        Ok(Expr::Window(Box::new(WindowCall {
            func,
            partition_by,
            order_by,
            frame,
        })))
    }

    fn parse_window_frame(&mut self) -> PResult<Option<WindowFrame>> {
        let unit = match self.peek().kind {
            TokenKind::Rows => FrameUnit::Rows,
            TokenKind::Range => FrameUnit::Range,
            _ => return Ok(None),
        };
        self.advance();
        if self.eat_if(TokenKind::Between) {
            let start = self.parse_frame_bound()?;
            self.eat(TokenKind::And)?;
            let end = self.parse_frame_bound()?;
            Ok(Some(WindowFrame {
                unit,
                start,
                end: Some(end),
            }))
        } else {
            let start = self.parse_frame_bound()?;
            Ok(Some(WindowFrame {
                unit,
                start,
                end: None,
            }))
        }
    }

    fn parse_frame_bound(&mut self) -> PResult<FrameBound> {
        if self.eat_if(TokenKind::Unbounded) {
            return if self.eat_if(TokenKind::Preceding) {
                Ok(FrameBound::UnboundedPreceding)
            } else {
                self.eat(TokenKind::Following)?;
                Ok(FrameBound::UnboundedFollowing)
            };
        }
        if self.eat_if(TokenKind::Current) {
            self.eat(TokenKind::Row)?;
            return Ok(FrameBound::CurrentRow);
        }
        let expr = self.parse_additive()?;
        if self.eat_if(TokenKind::Preceding) {
            Ok(FrameBound::Preceding(Box::new(expr)))
        } else {
            self.eat(TokenKind::Following)?;
            Ok(FrameBound::Following(Box::new(expr)))
        }
    }

    /// After parsing a source expression, check for an edge token starting a
    /// chain; otherwise return the source expression unchanged.
    fn maybe_arrow_start(&mut self, source: Expr) -> PResult<Expr> {
        if matches!(
            self.peek().kind,
            TokenKind::EdgeForward | TokenKind::EdgeBackward | TokenKind::EdgeBidirectional
        ) {
            return self.parse_arrow_chain(Some(source));
        }
        Ok(source)
    }

    fn parse_arrow_chain(&mut self, source: Option<Expr>) -> PResult<Expr> {
        let mut steps = Vec::new();
        loop {
            let direction = match self.peek().kind {
                TokenKind::EdgeForward => ArrowDirection::Forward,
                TokenKind::EdgeBackward => ArrowDirection::Backward,
                TokenKind::EdgeBidirectional => ArrowDirection::Bidirectional,
                _ => break,
            };
            self.advance();
            let ident = self.eat_identifier_like()?;
            steps.push(ArrowStep { direction, ident });
        }
        let terminal = if self.eat_if(TokenKind::Dot) {
            if self.eat_if(TokenKind::Star) {
                Some(ArrowTerminal::Wildcard)
            } else {
                Some(ArrowTerminal::Field(self.eat_identifier_like()?))
            }
        } else {
            None
        };
        Ok(Expr::Arrow(Box::new(ArrowChain {
            source,
            steps,
            terminal,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scenario_3_query() {
        let stmt = parse(
            "SELECT name, age FROM users WHERE age >= $min AND status = 'active' \
             ORDER BY age DESC LIMIT 10",
        )
        .unwrap();
        assert_eq!(stmt.items.len(), 2);
        assert_eq!(stmt.from.as_ref().unwrap().table, "users");
        assert!(stmt.where_clause.is_some());
        assert_eq!(stmt.order_by.len(), 1);
        assert!(stmt.order_by[0].descending);
        assert_eq!(stmt.limit, Some(Expr::Integer(10)));
    }

    #[test]
    fn parses_joins_and_rejects_cross_join_on() {
        let stmt = parse("SELECT * FROM a JOIN b ON a.id = b.id").unwrap();
        assert_eq!(stmt.joins.len(), 1);
        assert_eq!(stmt.joins[0].kind, JoinKind::Inner);

        let err = parse("SELECT * FROM a CROSS JOIN b ON a.id = b.id").unwrap_err();
        assert!(err.message.contains("CROSS JOIN"));
    }

    #[test]
    fn parses_between_and_not_between() {
        let stmt = parse("SELECT * FROM t WHERE x BETWEEN 1 AND 10").unwrap();
        assert!(matches!(stmt.where_clause, Some(Expr::Between { negated: false, .. })));
        let stmt2 = parse("SELECT * FROM t WHERE x NOT BETWEEN 1 AND 10").unwrap();
        assert!(matches!(stmt2.where_clause, Some(Expr::Between { negated: true, .. })));
    }

    #[test]
    fn parses_not_prefix_distinct_from_not_in() {
        let stmt = parse("SELECT * FROM t WHERE NOT x = 1").unwrap();
        assert!(matches!(
            stmt.where_clause,
            Some(Expr::Unary { op: UnaryOp::Not, .. })
        ));
        let stmt2 = parse("SELECT * FROM t WHERE x NOT IN (1, 2)").unwrap();
        assert!(matches!(stmt2.where_clause, Some(Expr::InList { negated: true, .. })));
    }

    #[test]
    fn parses_compound_union_with_hoisted_order_limit() {
        let stmt = parse("SELECT a FROM t UNION ALL SELECT a FROM u ORDER BY a LIMIT 5").unwrap();
        let (op, right) = stmt.compound.unwrap();
        assert_eq!(op, CompoundOp::UnionAll);
        assert_eq!(right.order_by.len(), 1);
        assert_eq!(right.limit, Some(Expr::Integer(5)));
    }

    #[test]
    fn parses_cte() {
        let stmt = parse("WITH recent AS (SELECT a FROM t) SELECT a FROM recent").unwrap();
        assert_eq!(stmt.ctes.len(), 1);
        assert_eq!(stmt.ctes[0].name, "recent");
    }

    #[test]
    fn parses_record_id_and_arrow_chain() {
        let stmt = parse("SELECT * FROM users:42").unwrap();
        let from = stmt.from.unwrap();
        assert_eq!(from.record_id, Some("42".to_string()));
        assert_eq!(stmt.items[0], SelectItem::Wildcard);

        let stmt = parse("SELECT users:42 |> likes |> posts.title FROM t").unwrap();
        match &stmt.items[0] {
            SelectItem::Expr {
                expr: Expr::Arrow(chain),
                ..
            } => {
                assert_eq!(chain.steps.len(), 2);
                assert_eq!(chain.steps[0].direction, ArrowDirection::Forward);
                assert_eq!(chain.steps[1].direction, ArrowDirection::Forward);
                assert_eq!(
                    chain.terminal,
                    Some(ArrowTerminal::Field("title".to_string()))
                );
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn parses_arrow_expression_in_select_list() {
        let stmt = parse("SELECT users:1 |> likes.title FROM t").unwrap();
        match &stmt.items[0] {
            SelectItem::Expr { expr: Expr::Arrow(chain), .. } => {
                assert_eq!(chain.steps.len(), 1);
                assert_eq!(chain.steps[0].direction, ArrowDirection::Forward);
                assert_eq!(chain.terminal, Some(ArrowTerminal::Field("title".to_string())));
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn parses_window_function() {
        let stmt = parse(
            "SELECT rank() OVER (PARTITION BY dept ORDER BY salary DESC \
             ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW) FROM emp",
        )
        .unwrap();
        match &stmt.items[0] {
            SelectItem::Expr { expr: Expr::Window(w), .. } => {
                assert_eq!(w.partition_by.len(), 1);
                assert_eq!(w.order_by.len(), 1);
                assert!(w.frame.is_some());
            }
            other => panic!("unexpected item: {other:?}"),
        }
    }

    #[test]
    fn parses_case_and_cast() {
        let stmt = parse(
            "SELECT CASE WHEN a > 1 THEN 'big' ELSE 'small' END, CAST(a AS text) FROM t",
        )
        .unwrap();
        assert_eq!(stmt.items.len(), 2);
    }

    #[test]
    fn parses_exists_and_pipe_exists() {
        let stmt = parse("SELECT * FROM t WHERE EXISTS (SELECT * FROM u)").unwrap();
        assert!(matches!(stmt.where_clause, Some(Expr::Exists { .. })));
        let stmt2 = parse("SELECT * FROM t WHERE |?(SELECT * FROM u)").unwrap();
        assert!(matches!(stmt2.where_clause, Some(Expr::Exists { .. })));
    }

    #[test]
    fn parses_execution_hints() {
        let stmt = parse("CACHED SELECT * FROM t").unwrap();
        assert_eq!(stmt.hint, Some(ExecutionHint::Cached));
    }

    #[test]
    fn parse_error_reports_source_position() {
        let err = parse("SELECT FROM").unwrap_err();
        assert!(err.position > 0);
    }
}
