//! CREATE VIEW body scanner: runs the Sharq tokenizer over the view's SELECT
//! body to extract its first source table and select-item list. Spec.md
//! §4.C "view-SQL scanner".

use crate::query::token::{Tokenizer, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewItem {
    pub source_name: String,
    pub display_name: String,
    pub ordinal: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewScan {
    pub source_table: Option<String>,
    pub items: Vec<ViewItem>,
    pub select_star: bool,
    pub has_join: bool,
    pub has_where: bool,
}

/// Scans the `SELECT …` body of a `CREATE VIEW` statement using the
/// tokenizer, without a full parse: first source table name, select items
/// (source name, display name, ordinal), `SELECT *`, a `JOIN` token anywhere,
/// and a `WHERE` token anywhere.
pub fn scan_view(sql: &str) -> ViewScan {
    let mut tz = Tokenizer::new(sql);
    let mut scan = ViewScan::default();

    loop {
        let t = tz.peek();
        match t.kind {
            TokenKind::Eof => break,
            TokenKind::Join | TokenKind::Inner | TokenKind::Left | TokenKind::Right
            | TokenKind::Cross => scan.has_join = true,
            TokenKind::Where => scan.has_where = true,
            _ => {}
        }
        tz.next_token();
    }

    let mut tz = Tokenizer::new(sql);
    // Skip up to and including SELECT.
    loop {
        let t = tz.next_token();
        if t.kind == TokenKind::Eof || t.kind == TokenKind::Select {
            break;
        }
    }
    scan_select_items(&mut tz, sql, &mut scan);
    scan_from_table(&mut tz, sql, &mut scan);
    scan
}

fn scan_select_items(tz: &mut Tokenizer, src: &str, scan: &mut ViewScan) {
    let mut ordinal = 0;
    loop {
        let t = tz.peek();
        match t.kind {
            TokenKind::Star => {
                scan.select_star = true;
                tz.next_token();
            }
            TokenKind::From | TokenKind::Eof => break,
            TokenKind::Comma => {
                tz.next_token();
                continue;
            }
            TokenKind::Identifier | TokenKind::QuotedIdent => {
                let first = tz.next_token();
                let first_name = first.text(src).to_string();
                let mut source_name = first_name.clone();
                // `table.column`
                if tz.peek().kind == TokenKind::Dot {
                    tz.next_token();
                    let col = tz.next_token();
                    source_name = col.text(src).to_string();
                }
                let mut display_name = source_name.clone();
                if tz.peek().kind == TokenKind::As {
                    tz.next_token();
                    display_name = tz.next_token().text(src).to_string();
                } else if matches!(
                    tz.peek().kind,
                    TokenKind::Identifier | TokenKind::QuotedIdent
                ) {
                    display_name = tz.next_token().text(src).to_string();
                }
                scan.items.push(ViewItem {
                    source_name,
                    display_name,
                    ordinal,
                });
                ordinal += 1;
            }
            _ => {
                // Function calls, literals, expressions: skip to the next
                // top-level comma/FROM, tracking paren depth.
                let mut depth = 0_i32;
                loop {
                    let tok = tz.peek();
                    match tok.kind {
                        TokenKind::LParen => depth += 1,
                        TokenKind::RParen => depth -= 1,
                        TokenKind::Comma if depth == 0 => break,
                        TokenKind::From if depth == 0 => break,
                        TokenKind::Eof => break,
                        _ => {}
                    }
                    tz.next_token();
                }
                ordinal += 1;
            }
        }
    }
}

fn scan_from_table(tz: &mut Tokenizer, src: &str, scan: &mut ViewScan) {
    loop {
        let t = tz.next_token();
        if t.kind == TokenKind::Eof {
            return;
        }
        if t.kind == TokenKind::From {
            let name_tok = tz.peek();
            if matches!(name_tok.kind, TokenKind::Identifier | TokenKind::QuotedIdent) {
                scan.source_table = Some(tz.next_token().text(src).to_string());
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_simple_view() {
        let scan = scan_view("SELECT id, name AS n FROM users WHERE active = 1");
        assert_eq!(scan.source_table.as_deref(), Some("users"));
        assert!(!scan.select_star);
        assert!(scan.has_where);
        assert!(!scan.has_join);
        assert_eq!(scan.items.len(), 2);
        assert_eq!(scan.items[0].source_name, "id");
        assert_eq!(scan.items[1].display_name, "n");
    }

    #[test]
    fn detects_select_star_and_join() {
        let scan = scan_view("SELECT * FROM a JOIN b ON a.id = b.a_id");
        assert!(scan.select_star);
        assert!(scan.has_join);
        assert_eq!(scan.source_table.as_deref(), Some("a"));
    }
}
