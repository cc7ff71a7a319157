//! Hand-written CREATE TABLE / CREATE INDEX text scanners. Spec.md §4.C.
//!
//! Dependency-free character scanning, grounded on the teacher's
//! `pt_to_ast::pt_create_statement_to_ast` (also a table/column-name/type
//! extractor out of CREATE TABLE text) but rewritten as an explicit scanner
//! per spec.md, since the teacher's version leans on its `pest` grammar,
//! which spec.md's DDL scanner does not use.

use super::{ColumnInfo, Error, IndexColumn};

fn skip_ws(s: &[u8], mut i: usize) -> usize {
    while i < s.len() && (s[i] as char).is_whitespace() {
        i += 1;
    }
    i
}

/// Reads one identifier starting at `i`: quoted by `"`, `[..]`, or a
/// backtick, or a bare run of letters/digits/underscore. Returns the
/// identifier text (unquoted) and the index just past it.
fn read_identifier(s: &str, i: usize) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    let i = skip_ws(bytes, i);
    if i >= bytes.len() {
        return None;
    }
    let close = match bytes[i] {
        b'"' => Some(b'"'),
        b'[' => Some(b']'),
        b'`' => Some(b'`'),
        _ => None,
    };
    if let Some(close) = close {
        let start = i + 1;
        let mut j = start;
        while j < bytes.len() && bytes[j] != close {
            j += 1;
        }
        if j >= bytes.len() {
            return None;
        }
        return Some((s[start..j].to_string(), j + 1));
    }
    let start = i;
    let mut j = i;
    while j < bytes.len() && (bytes[j].is_ascii_alphanumeric() || bytes[j] == b'_') {
        j += 1;
    }
    if j == start {
        return None;
    }
    Some((s[start..j].to_string(), j))
}

fn word_at_ci(s: &str, i: usize, word: &str) -> bool {
    let bytes = s.as_bytes();
    let end = i + word.len();
    end <= bytes.len()
        && s[i..end].eq_ignore_ascii_case(word)
        && (end == bytes.len() || !(bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_'))
}

/// Finds the byte offset of the matching `)` for the `(` at `open`,
/// respecting nested parens and single-quoted strings.
fn matching_paren(s: &str, open: usize) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0_i32;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Splits `body` on top-level commas, respecting parenthesis depth and
/// single-quoted strings.
fn split_segments(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut out = Vec::new();
    let mut depth = 0_i32;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                            i += 2;
                            continue;
                        }
                        break;
                    }
                    i += 1;
                }
            }
            b'(' => depth += 1,
            b')' => depth -= 1,
            b',' if depth == 0 => {
                out.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    out.push(&body[start..]);
    out
}

const TABLE_LEVEL_CONSTRAINTS: &[&str] = &["PRIMARY KEY", "UNIQUE", "CHECK", "FOREIGN KEY"];

fn is_table_level_constraint(segment: &str) -> bool {
    let trimmed = segment.trim_start();
    for kw in TABLE_LEVEL_CONSTRAINTS {
        if word_prefix_ci(trimmed, kw) {
            return true;
        }
    }
    word_at_ci(trimmed, 0, "CONSTRAINT") && trimmed.len() > "CONSTRAINT".len()
}

fn word_prefix_ci(s: &str, words: &str) -> bool {
    // `words` may itself contain multiple space-separated words ("PRIMARY KEY").
    let mut pos = 0;
    for (idx, w) in words.split(' ').enumerate() {
        if idx > 0 {
            pos = skip_ws(s.as_bytes(), pos);
        }
        if !word_at_ci(s, pos, w) {
            return false;
        }
        pos += w.len();
    }
    true
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_uppercase().contains(&needle.to_ascii_uppercase())
}

fn parse_column_def(segment: &str) -> Option<ColumnInfo> {
    let (name, after_name) = read_identifier(segment, 0)?;
    let rest = segment[after_name..].trim_start();
    let type_name = read_type_name(rest);
    let primary_key = contains_ci(segment, "PRIMARY KEY");
    let not_null = primary_key || contains_ci(segment, "NOT NULL");
    Some(ColumnInfo {
        name,
        type_name,
        primary_key,
        not_null,
        physical_ordinals: Vec::new(),
        is_guid: false,
    })
}

/// Reads a type name: a bare word, optionally followed by parenthesized
/// arguments (`VARCHAR(255)`). Everything after is constraint text.
fn read_type_name(rest: &str) -> String {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    let mut end = i;
    let after_word = skip_ws(bytes, i);
    if after_word < bytes.len() && bytes[after_word] == b'(' {
        if let Some(close) = matching_paren(rest, after_word) {
            end = close + 1;
        }
    }
    rest[..end].trim().to_string()
}

/// Merges adjacent `{base}__hi` / `{base}__lo` integer columns into one
/// logical GUID column, recording both physical ordinals. Spec.md §4.C.
fn merge_guid_columns(columns: Vec<ColumnInfo>) -> (Vec<ColumnInfo>, usize) {
    let physical_count = columns.len();
    let mut out = Vec::with_capacity(columns.len());
    let mut i = 0;
    while i < columns.len() {
        if i + 1 < columns.len() {
            if let (Some(hi_base), Some(lo_base)) = (
                strip_suffix_ci(&columns[i].name, "__hi"),
                strip_suffix_ci(&columns[i + 1].name, "__lo"),
            ) {
                if hi_base.eq_ignore_ascii_case(lo_base) {
                    out.push(ColumnInfo {
                        name: hi_base.to_string(),
                        type_name: "guid".to_string(),
                        primary_key: columns[i].primary_key || columns[i + 1].primary_key,
                        not_null: columns[i].not_null || columns[i + 1].not_null,
                        physical_ordinals: vec![i, i + 1],
                        is_guid: true,
                    });
                    i += 2;
                    continue;
                }
            }
        }
        let mut col = columns[i].clone();
        col.physical_ordinals = vec![i];
        out.push(col);
        i += 1;
    }
    (out, physical_count)
}

fn strip_suffix_ci<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    if name.len() > suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix) {
        Some(&name[..name.len() - suffix.len()])
    } else {
        None
    }
}

/// Parses a `CREATE TABLE` statement's column list and `WITHOUT ROWID`
/// marker. Returns merged logical columns and the physical column count.
pub fn parse_create_table(sql: &str) -> Result<(Vec<ColumnInfo>, usize, bool), Error> {
    let open = sql
        .find('(')
        .ok_or_else(|| Error::MalformedDdl("CREATE TABLE missing column list".into()))?;
    let close = matching_paren(sql, open)
        .ok_or_else(|| Error::MalformedDdl("CREATE TABLE has unbalanced parentheses".into()))?;
    let body = &sql[open + 1..close];
    let without_rowid = contains_ci(&sql[close + 1..], "WITHOUT ROWID");

    let mut columns = Vec::new();
    for segment in split_segments(body) {
        let segment = segment.trim();
        if segment.is_empty() || is_table_level_constraint(segment) {
            continue;
        }
        if let Some(col) = parse_column_def(segment) {
            columns.push(col);
        }
    }
    if columns.is_empty() {
        return Err(Error::MalformedDdl("CREATE TABLE has no columns".into()));
    }
    let (merged, physical_count) = merge_guid_columns(columns);
    Ok((merged, physical_count, without_rowid))
}

/// Parses a `CREATE INDEX` statement's column list, `COLLATE`/direction
/// modifiers, and `UNIQUE` flag.
pub fn parse_create_index(sql: &str) -> Result<(Vec<IndexColumn>, bool), Error> {
    let prefix = &sql[..sql.find('(').unwrap_or(sql.len())];
    let unique = prefix
        .split_whitespace()
        .any(|w| w.eq_ignore_ascii_case("UNIQUE"));
    let open = sql
        .find('(')
        .ok_or_else(|| Error::MalformedDdl("CREATE INDEX missing column list".into()))?;
    let close = matching_paren(sql, open)
        .ok_or_else(|| Error::MalformedDdl("CREATE INDEX has unbalanced parentheses".into()))?;
    let body = &sql[open + 1..close];

    let mut columns = Vec::new();
    for segment in split_segments(body) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (name, mut i) = read_identifier(segment, 0)
            .ok_or_else(|| Error::MalformedDdl("CREATE INDEX column missing a name".into()))?;
        let mut collate = None;
        i = skip_ws(segment.as_bytes(), i);
        if word_at_ci(segment, i, "COLLATE") {
            i += "COLLATE".len();
            if let Some((coll_name, after)) = read_identifier(segment, i) {
                collate = Some(coll_name);
                i = after;
            }
        }
        i = skip_ws(segment.as_bytes(), i);
        let descending = word_at_ci(segment, i, "DESC");
        columns.push(IndexColumn {
            name,
            collate,
            descending,
        });
    }
    Ok((columns, unique))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_columns() {
        let (cols, phys, wr) =
            parse_create_table("CREATE TABLE t (a INT, b TEXT NOT NULL, c INTEGER PRIMARY KEY)")
                .unwrap();
        assert_eq!(phys, 3);
        assert!(!wr);
        assert_eq!(cols[0].name, "a");
        assert_eq!(cols[0].type_name, "INT");
        assert!(!cols[0].not_null);
        assert!(cols[2].primary_key);
        assert!(cols[2].not_null);
    }

    #[test]
    fn skips_table_level_constraints() {
        let (cols, phys, _) = parse_create_table(
            "CREATE TABLE t (a INT, b INT, PRIMARY KEY (a, b), CONSTRAINT ck CHECK (a > 0))",
        )
        .unwrap();
        assert_eq!(cols.len(), 2);
        assert_eq!(phys, 2);
    }

    #[test]
    fn detects_without_rowid() {
        let (_, _, wr) = parse_create_table("CREATE TABLE t (a INT PRIMARY KEY) WITHOUT ROWID")
            .unwrap();
        assert!(wr);
    }

    #[test]
    fn parses_varchar_with_length() {
        let (cols, ..) = parse_create_table("CREATE TABLE t (name VARCHAR(255))").unwrap();
        assert_eq!(cols[0].type_name, "VARCHAR(255)");
    }

    #[test]
    fn merges_guid_hi_lo_columns() {
        let (cols, phys, _) =
            parse_create_table("CREATE TABLE t (id__hi INT, id__lo INT, name TEXT)").unwrap();
        assert_eq!(phys, 3);
        assert_eq!(cols.len(), 2);
        assert!(cols[0].is_guid);
        assert_eq!(cols[0].name, "id");
        assert_eq!(cols[0].physical_ordinals, vec![0, 1]);
        assert_eq!(cols[1].name, "name");
        assert_eq!(cols[1].physical_ordinals, vec![2]);
    }

    #[test]
    fn parses_create_index_with_collate_and_direction() {
        let (cols, unique) =
            parse_create_index("CREATE UNIQUE INDEX idx ON t (a COLLATE nocase DESC, b ASC)")
                .unwrap();
        assert!(unique);
        assert_eq!(cols[0].name, "a");
        assert_eq!(cols[0].collate.as_deref(), Some("nocase"));
        assert!(cols[0].descending);
        assert_eq!(cols[1].name, "b");
        assert!(!cols[1].descending);
    }
}
