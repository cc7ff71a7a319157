//! The T-SQL -> Sharq surface translator: a single-pass, span-based
//! rewriter that normalizes dialect quirks while never altering the
//! contents of string literals or comments. Spec.md §4.D.3.
//!
//! Grounded on the teacher's hand-written `pt_to_ast`/`parser.rs` character
//! scanners (no regex dependency anywhere in the teacher's stack), extended
//! with the same "skip whitespace / `--` / `/* */`" trivia walk the
//! tokenizer (`query::token`) uses, since both need to recognize the same
//! lexical structure without tokenizing into owned data.

use std::borrow::Cow;

/// Stack budget for the rewrite buffer, mirroring `record::ColumnSpan`'s
/// stack/heap split (spec.md §9): most T-SQL fragments are short, so the
/// common case never touches the heap.
const STACK_BUDGET: usize = 256;

/// A single-pass rewrite buffer with a `[u8; STACK_BUDGET]` fast path,
/// spilling to a `Vec<u8>` once a fragment grows past it. Same shape as
/// `record::ColumnSpan`, specialized to bytes instead of columns.
enum ByteBuf {
    Stack([u8; STACK_BUDGET], usize),
    Heap(Vec<u8>),
}

impl ByteBuf {
    fn new() -> Self {
        ByteBuf::Stack([0u8; STACK_BUDGET], 0)
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            ByteBuf::Stack(arr, len) => &arr[..*len],
            ByteBuf::Heap(v) => v,
        }
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        match self {
            ByteBuf::Stack(arr, len) => {
                if *len + bytes.len() <= STACK_BUDGET {
                    arr[*len..*len + bytes.len()].copy_from_slice(bytes);
                    *len += bytes.len();
                } else {
                    let mut heap = arr[..*len].to_vec();
                    heap.extend_from_slice(bytes);
                    *self = ByteBuf::Heap(heap);
                }
            }
            ByteBuf::Heap(v) => v.extend_from_slice(bytes),
        }
    }

    fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    fn push_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.push_bytes(c.encode_utf8(&mut buf).as_bytes());
    }

    fn ends_with(&self, b: u8) -> bool {
        self.as_bytes().last() == Some(&b)
    }

    fn pop(&mut self) {
        match self {
            ByteBuf::Stack(_, len) => *len = len.saturating_sub(1),
            ByteBuf::Heap(v) => {
                v.pop();
            }
        }
    }

    fn truncate(&mut self, n: usize) {
        match self {
            ByteBuf::Stack(_, len) => *len = n,
            ByteBuf::Heap(v) => v.truncate(n),
        }
    }

    fn into_string(self) -> String {
        match self {
            ByteBuf::Stack(arr, len) => {
                String::from_utf8(arr[..len].to_vec()).expect("rewriter only emits valid utf8")
            }
            ByteBuf::Heap(v) => String::from_utf8(v).expect("rewriter only emits valid utf8"),
        }
    }
}

const TABLE_HINTS: &[&str] = &[
    "NOLOCK",
    "READUNCOMMITTED",
    "READCOMMITTED",
    "REPEATABLEREAD",
    "SERIALIZABLE",
    "HOLDLOCK",
    "UPDLOCK",
    "XLOCK",
    "TABLOCK",
    "TABLOCKX",
    "ROWLOCK",
    "PAGLOCK",
    "READPAST",
    "NOWAIT",
];

/// Translates T-SQL dialect quirks (`@param`, `N'...'`, `TOP n`,
/// `OFFSET ... FETCH NEXT ... ROWS ONLY`, `WITH (hint, ...)`) into their
/// Sharq equivalents. Returns the input unchanged (by reference) when no
/// rewrite is needed -- the allocation-free fast path for inputs that are
/// already plain Sharq.
pub fn translate_tsql(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let mut out = ByteBuf::new();
    let mut i = 0usize;
    let mut last_word: String = String::new();
    let mut pending_limit: Option<String> = None;

    while i < bytes.len() {
        let c = bytes[i];
        // Line comment.
        if c == b'-' && peek(bytes, i + 1) == Some(b'-') {
            let start = i;
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            out.push_str(&input[start..i]);
            continue;
        }
        // Block comment.
        if c == b'/' && peek(bytes, i + 1) == Some(b'*') {
            let start = i;
            i += 2;
            while i < bytes.len() && !(bytes[i] == b'*' && peek(bytes, i + 1) == Some(b'/')) {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
            out.push_str(&input[start..i]);
            continue;
        }
        // N'...'/n'...' Unicode-string prefix: strip the prefix, copy the
        // string body (including '' escapes) verbatim.
        if (c == b'N' || c == b'n') && peek(bytes, i + 1) == Some(b'\'') {
            i += 1; // drop the prefix, emit nothing for it
            let (text, next) = scan_string_literal(bytes, input, i);
            out.push_str(text);
            i = next;
            last_word.clear();
            continue;
        }
        if c == b'\'' {
            let (text, next) = scan_string_literal(bytes, input, i);
            out.push_str(text);
            i = next;
            last_word.clear();
            continue;
        }
        // @name -> $name.
        if c == b'@' && peek(bytes, i + 1).map(is_ident_start).unwrap_or(false) {
            out.push_char('$');
            i += 1;
            let start = i;
            while i < bytes.len() && is_ident_continue(bytes[i]) {
                i += 1;
            }
            out.push_str(&input[start..i]);
            last_word.clear();
            continue;
        }
        if is_ident_start(c) {
            let start = i;
            while i < bytes.len() && is_ident_continue(bytes[i]) {
                i += 1;
            }
            let word = &input[start..i];
            let upper = word.to_ascii_uppercase();

            if upper == "WITH" {
                if let Some(after) = try_strip_table_hint(bytes, input, i) {
                    // Drop one trailing space already emitted before `WITH`.
                    if out.ends_with(b' ') {
                        out.pop();
                    }
                    i = after;
                    last_word.clear();
                    continue;
                }
            }
            if upper == "TOP" && (last_word == "SELECT" || last_word == "DISTINCT") {
                if let Some((value, after)) = try_scan_top_value(bytes, input, i) {
                    pending_limit = Some(value);
                    i = after;
                    // swallow one separating space so SELECT/DISTINCT isn't
                    // left double-spaced from the next select item.
                    if i < bytes.len() && bytes[i] == b' ' {
                        i += 1;
                    }
                    continue;
                }
            }
            if upper == "OFFSET" {
                if let Some((limit_clause, after)) = try_scan_offset_fetch(bytes, input, i) {
                    out.push_str(&limit_clause);
                    i = after;
                    last_word.clear();
                    continue;
                }
            }
            out.push_str(word);
            last_word = upper;
            continue;
        }
        let ch = input[i..].chars().next().expect("valid utf8 boundary");
        out.push_char(ch);
        if !ch.is_whitespace() {
            last_word.clear();
        }
        i += ch.len_utf8();
    }

    if let Some(value) = pending_limit {
        insert_before_trailing_semicolon(&mut out, &format!(" LIMIT {value}"));
    }

    if out.as_bytes() == input.as_bytes() {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(out.into_string())
    }
}

fn peek(bytes: &[u8], i: usize) -> Option<u8> {
    bytes.get(i).copied()
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Scans a `'...'` string literal (assuming `bytes[start] == '\''`),
/// returning its full source text (quotes included, unmodified) and the
/// index just past the closing quote.
fn scan_string_literal<'a>(bytes: &[u8], input: &'a str, start: usize) -> (&'a str, usize) {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' && peek(bytes, i + 1) == Some(b'\'') {
            i += 2;
        } else if bytes[i] == b'\'' {
            i += 1;
            break;
        } else {
            i += 1;
        }
    }
    (&input[start..i], i)
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i] as char).is_whitespace() {
        i += 1;
    }
    i
}

fn word_at(bytes: &[u8], input: &str, i: usize) -> Option<(String, usize)> {
    let start = i;
    let mut j = i;
    while j < bytes.len() && is_ident_continue(bytes[j]) {
        j += 1;
    }
    if j == start {
        return None;
    }
    Some((input[start..j].to_ascii_uppercase(), j))
}

fn expect_word_ci(bytes: &[u8], input: &str, i: usize, word: &str) -> Option<usize> {
    let (w, next) = word_at(bytes, input, i)?;
    if w == word {
        Some(next)
    } else {
        None
    }
}

/// An integer literal or `@param` value (converted to `$param`), used by
/// both `TOP` and `OFFSET ... FETCH` scanning.
fn scan_value(bytes: &[u8], input: &str, i: usize) -> Option<(String, usize)> {
    if bytes.get(i) == Some(&b'@') {
        let (_, after) = word_at(bytes, input, i + 1)?;
        Some((format!("${}", &input[i + 1..after]), after))
    } else {
        let start = i;
        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j == start {
            return None;
        }
        Some((input[start..j].to_string(), j))
    }
}

/// `TOP n`, `TOP (n)`, or `TOP (@param)` immediately after `SELECT`/`DISTINCT`.
fn try_scan_top_value(bytes: &[u8], input: &str, after_top: usize) -> Option<(String, usize)> {
    let i = skip_ws(bytes, after_top);
    if bytes.get(i) == Some(&b'(') {
        let i = skip_ws(bytes, i + 1);
        let (value, i) = scan_value(bytes, input, i)?;
        let i = skip_ws(bytes, i);
        if bytes.get(i) == Some(&b')') {
            return Some((value, i + 1));
        }
        None
    } else {
        scan_value(bytes, input, i)
    }
}

/// `WITH (hint, ...)` immediately after a table reference, stripped only
/// when the first hint word is in the fixed T-SQL table-hint set.
fn try_strip_table_hint(bytes: &[u8], input: &str, after_with: usize) -> Option<usize> {
    let i = skip_ws(bytes, after_with);
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    let first_word_start = skip_ws(bytes, i + 1);
    let (first_word, _) = word_at(bytes, input, first_word_start)?;
    if !TABLE_HINTS.contains(&first_word.as_str()) {
        return None;
    }
    let mut j = i + 1;
    let mut depth = 1;
    while j < bytes.len() && depth > 0 {
        match bytes[j] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {}
        }
        j += 1;
    }
    Some(j)
}

/// `OFFSET n ROWS FETCH NEXT m ROWS ONLY` (also singular `ROW`, `FIRST` in
/// place of `NEXT`, `@param` values, `ONLY` optional). Returns the
/// replacement ` LIMIT m OFFSET n` text (no leading/trailing trim needed:
/// the caller is mid-copy at the `OFFSET` keyword boundary) and the index
/// just past the consumed T-SQL clause.
fn try_scan_offset_fetch(bytes: &[u8], input: &str, after_offset: usize) -> Option<(String, usize)> {
    let i = skip_ws(bytes, after_offset);
    let (n_value, i) = scan_value(bytes, input, i)?;
    let i = skip_ws(bytes, i);
    let i = expect_word_ci(bytes, input, i, "ROW").or_else(|| expect_word_ci(bytes, input, i, "ROWS"))?;
    let i = skip_ws(bytes, i);
    let i = expect_word_ci(bytes, input, i, "FETCH")?;
    let i = skip_ws(bytes, i);
    let i = expect_word_ci(bytes, input, i, "NEXT").or_else(|| expect_word_ci(bytes, input, i, "FIRST"))?;
    let i = skip_ws(bytes, i);
    let (m_value, i) = scan_value(bytes, input, i)?;
    let i = skip_ws(bytes, i);
    let i = expect_word_ci(bytes, input, i, "ROW").or_else(|| expect_word_ci(bytes, input, i, "ROWS"))?;
    let after_rows = i;
    let i = skip_ws(bytes, i);
    let i = expect_word_ci(bytes, input, i, "ONLY").unwrap_or(after_rows);
    Some((format!("LIMIT {m_value} OFFSET {n_value}"), i))
}

fn insert_before_trailing_semicolon(out: &mut ByteBuf, clause: &str) {
    let bytes = out.as_bytes();
    let trimmed_len = bytes
        .iter()
        .rposition(|&b| !(b as char).is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(0);
    if trimmed_len > 0 && bytes[trimmed_len - 1] == b';' {
        let insert_at = trimmed_len - 1;
        out.truncate(insert_at);
        out.push_str(clause);
        out.push_char(';');
    } else {
        out.push_str(clause);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_4_translates_top_with_hint_and_param() {
        // spec.md §8 end-to-end scenario 4.
        let input = "SELECT TOP 5 name FROM users WITH (NOLOCK) WHERE id = @uid";
        let out = translate_tsql(input);
        assert_eq!(out, "SELECT name FROM users WHERE id = $uid LIMIT 5");
    }

    #[test]
    fn translates_offset_fetch() {
        let input = "SELECT a FROM t ORDER BY a OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY";
        let out = translate_tsql(input);
        assert_eq!(out, "SELECT a FROM t ORDER BY a LIMIT 10 OFFSET 20");
    }

    #[test]
    fn translates_offset_fetch_singular_and_first() {
        let input = "SELECT a FROM t OFFSET 0 ROW FETCH FIRST 1 ROW ONLY";
        let out = translate_tsql(input);
        assert_eq!(out, "SELECT a FROM t LIMIT 1 OFFSET 0");
    }

    #[test]
    fn strips_n_prefixed_strings() {
        let input = "SELECT * FROM t WHERE name = N'Pepe'";
        let out = translate_tsql(input);
        assert_eq!(out, "SELECT * FROM t WHERE name = 'Pepe'");
    }

    #[test]
    fn leaves_cte_with_alone() {
        let input = "WITH recent AS (SELECT a FROM t) SELECT a FROM recent";
        let out = translate_tsql(input);
        assert_eq!(out, input);
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn does_not_alter_string_or_comment_contents() {
        let input = "SELECT '@uid TOP N''x''' -- @uid TOP\nFROM t";
        let out = translate_tsql(input);
        assert_eq!(out, input);
    }

    #[test]
    fn unchanged_sharq_input_returns_borrowed() {
        let input = "SELECT a FROM t WHERE id = $id LIMIT 5";
        let out = translate_tsql(input);
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn top_with_parenthesized_param() {
        let input = "SELECT TOP (@n) a FROM t";
        let out = translate_tsql(input);
        assert_eq!(out, "SELECT a FROM t LIMIT $n");
    }

    #[test]
    fn wide_fragment_spills_to_heap() {
        // Past STACK_BUDGET (256 bytes) the buffer must fall back to the
        // heap and still produce correct output.
        let padding = "x".repeat(300);
        let input = format!("SELECT {padding} FROM t WHERE id = @uid");
        let out = translate_tsql(&input);
        assert_eq!(out, format!("SELECT {padding} FROM t WHERE id = $uid"));
        assert!(matches!(out, Cow::Owned(_)));
    }
}
