//! `sharqdb` core: bit-exact SQLite record/B-tree decoding, the Sharq query
//! front-end (tokenizer, parser, T-SQL translator, intent lowering), and a
//! tag/scope-aware in-process cache. See spec.md / SPEC_FULL.md for the full
//! component design; this crate implements the read path only -- no write-side
//! B-tree mutator, no WAL, no networking.

pub mod btree;
pub mod cache;
mod dbheader;
pub mod pager;
pub mod query;
pub mod record;
pub mod schema;
pub mod serial_type;
#[cfg(test)]
mod testutil;
pub mod value;
pub mod varint;

use pager::{IPageSource, PageNum};

/// Name and root page of the schema table itself, per spec.md §4.C.
pub const SCHEMA_TABLE_NAME: &str = "sqlite_schema";
const SCHEMA_BTREE_ROOT_PAGENUM: PageNum = 1;
const SCHEMA_SCHEMA: &str =
    "CREATE TABLE sqlite_schema (type text, name text, tbl_name text, rootpage integer, sql text)";
const SCHEMA_TABLE_TBL_NAME_COLIDX: usize = 2;
const SCHEMA_TABLE_ROOTPAGE_COLIDX: usize = 3;
const SCHEMA_TABLE_SQL_COLIDX: usize = 4;

/// Returns an iterator over the rows of the table b-tree rooted at `pgnum`,
/// yielding `(rowid, cell_payload)` pairs.
pub fn new_table_iterator(pgr: &dyn IPageSource, pgnum: PageNum) -> btree::table::Iterator<'_> {
    btree::table::Iterator::new(pgnum, pgr)
}

/// Looks up the root page number and `CREATE ...` SQL text for `table_name`
/// by scanning `sqlite_schema` (page 1). Used by the schema reader (`schema`
/// module) to bootstrap table metadata, and directly by callers that only
/// need the raw creation SQL.
pub fn get_creation_sql_and_root_pagenum(
    pgr: &dyn IPageSource,
    table_name: &str,
) -> Option<(PageNum, String)> {
    if table_name == SCHEMA_TABLE_NAME {
        return Some((SCHEMA_BTREE_ROOT_PAGENUM, String::from(SCHEMA_SCHEMA)));
    }
    for (_, payload) in new_table_iterator(pgr, SCHEMA_BTREE_ROOT_PAGENUM) {
        let row = match record::decode_record(payload) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let this_table_name = row[SCHEMA_TABLE_TBL_NAME_COLIDX].as_text()?;
        if this_table_name != table_name {
            continue;
        }
        let root_pagenum = row[SCHEMA_TABLE_ROOTPAGE_COLIDX].as_i64_checked()? as PageNum;
        let creation_sql = row[SCHEMA_TABLE_SQL_COLIDX].as_text()?.clone();
        return Some((root_pagenum, creation_sql));
    }
    None
}
