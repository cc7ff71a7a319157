//! Schema reader: walks `sqlite_schema` and classifies each row into a
//! table, index, or view description. Spec.md §4.C.
//!
//! Grounded on the teacher's `stored_db.rs` (`get_creation_sql`,
//! `get_root_pagenum`, the `SCHEMA_TABLE_*` constants), generalized from a
//! single `get_creation_sql(name)` lookup to a full typed `Schema` snapshot
//! covering tables, indexes, and views, plus the DDL/view sub-scanners this
//! module owns.

pub mod ddl;
pub mod view;

pub use view::{ViewItem, ViewScan};

use crate::pager::{IPageSource, PageNum};
use crate::record;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("malformed DDL: {0}")]
    MalformedDdl(String),
    #[error(transparent)]
    Record(#[from] record::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub type_name: String,
    pub primary_key: bool,
    pub not_null: bool,
    /// Physical column ordinals this logical column spans: one entry
    /// normally, two when it is a merged `__hi`/`__lo` GUID column.
    pub physical_ordinals: Vec<usize>,
    pub is_guid: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableInfo {
    pub name: String,
    pub root_page: PageNum,
    pub columns: Vec<ColumnInfo>,
    pub physical_column_count: usize,
    pub without_rowid: bool,
    pub indexes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexColumn {
    pub name: String,
    pub collate: Option<String>,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexInfo {
    pub name: String,
    pub table_name: String,
    pub root_page: PageNum,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewInfo {
    pub name: String,
    pub scan: ViewScan,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub tables: Vec<TableInfo>,
    pub indexes: Vec<IndexInfo>,
    pub views: Vec<ViewInfo>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn index(&self, name: &str) -> Option<&IndexInfo> {
        self.indexes.iter().find(|i| i.name.eq_ignore_ascii_case(name))
    }

    pub fn view(&self, name: &str) -> Option<&ViewInfo> {
        self.views.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }
}

const SCHEMA_BTREE_ROOT_PAGENUM: PageNum = 1;
const TYPE_COLIDX: usize = 0;
const NAME_COLIDX: usize = 1;
const TBL_NAME_COLIDX: usize = 2;
const ROOTPAGE_COLIDX: usize = 3;
const SQL_COLIDX: usize = 4;

/// Reads the entire `sqlite_schema` table and classifies each row, linking
/// indexes back to their owning tables (case-insensitive) and prepending a
/// synthetic `sqlite_master` entry so query plans can reference the schema
/// itself. Rows with DDL the scanner cannot classify are logged and skipped.
pub fn read_schema(pgr: &dyn IPageSource) -> Schema {
    let mut schema = Schema {
        tables: vec![TableInfo {
            name: crate::SCHEMA_TABLE_NAME.to_string(),
            root_page: SCHEMA_BTREE_ROOT_PAGENUM,
            columns: vec![
                col("type", "text"),
                col("name", "text"),
                col("tbl_name", "text"),
                col("rootpage", "integer"),
                col("sql", "text"),
            ],
            physical_column_count: 5,
            without_rowid: false,
            indexes: Vec::new(),
        }],
        indexes: Vec::new(),
        views: Vec::new(),
    };

    for (_, payload) in crate::new_table_iterator(pgr, SCHEMA_BTREE_ROOT_PAGENUM) {
        let row = match record::decode_record(payload) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("sqlite_schema row failed to decode: {e}");
                continue;
            }
        };
        if row.len() <= SQL_COLIDX {
            continue;
        }
        let kind = row[TYPE_COLIDX].as_text().map(String::as_str).unwrap_or("");
        let name = match row[NAME_COLIDX].as_text() {
            Some(n) => n.clone(),
            None => continue,
        };
        let tbl_name = row[TBL_NAME_COLIDX].as_text().cloned().unwrap_or_default();
        let root_page = row[ROOTPAGE_COLIDX].as_i64_checked().unwrap_or(0) as PageNum;
        let sql = row[SQL_COLIDX].as_text().cloned().unwrap_or_default();

        match kind {
            "table" => match ddl::parse_create_table(&sql) {
                Ok((columns, physical_column_count, without_rowid)) => {
                    schema.tables.push(TableInfo {
                        name,
                        root_page,
                        columns,
                        physical_column_count,
                        without_rowid,
                        indexes: Vec::new(),
                    });
                }
                Err(e) => log::warn!("could not parse CREATE TABLE for {name}: {e}"),
            },
            "index" => match ddl::parse_create_index(&sql) {
                Ok((columns, unique)) => {
                    schema.indexes.push(IndexInfo {
                        name,
                        table_name: tbl_name,
                        root_page,
                        columns,
                        unique,
                    });
                }
                Err(e) => log::warn!("could not parse CREATE INDEX for {name}: {e}"),
            },
            "view" => {
                let body_start = sql
                    .to_ascii_uppercase()
                    .find("AS")
                    .map(|idx| idx + 2)
                    .unwrap_or(0);
                let scan = view::scan_view(sql[body_start..].trim());
                schema.views.push(ViewInfo { name, scan });
            }
            other => log::trace!("sqlite_schema row with unhandled type {other:?} ({name})"),
        }
    }

    link_indexes_to_tables(&mut schema);
    schema
}

fn link_indexes_to_tables(schema: &mut Schema) {
    for idx_pos in 0..schema.indexes.len() {
        let table_name = schema.indexes[idx_pos].table_name.clone();
        if let Some(table_pos) = schema
            .tables
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(&table_name))
        {
            schema.tables[table_pos].indexes.push(idx_pos);
        }
    }
}

fn col(name: &str, type_name: &str) -> ColumnInfo {
    ColumnInfo {
        name: name.to_string(),
        type_name: type_name.to_string(),
        primary_key: false,
        not_null: false,
        physical_ordinals: vec![0],
        is_guid: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_schema_only_db, write_temp_db, SchemaEntry};

    fn open(entries: &[SchemaEntry]) -> (crate::pager::Pager, String) {
        let bytes = build_schema_only_db(4096, entries);
        let path = write_temp_db(&bytes);
        let pager = crate::pager::Pager::open(&path).expect("should open db");
        (pager, path)
    }

    #[test]
    fn reads_schema_with_table_and_view() {
        let (pager, path) = open(&[
            SchemaEntry {
                kind: "table",
                name: "t1",
                tbl_name: "t1",
                root_page: 2,
                sql: "CREATE TABLE t1 (a INT PRIMARY KEY, b TEXT)",
            },
            SchemaEntry {
                kind: "view",
                name: "v1",
                tbl_name: "v1",
                root_page: 0,
                sql: "CREATE VIEW v1 AS SELECT a, b FROM t1 WHERE a > 0",
            },
        ]);
        let schema = read_schema(&pager);

        assert!(schema.table(crate::SCHEMA_TABLE_NAME).is_some());
        let t1 = schema.table("t1").unwrap();
        assert_eq!(t1.root_page, 2);
        assert_eq!(t1.columns.len(), 2);
        assert!(t1.columns[0].primary_key);

        let v1 = schema.view("v1").unwrap();
        assert_eq!(v1.scan.source_table.as_deref(), Some("t1"));
        assert!(v1.scan.has_where);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn links_index_to_owning_table() {
        let (pager, path) = open(&[
            SchemaEntry {
                kind: "table",
                name: "t1",
                tbl_name: "t1",
                root_page: 2,
                sql: "CREATE TABLE t1 (a INT, b TEXT)",
            },
            SchemaEntry {
                kind: "index",
                name: "idx_b",
                tbl_name: "t1",
                root_page: 3,
                sql: "CREATE INDEX idx_b ON t1 (b)",
            },
        ]);
        let schema = read_schema(&pager);
        let t1 = schema.table("t1").unwrap();
        assert_eq!(t1.indexes.len(), 1);
        assert_eq!(schema.indexes[t1.indexes[0]].name, "idx_b");
        std::fs::remove_file(path).ok();
    }
}
