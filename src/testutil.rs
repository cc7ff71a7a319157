//! In-memory SQLite-format page construction for tests, used instead of
//! checked-in binary fixture files so the B-tree read path and schema
//! reader can be exercised without external `.db` files.

#![cfg(test)]

use crate::value::ColumnValue;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct TableFixture {
    pub name: &'static str,
    pub sql: &'static str,
    pub rows: Vec<(i64, Vec<ColumnValue>)>,
}

/// Builds a single-root-per-table database: page 1 is the schema page, and
/// each table gets exactly one TableLeaf page holding all of its rows (no
/// interior pages, no overflow -- sufficient for exercising the codec and
/// schema reader, not for stress-testing multi-page traversal).
pub fn build_db(page_size: u32, tables: &[TableFixture]) -> Vec<u8> {
    let total_pages = 1 + tables.len();
    let page_size = page_size as usize;
    let mut buf = vec![0u8; page_size * total_pages];

    let mut schema_rows = Vec::new();
    for (i, t) in tables.iter().enumerate() {
        let rootpage = (i + 2) as i64;
        schema_rows.push((
            i as i64 + 1,
            vec![
                ColumnValue::Text("table".into()),
                ColumnValue::Text(t.name.into()),
                ColumnValue::Text(t.name.into()),
                ColumnValue::Integral(rootpage),
                ColumnValue::Text(t.sql.into()),
            ],
        ));
    }
    write_leaf_page(&mut buf[0..page_size], 100, &schema_rows);
    for (i, t) in tables.iter().enumerate() {
        let start = (i + 1) * page_size;
        write_leaf_page(&mut buf[start..start + page_size], 0, &t.rows);
    }
    write_db_header(&mut buf[0..page_size], page_size as u32, total_pages as u32);
    buf
}

fn write_leaf_page(page: &mut [u8], header_offset: usize, rows: &[(i64, Vec<ColumnValue>)]) {
    let page_size = page.len();
    let mut cells = Vec::new();
    for (rowid, cols) in rows {
        let mut record = Vec::new();
        crate::record::encode_record(cols, &mut record);
        let mut cell = Vec::new();
        crate::varint::write_varint(record.len() as i64, &mut cell);
        crate::varint::write_varint(*rowid, &mut cell);
        cell.extend_from_slice(&record);
        cells.push(cell);
    }

    let mut end = page_size;
    let mut cell_offsets = Vec::new();
    for cell in &cells {
        end -= cell.len();
        page[end..end + cell.len()].copy_from_slice(cell);
        cell_offsets.push(end as u16);
    }

    page[header_offset] = 0x0d; // TableLeaf
    page[header_offset + 1..header_offset + 3].copy_from_slice(&0u16.to_be_bytes());
    page[header_offset + 3..header_offset + 5].copy_from_slice(&(rows.len() as u16).to_be_bytes());
    page[header_offset + 5..header_offset + 7].copy_from_slice(&(end as u16).to_be_bytes());
    page[header_offset + 7] = 0;
    let ptr_start = header_offset + 8;
    for (i, off) in cell_offsets.iter().enumerate() {
        let p = ptr_start + i * 2;
        page[p..p + 2].copy_from_slice(&off.to_be_bytes());
    }
}

fn write_db_header(page0: &mut [u8], page_size: u32, numpages: u32) {
    page0[0..16].copy_from_slice(b"SQLite format 3\0");
    let ps_field: u16 = if page_size == 65536 { 1 } else { page_size as u16 };
    page0[16..18].copy_from_slice(&ps_field.to_be_bytes());
    page0[18] = 1;
    page0[19] = 1;
    page0[20] = 0;
    page0[21] = 64;
    page0[22] = 32;
    page0[23] = 32;
    page0[24..28].copy_from_slice(&1u32.to_be_bytes());
    page0[28..32].copy_from_slice(&numpages.to_be_bytes());
    page0[32..36].copy_from_slice(&0u32.to_be_bytes());
    page0[36..40].copy_from_slice(&0u32.to_be_bytes());
    page0[40..44].copy_from_slice(&1u32.to_be_bytes());
    page0[44..48].copy_from_slice(&4u32.to_be_bytes());
    page0[48..52].copy_from_slice(&0u32.to_be_bytes());
    page0[52..56].copy_from_slice(&0u32.to_be_bytes());
    page0[56..60].copy_from_slice(&1u32.to_be_bytes());
    page0[60..64].copy_from_slice(&0u32.to_be_bytes());
    page0[64..68].copy_from_slice(&0u32.to_be_bytes());
    page0[68..72].copy_from_slice(&0u32.to_be_bytes());
    page0[92..96].copy_from_slice(&0u32.to_be_bytes());
    page0[96..100].copy_from_slice(&3_037_000u32.to_be_bytes());
}

/// One `sqlite_schema` row, for tests that only need the schema page itself
/// (e.g. the DDL/view scanners) and never dereference a table's data pages.
pub struct SchemaEntry {
    pub kind: &'static str,
    pub name: &'static str,
    pub tbl_name: &'static str,
    pub root_page: i64,
    pub sql: &'static str,
}

/// Builds a single-page database holding only a `sqlite_schema` leaf with
/// the given rows; referenced root pages are never read.
pub fn build_schema_only_db(page_size: u32, entries: &[SchemaEntry]) -> Vec<u8> {
    let page_size_usize = page_size as usize;
    let mut buf = vec![0u8; page_size_usize];
    let rows: Vec<(i64, Vec<ColumnValue>)> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            (
                i as i64 + 1,
                vec![
                    ColumnValue::Text(e.kind.into()),
                    ColumnValue::Text(e.name.into()),
                    ColumnValue::Text(e.tbl_name.into()),
                    ColumnValue::Integral(e.root_page),
                    ColumnValue::Text(e.sql.into()),
                ],
            )
        })
        .collect();
    write_leaf_page(&mut buf[0..page_size_usize], 100, &rows);
    write_db_header(&mut buf[0..page_size_usize], page_size, 1);
    buf
}

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Writes `bytes` to a fresh temp file and returns its path.
pub fn write_temp_db(bytes: &[u8]) -> String {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "sharqdb_test_{}_{}_{}.db",
        std::process::id(),
        n,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.subsec_nanos())
            .unwrap_or(0)
    ));
    std::fs::write(&path, bytes).expect("should write temp db");
    path.to_str().unwrap().to_string()
}
