use super::cell;
use super::RowId;

/// Iterates over the cells of a single TableLeaf page, decoding each cell's
/// payload-length and rowid varints and yielding `(rowid, record_bytes)`.
pub struct Iterator<'a> {
    ci: cell::Iterator<'a>,
}

impl<'a> Iterator<'a> {
    /// Wraps a raw cell iterator for a page already known to be TableLeaf.
    pub fn new(ci: cell::Iterator<'a>) -> Iterator<'a> {
        Iterator { ci }
    }
}

impl<'a> core::iter::Iterator for Iterator<'a> {
    // Overflowing payloads are not supported.
    type Item = (RowId, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let cell = self.ci.next()?;
        let mut offset = 0;
        let (payload_len, bytesread) = crate::varint::read_varint(cell);
        offset += bytesread;
        let (rowid, bytesread2) = crate::varint::read_varint(&cell[offset..]);
        offset += bytesread2;
        if cell.len() - offset != (payload_len as usize) {
            unimplemented!("Spilled payloads not implemented.");
        }
        Some((rowid as RowId, &cell[offset..]))
    }
}

#[cfg(test)]
mod tests {
    use crate::pager::IPageSource;
    use crate::testutil::{build_db, write_temp_db, TableFixture};
    use crate::value::ColumnValue;

    #[test]
    fn iterates_single_leaf_page() {
        let bytes = build_db(
            4096,
            &[TableFixture {
                name: "a",
                sql: "CREATE TABLE a (x text)",
                rows: vec![(1, vec![ColumnValue::Text("hi".into())])],
            }],
        );
        let path = write_temp_db(&bytes);
        let pager = crate::pager::Pager::open(&path).expect("should open fixture db");
        let pgnum = crate::get_creation_sql_and_root_pagenum(&pager, "a")
            .expect("should find table a")
            .0;
        let page = pager.get_page_ro(pgnum).unwrap();
        let hdr = crate::btree::header::check_header(page, 0);
        assert!(matches!(hdr.btree_page_type, crate::btree::PageType::TableLeaf));

        let ci = crate::btree::cell::Iterator::new(page, 0, pager.get_page_size());
        let mut li = super::Iterator::new(ci);
        let first = li.next();
        assert!(first.is_some());
        assert_eq!(first.unwrap().0, 1);
        assert!(li.next().is_none());
        std::fs::remove_file(path).ok();
    }
}
