//! Manages pages from a file in SQLite's on-disk format, as a concrete,
//! read-only implementation of the page-source collaborator spec.md §6
//! describes (`IPageSource`/`IPageStore`): load-on-demand, same-size pages,
//! no write path.
//!
//! This module (together with `dbheader` and `btree`) is out of spec.md's
//! named scope -- the record codec and predicate matcher are the subject of
//! this crate -- but the B-tree read path needs a concrete page source to
//! exercise against in tests, so the teacher's pager is kept and
//! generalized to the trait spec.md names as an external contract.

use elsa::FrozenVec;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};

/// Page numbers are 1-based, to match how SQLite numbers pages.
pub type PageNum = usize;

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("the page number is higher than the file contains or this code supports")]
    PageNumberBeyondLimits,
    #[error("error reading file")]
    ReadFailed,
    #[error(transparent)]
    Header(#[from] crate::dbheader::Error),
}

/// The `IPageSource` contract spec.md §6 names: read-only, random access to
/// fixed-size pages by 1-based page number.
pub trait IPageSource {
    fn get_page_ro(&self, pn: PageNum) -> Result<&Vec<u8>, Error>;
    fn get_page_size(&self) -> u32;
}

const MAX_PAGE_NUM: PageNum = 10_000_000;

/// A pager manages the file handle and the in-memory page cache for one
/// open database file.
///
/// `btree::table::Iterator` keeps a stack of page references live at once
/// (one per level of the traversal), all borrowed through the same
/// `&dyn IPageSource`, so `get_page_ro` must hand out references tied to a
/// shared `&self` rather than requiring exclusive access per call. `pages`
/// is append-only for that reason: once a page is loaded it is never moved
/// or freed, so `FrozenVec` can hand back a `&Vec<u8>` borrowed from the
/// pager itself, valid for as long as the pager is, without unsafe code.
/// `page_index` maps a page number to its slot, since pages are loaded (and
/// so appended) in request order, not page-number order.
pub struct Pager {
    f: RefCell<std::fs::File>,
    pages: FrozenVec<Box<Vec<u8>>>,
    page_index: RefCell<HashMap<PageNum, usize>>,
    page_size: u32,
}

impl Pager {
    /// Opens `path`, reads and validates the 100-byte database header, and
    /// returns a pager ready to serve pages.
    pub fn open(path: &str) -> Result<Self, Error> {
        let mut f = std::fs::OpenOptions::new()
            .read(true)
            .write(false)
            .create(false)
            .open(path)
            .map_err(|_| Error::ReadFailed)?;
        let header = crate::dbheader::get_header_clone(&mut f)?;
        if header.numpages as usize > MAX_PAGE_NUM {
            return Err(Error::PageNumberBeyondLimits);
        }
        f.seek(SeekFrom::Start(0)).map_err(|_| Error::ReadFailed)?;
        Ok(Pager {
            f: RefCell::new(f),
            pages: FrozenVec::new(),
            page_index: RefCell::new(HashMap::new()),
            page_size: header.pagesize,
        })
    }

    fn read_page_from_file(&self, pn: PageNum) -> Result<Vec<u8>, Error> {
        let mut v = vec![0_u8; self.page_size as usize];
        let mut f = self.f.borrow_mut();
        f.seek(SeekFrom::Start((pn - 1) as u64 * self.page_size as u64))
            .map_err(|_| Error::ReadFailed)?;
        f.read_exact(&mut v[..]).map_err(|_| Error::ReadFailed)?;
        Ok(v)
    }

    /// Returns the slot holding `pn`'s page, loading and appending it on
    /// first access.
    fn ensure_present(&self, pn: PageNum) -> Result<usize, Error> {
        if let Some(&idx) = self.page_index.borrow().get(&pn) {
            return Ok(idx);
        }
        let v = self.read_page_from_file(pn)?;
        let idx = self.pages.len();
        self.pages.push(Box::new(v));
        self.page_index.borrow_mut().insert(pn, idx);
        Ok(idx)
    }
}

impl IPageSource for Pager {
    /// Returns the requested page, loading it from disk on first access.
    fn get_page_ro(&self, pn: PageNum) -> Result<&Vec<u8>, Error> {
        if pn == 0 || pn > MAX_PAGE_NUM {
            return Err(Error::PageNumberBeyondLimits);
        }
        let idx = self.ensure_present(pn)?;
        Ok(self.pages.get(idx).expect("just ensured present"))
    }

    fn get_page_size(&self) -> u32 {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_db, write_temp_db};

    fn minimal_db_path() -> String {
        write_temp_db(&build_db(512, &[]))
    }

    #[test]
    fn opens_and_reads_schema_page() {
        let path = minimal_db_path();
        let pager = Pager::open(&path).expect("should open minimal.db");
        let page = pager.get_page_ro(1).expect("should read page 1");
        assert_eq!(page.len(), pager.get_page_size() as usize);
    }

    #[test]
    fn rejects_page_zero() {
        let path = minimal_db_path();
        let pager = Pager::open(&path).expect("should open minimal.db");
        assert!(pager.get_page_ro(0).is_err());
    }
}
