//! `ColumnValue`: the tagged value produced by decoding a record column and
//! consumed by the query executor and cache encoder. See spec.md §3
//! "ColumnValue".
//!
//! Grounded on the teacher's `sql_value::SqlValue`, generalized with the
//! `UniqueId` storage class spec.md adds for serial type 44 (a GUID/UUID
//! extension), and with `AsX` accessors in the style of `enum-as-inner`
//! (already a teacher dependency, via `ast::SelItem`).

use enum_as_inner::EnumAsInner;

/// A value decoded from (or to be encoded into) a record column body.
///
/// Text/Blob are owned here; the span-based "slice the page" fast paths in
/// `record` hand back `&[u8]`/`&str` directly and only materialize a
/// `ColumnValue` when the caller needs an owned, page-independent value.
#[derive(Debug, Clone, PartialEq, EnumAsInner)]
pub enum ColumnValue {
    Null,
    Integral(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    /// A 16-byte unique identifier (serial type 44).
    UniqueId([u8; 16]),
}

impl ColumnValue {
    /// Returns the value widened to `i64`, for integral storage classes only.
    /// Mirrors the "integral serial types widen to i64" rule used throughout
    /// the raw-byte predicate matcher (spec.md §4.B).
    pub fn as_i64_checked(&self) -> Option<i64> {
        match self {
            ColumnValue::Integral(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value widened to `f64`, for Real or Integral storage
    /// classes (matching the matcher's numeric-comparison semantics).
    pub fn as_f64_checked(&self) -> Option<f64> {
        match self {
            ColumnValue::Real(f) => Some(*f),
            ColumnValue::Integral(i) => Some(*i as f64),
            _ => None,
        }
    }

}

impl std::fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnValue::Null => write!(f, "NULL"),
            ColumnValue::Integral(i) => write!(f, "{i}"),
            ColumnValue::Real(r) => write!(f, "{r}"),
            ColumnValue::Text(s) => write!(f, "{s}"),
            ColumnValue::Blob(_) => write!(f, "<BLOB>"),
            ColumnValue::UniqueId(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_widening_only_applies_to_numeric_variants() {
        assert_eq!(ColumnValue::Integral(7).as_i64_checked(), Some(7));
        assert_eq!(ColumnValue::Text("7".into()).as_i64_checked(), None);
        assert_eq!(ColumnValue::Integral(7).as_f64_checked(), Some(7.0));
        assert_eq!(ColumnValue::Real(1.5).as_f64_checked(), Some(1.5));
        assert_eq!(ColumnValue::Null.as_f64_checked(), None);
    }
}
