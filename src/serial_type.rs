//! Classification of SQLite record-column "serial types": the per-column code
//! in a record header that determines a value's on-disk byte width and how to
//! interpret it. See spec.md §3 "Serial type" and
//! <https://www.sqlite.org/fileformat.html#record_format>.

use crate::value::ColumnValue;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("serial type {0} is reserved and never written by a well-formed database")]
    InvalidSerialType(i64),
}

/// Serial type code for the 16-byte unique-identifier extension (spec.md §3).
pub const UNIQUE_ID: i64 = 44;

/// Returns the number of body bytes a column of this serial type occupies.
///
/// Does not validate that `serial_type` is non-negative; callers that decoded
/// it from a varint are expected to have already rejected negative/malformed
/// input at the header-parsing stage.
pub fn content_size(serial_type: i64) -> Result<usize, Error> {
    Ok(match serial_type {
        0 => 0,
        1 => 1,
        2 => 2,
        3 => 3,
        4 => 4,
        5 => 6,
        6 => 8,
        7 => 8,
        8 | 9 => 0,
        10 | 11 => return Err(Error::InvalidSerialType(serial_type)),
        UNIQUE_ID => 16,
        n if n >= 12 => (n as usize - 12) / 2,
        n => return Err(Error::InvalidSerialType(n)),
    })
}

/// Picks the serial type that would be written for `value`, choosing the
/// narrowest signed-integer width that fits, the constant codes 8/9 for
/// integer 0/1, and the even/odd variable-length codes for Blob/Text.
pub fn serial_type_of(value: &ColumnValue) -> i64 {
    match value {
        ColumnValue::Null => 0,
        ColumnValue::Integral(i) => match *i {
            0 => 8,
            1 => 9,
            v if (-128..=127).contains(&v) => 1,
            v if (-32768..=32767).contains(&v) => 2,
            v if (-8_388_608..=8_388_607).contains(&v) => 3,
            v if (i32::MIN as i64..=i32::MAX as i64).contains(&v) => 4,
            v if (-(1i64 << 47)..(1i64 << 47)).contains(&v) => 5,
            _ => 6,
        },
        ColumnValue::Real(_) => 7,
        ColumnValue::Blob(b) => 12 + 2 * b.len() as i64,
        ColumnValue::Text(t) => 13 + 2 * t.len() as i64,
        ColumnValue::UniqueId(_) => UNIQUE_ID,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_sizes_match_the_sqlite_table() {
        assert_eq!(content_size(0).unwrap(), 0);
        assert_eq!(content_size(1).unwrap(), 1);
        assert_eq!(content_size(4).unwrap(), 4);
        assert_eq!(content_size(5).unwrap(), 6);
        assert_eq!(content_size(6).unwrap(), 8);
        assert_eq!(content_size(7).unwrap(), 8);
        assert_eq!(content_size(8).unwrap(), 0);
        assert_eq!(content_size(9).unwrap(), 0);
        assert!(content_size(10).is_err());
        assert!(content_size(11).is_err());
        assert_eq!(content_size(12).unwrap(), 0); // empty blob
        assert_eq!(content_size(13).unwrap(), 0); // empty text
        assert_eq!(content_size(23).unwrap(), 5); // "hello"
        assert_eq!(content_size(UNIQUE_ID).unwrap(), 16);
    }

    #[test]
    fn serial_type_of_picks_narrowest_integer_width() {
        assert_eq!(serial_type_of(&ColumnValue::Integral(0)), 8);
        assert_eq!(serial_type_of(&ColumnValue::Integral(1)), 9);
        assert_eq!(serial_type_of(&ColumnValue::Integral(42)), 1);
        assert_eq!(serial_type_of(&ColumnValue::Integral(300)), 2);
        assert_eq!(serial_type_of(&ColumnValue::Integral(1 << 20)), 3);
        assert_eq!(serial_type_of(&ColumnValue::Integral(1 << 30)), 4);
        assert_eq!(serial_type_of(&ColumnValue::Integral(1i64 << 40)), 5);
        assert_eq!(serial_type_of(&ColumnValue::Integral(i64::MAX)), 6);
    }

    #[test]
    fn serial_type_of_text_and_blob_are_odd_and_even() {
        assert_eq!(serial_type_of(&ColumnValue::Text("hello".into())), 23);
        assert_eq!(serial_type_of(&ColumnValue::Blob(vec![1, 2, 3])), 18);
    }
}
