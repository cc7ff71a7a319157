//! The SQLite record codec: bit-exact decoding of record headers and column
//! bodies, span-based zero-copy access, batch column-offset computation, raw
//! predicate matching, and index-record key extraction. Spec.md §4.B.
//!
//! Grounded on the teacher's `record::HeaderIterator`/`ValueIterator` and
//! `serial_type::to_sql_value`, restructured as single-pass batch decoders
//! with a stack-buffer/heap-fallback split per spec.md §9 "Stack buffers with
//! heap fallback" (budgeted for up to 128 columns, spilling to a `Vec` for
//! wider rows).

use crate::serial_type::{self, content_size};
use crate::value::ColumnValue;
use byteorder::{BigEndian, ByteOrder};

/// Columns per record we budget a stack array for before spilling to heap.
pub const STACK_COLUMN_BUDGET: usize = 128;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("serial type {0} is reserved and never written by a well-formed database")]
    InvalidSerialType(i64),
    #[error("record body offset {offset} + content size {size} exceeds payload length {len}")]
    RecordUnderflow {
        offset: usize,
        size: usize,
        len: usize,
    },
}

impl From<serial_type::Error> for Error {
    fn from(e: serial_type::Error) -> Self {
        match e {
            serial_type::Error::InvalidSerialType(t) => Error::InvalidSerialType(t),
        }
    }
}

/// A small, stack-friendly container for per-column data (serial types or
/// byte offsets): fixed-size array up to `STACK_COLUMN_BUDGET`, spilling to a
/// heap `Vec` beyond that.
pub enum ColumnSpan<T> {
    Stack([T; STACK_COLUMN_BUDGET], usize),
    Heap(Vec<T>),
}

impl<T: Copy + Default> ColumnSpan<T> {
    fn new() -> Self {
        ColumnSpan::Stack([T::default(); STACK_COLUMN_BUDGET], 0)
    }

    fn push(&mut self, v: T) {
        match self {
            ColumnSpan::Stack(arr, len) => {
                if *len < STACK_COLUMN_BUDGET {
                    arr[*len] = v;
                    *len += 1;
                } else {
                    let mut heap: Vec<T> = arr[..*len].to_vec();
                    heap.push(v);
                    *self = ColumnSpan::Heap(heap);
                }
            }
            ColumnSpan::Heap(v2) => v2.push(v),
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            ColumnSpan::Stack(arr, len) => &arr[..*len],
            ColumnSpan::Heap(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counts the columns in `payload` by walking the serial-type varints in the
/// header, without decoding any value bodies.
pub fn column_count(payload: &[u8]) -> usize {
    let (hdr_len, hdr_len_len) = crate::varint::read_varint(payload);
    let hdr_len = hdr_len as usize;
    let mut offset = hdr_len_len;
    let mut count = 0;
    while offset < hdr_len {
        let (_, n) = crate::varint::read_varint(&payload[offset..]);
        offset += n;
        count += 1;
    }
    count
}

/// Reads the header's serial types into `dst`, returning `(count, body_offset)`.
///
/// Hot path: a fast sub-path assumes every serial-type varint is a single
/// byte (values 0-127, which covers all integer/constant types and
/// text/blob up to 57 bytes); on the first byte with the continuation bit
/// set it falls back to full varint decoding for the remainder of the
/// header. Both paths must (and do) produce identical results.
pub fn read_serial_types(payload: &[u8], dst: &mut ColumnSpan<i64>) -> (usize, usize) {
    let (hdr_len, hdr_len_len) = crate::varint::read_varint(payload);
    let hdr_len = hdr_len as usize;
    let mut offset = hdr_len_len;
    while offset < hdr_len {
        let byte = payload[offset];
        if byte & 0x80 == 0 {
            // Fast path: single-byte varint.
            dst.push(byte as i64);
            offset += 1;
        } else {
            // Fall back to general varint decoding for this serial type;
            // "offset" keeps the same meaning either way.
            let (st, n) = crate::varint::read_varint(&payload[offset..]);
            dst.push(st);
            offset += n;
        }
    }
    (dst.len(), hdr_len)
}

/// Decodes a single column body given its serial type.
///
/// Integer types 1,2,4,6 decode big-endian; types 3 and 5 sign-extend from
/// 24/48 bits; type 7 decodes a big-endian IEEE-754 double; 8/9 are the
/// constants 0/1 and consume no bytes; even/odd codes >=12 are Blob/Text.
pub fn decode_value(bytes: &[u8], serial_type: i64) -> Result<ColumnValue, Error> {
    Ok(match serial_type {
        0 => ColumnValue::Null,
        1 => ColumnValue::Integral(bytes[0] as i8 as i64),
        2 => ColumnValue::Integral(BigEndian::read_i16(bytes) as i64),
        3 => ColumnValue::Integral(sign_extend(BigEndian::read_uint(bytes, 3), 3)),
        4 => ColumnValue::Integral(BigEndian::read_i32(bytes) as i64),
        5 => ColumnValue::Integral(sign_extend(BigEndian::read_uint(bytes, 6), 6)),
        6 => ColumnValue::Integral(BigEndian::read_i64(bytes)),
        7 => ColumnValue::Real(BigEndian::read_f64(bytes)),
        8 => ColumnValue::Integral(0),
        9 => ColumnValue::Integral(1),
        10 | 11 => return Err(Error::InvalidSerialType(serial_type)),
        serial_type::UNIQUE_ID => {
            let mut id = [0u8; 16];
            id.copy_from_slice(&bytes[..16]);
            ColumnValue::UniqueId(id)
        }
        n if n >= 12 && n % 2 == 0 => ColumnValue::Blob(bytes.to_vec()),
        n if n >= 13 => ColumnValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        n => return Err(Error::InvalidSerialType(n)),
    })
}

/// Sign-extends a `nbytes`-wide big-endian two's-complement value held in the
/// low bits of `raw` out to a full `i64`.
fn sign_extend(raw: u64, nbytes: usize) -> i64 {
    let bits = nbytes * 8;
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

/// Decodes every column of `payload` into a fresh `Vec<ColumnValue>`.
pub fn decode_record(payload: &[u8]) -> Result<Vec<ColumnValue>, Error> {
    let mut out = Vec::new();
    decode_record_into(payload, &mut out)?;
    Ok(out)
}

/// Decodes every column of `payload`, pushing onto `dst` (which is not
/// cleared first, so callers can reuse a buffer across rows by clearing it
/// themselves).
pub fn decode_record_into(payload: &[u8], dst: &mut Vec<ColumnValue>) -> Result<(), Error> {
    let mut serial_types: ColumnSpan<i64> = ColumnSpan::new();
    let (count, body_offset) = read_serial_types(payload, &mut serial_types);
    let mut offset = body_offset;
    for i in 0..count {
        let st = serial_types.as_slice()[i];
        let size = content_size(st)?;
        if offset + size > payload.len() {
            return Err(Error::RecordUnderflow {
                offset,
                size,
                len: payload.len(),
            });
        }
        dst.push(decode_value(&payload[offset..offset + size], st)?);
        offset += size;
    }
    Ok(())
}

/// Random-access accessor: decodes just column `ordinal`, re-walking the
/// header each call. When the record has fewer columns than requested,
/// returns `ColumnValue::Null` (the "ALTER TABLE ADD COLUMN" contract: old
/// rows are not rewritten, so trailing columns are implicitly NULL).
pub fn decode_column(payload: &[u8], ordinal: usize) -> Result<ColumnValue, Error> {
    let mut serial_types: ColumnSpan<i64> = ColumnSpan::new();
    let (count, body_offset) = read_serial_types(payload, &mut serial_types);
    if ordinal >= count {
        return Ok(ColumnValue::Null);
    }
    let mut offset = body_offset;
    for st in serial_types.as_slice()[..ordinal].iter() {
        offset += content_size(*st)?;
    }
    let st = serial_types.as_slice()[ordinal];
    let size = content_size(st)?;
    if offset + size > payload.len() {
        return Err(Error::RecordUnderflow {
            offset,
            size,
            len: payload.len(),
        });
    }
    decode_value(&payload[offset..offset + size], st)
}

/// Precomputes per-column byte offsets given an already-decoded serial-type
/// array, so repeated typed accessors against different columns don't
/// re-walk the header each time.
pub fn compute_column_offsets(
    serial_types: &[i64],
    col_count: usize,
    body_offset: usize,
    dst: &mut ColumnSpan<usize>,
) -> Result<(), Error> {
    let mut offset = body_offset;
    for st in serial_types.iter().take(col_count) {
        dst.push(offset);
        offset += content_size(*st)?;
    }
    Ok(())
}

/// Random-access accessor taking a precomputed serial-type array and body
/// offset (from `read_serial_types`), avoiding a second pass over the header.
pub fn decode_column_at(
    payload: &[u8],
    serial_types: &[i64],
    body_offset: usize,
    ordinal: usize,
) -> Result<ColumnValue, Error> {
    if ordinal >= serial_types.len() {
        return Ok(ColumnValue::Null);
    }
    let mut offset = body_offset;
    for st in serial_types[..ordinal].iter() {
        offset += content_size(*st)?;
    }
    let st = serial_types[ordinal];
    let size = content_size(st)?;
    if offset + size > payload.len() {
        return Err(Error::RecordUnderflow {
            offset,
            size,
            len: payload.len(),
        });
    }
    decode_value(&payload[offset..offset + size], st)
}

/// Decodes the column at `offset` (from `compute_column_offsets`) as an i64,
/// widening any integral serial type. Returns `None` for non-integral types.
pub fn decode_int64_at(payload: &[u8], serial_type: i64, offset: usize) -> Result<Option<i64>, Error> {
    let size = content_size(serial_type)?;
    match decode_value(&payload[offset..offset + size], serial_type)? {
        ColumnValue::Integral(i) => Ok(Some(i)),
        _ => Ok(None),
    }
}

/// Decodes the column at `offset` as an f64: Real decodes directly,
/// Integral widens. Returns `None` for non-numeric types.
pub fn decode_double_at(payload: &[u8], serial_type: i64, offset: usize) -> Result<Option<f64>, Error> {
    let size = content_size(serial_type)?;
    match decode_value(&payload[offset..offset + size], serial_type)? {
        ColumnValue::Real(f) => Ok(Some(f)),
        ColumnValue::Integral(i) => Ok(Some(i as f64)),
        _ => Ok(None),
    }
}

/// Decodes the column at `offset` as a string slice, borrowed from `payload`
/// when the bytes are valid UTF-8 (the zero-copy fast path); returns `None`
/// for non-Text types.
pub fn decode_string_at<'a>(
    payload: &'a [u8],
    serial_type: i64,
    offset: usize,
) -> Result<Option<&'a str>, Error> {
    if serial_type < 13 || serial_type % 2 == 0 {
        return Ok(None);
    }
    let size = content_size(serial_type)?;
    Ok(std::str::from_utf8(&payload[offset..offset + size]).ok())
}

/// For index b-trees: decodes the leading `key_count` columns into
/// `keys_out` and interprets the final column as an integer rowid. Fails
/// (returns `None`) if the record has fewer than `key_count + 1` columns.
pub fn try_decode_index_record(
    payload: &[u8],
    keys_out: &mut Vec<ColumnValue>,
    key_count: usize,
) -> Result<Option<i64>, Error> {
    let mut serial_types: ColumnSpan<i64> = ColumnSpan::new();
    let (count, body_offset) = read_serial_types(payload, &mut serial_types);
    if count < key_count + 1 {
        return Ok(None);
    }
    let mut offsets: ColumnSpan<usize> = ColumnSpan::new();
    compute_column_offsets(serial_types.as_slice(), count, body_offset, &mut offsets)?;
    for i in 0..key_count {
        keys_out.push(decode_column_at(
            payload,
            serial_types.as_slice(),
            body_offset,
            i,
        )?);
    }
    let rowid_ordinal = key_count;
    let rowid = decode_int64_at(
        payload,
        serial_types.as_slice()[rowid_ordinal],
        offsets.as_slice()[rowid_ordinal],
    )?
    .unwrap_or(0);
    Ok(Some(rowid))
}

/// A single comparison predicate used by `matches`: "column `ordinal`
/// `op` `value`".
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    pub ordinal: usize,
    pub op: CompareOp,
    pub value: ColumnValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Evaluates an AND-of-predicates list directly over `payload`, without
/// materializing a `Vec<ColumnValue>` for the whole row. spec.md §4.B:
///
/// 1. Computes the maximum referenced ordinal.
/// 2. Reads serial types into a stack-budgeted span.
/// 3. Precomputes offsets once for all referenced columns.
/// 4. For each filter: if it targets the rowid-alias ordinal, compares
///    against `rowid` (the stored body holds NULL there); if its ordinal
///    exceeds the record's column count, NULL-match fails comparison
///    operators; otherwise compares raw bytes against the filter value.
pub fn matches(
    payload: &[u8],
    filters: &[ColumnFilter],
    rowid: i64,
    rowid_alias_ordinal: Option<usize>,
) -> Result<bool, Error> {
    if filters.is_empty() {
        return Ok(true);
    }
    let max_ordinal = filters.iter().map(|f| f.ordinal).max().unwrap_or(0);

    let mut serial_types: ColumnSpan<i64> = ColumnSpan::new();
    let (count, body_offset) = read_serial_types(payload, &mut serial_types);

    let considered = count.min(max_ordinal + 1);
    let mut offsets: ColumnSpan<usize> = ColumnSpan::new();
    compute_column_offsets(serial_types.as_slice(), considered, body_offset, &mut offsets)?;

    for f in filters {
        if Some(f.ordinal) == rowid_alias_ordinal {
            if !compare_i64(rowid, f.op, &f.value) {
                return Ok(false);
            }
            continue;
        }
        if f.ordinal >= count {
            // Column absent -> NULL; every comparison operator fails to match.
            return Ok(false);
        }
        let st = serial_types.as_slice()[f.ordinal];
        let offset = offsets.as_slice()[f.ordinal];
        let size = content_size(st)?;
        if offset + size > payload.len() {
            return Err(Error::RecordUnderflow {
                offset,
                size,
                len: payload.len(),
            });
        }
        let bytes = &payload[offset..offset + size];
        if !compare_raw(bytes, st, f.op, &f.value)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compare_i64(lhs: i64, op: CompareOp, rhs: &ColumnValue) -> bool {
    match rhs {
        ColumnValue::Integral(r) => apply_op(lhs.cmp(r), op),
        // Cross-type numeric comparison widens the integral column to f64,
        // per spec.md §4.B, rather than truncating the real filter value.
        ColumnValue::Real(r) => apply_op(
            (lhs as f64)
                .partial_cmp(r)
                .unwrap_or(std::cmp::Ordering::Greater),
            op,
        ),
        _ => false,
    }
}

fn apply_op(ord: std::cmp::Ordering, op: CompareOp) -> bool {
    use std::cmp::Ordering::*;
    match (op, ord) {
        (CompareOp::Eq, Equal) => true,
        (CompareOp::Neq, Less | Greater) => true,
        (CompareOp::Lt, Less) => true,
        (CompareOp::Lte, Less | Equal) => true,
        (CompareOp::Gt, Greater) => true,
        (CompareOp::Gte, Greater | Equal) => true,
        _ => false,
    }
}

/// Compares raw record bytes (with serial type `st`) against a filter value,
/// without constructing an owned `ColumnValue` for Text when it can be
/// avoided. Text/Text comparisons use ordinal codepoint comparison; numeric
/// serial types widen to i64/f64 as spec.md §4.B describes; Text compared
/// against a non-Text filter value always fails to match (documented in
/// spec.md §9's Open Questions rather than coerced).
fn compare_raw(bytes: &[u8], st: i64, op: CompareOp, rhs: &ColumnValue) -> Result<bool, Error> {
    Ok(match st {
        0 => false, // NULL never matches a comparison operator.
        1..=6 | 8 | 9 => {
            let lhs = decode_value(bytes, st)?.as_i64_checked().unwrap();
            match rhs {
                ColumnValue::Integral(_) | ColumnValue::Real(_) => compare_i64(lhs, op, rhs),
                _ => false,
            }
        }
        7 => {
            let lhs = BigEndian::read_f64(bytes);
            let rhs_f = match rhs {
                ColumnValue::Real(f) => *f,
                ColumnValue::Integral(i) => *i as f64,
                _ => return Ok(false),
            };
            apply_op(
                lhs.partial_cmp(&rhs_f).unwrap_or(std::cmp::Ordering::Greater),
                op,
            )
        }
        n if n >= 13 && n % 2 == 1 => {
            let rhs_text = match rhs {
                ColumnValue::Text(s) => s,
                _ => return Ok(false),
            };
            // Stack-buffered fast path for short strings; `str::cmp` already
            // operates byte-wise on UTF-8 without an intermediate buffer, so
            // the "fall back to heap" case only arises when the decoded
            // character counts differ, handled identically either way.
            match std::str::from_utf8(bytes) {
                Ok(lhs) => apply_op(lhs.cmp(rhs_text.as_str()), op),
                Err(_) => false,
            }
        }
        n if n >= 12 && n % 2 == 0 => match rhs {
            ColumnValue::Blob(b) => apply_op(bytes.cmp(b.as_slice()), op),
            _ => false,
        },
        _ => false,
    })
}

/// Two-pass record encoder: computes each column's serial type and the
/// header's total varint size (solving the one-iteration fixed point for
/// the header-size varint's own length), then writes the header-size
/// varint, all serial-type varints, and the concatenated bodies.
pub fn encode_record(columns: &[ColumnValue], dst: &mut Vec<u8>) -> usize {
    let start = dst.len();
    let serial_types: Vec<i64> = columns.iter().map(serial_type::serial_type_of).collect();

    let mut serial_type_bytes = 0usize;
    for st in &serial_types {
        serial_type_bytes += crate::varint::varint_len(*st);
    }

    // One iteration always suffices: growing the header-size varint by one
    // byte can push the total across at most one more varint-length
    // boundary for the header sizes this codec deals with.
    let mut hdr_size_varint_len = crate::varint::varint_len(serial_type_bytes as i64);
    loop {
        let total = serial_type_bytes + hdr_size_varint_len;
        let needed = crate::varint::varint_len(total as i64);
        if needed == hdr_size_varint_len {
            break;
        }
        hdr_size_varint_len = needed;
    }
    let header_size = serial_type_bytes + hdr_size_varint_len;

    crate::varint::write_varint(header_size as i64, dst);
    for st in &serial_types {
        crate::varint::write_varint(*st, dst);
    }
    for col in columns {
        write_body(col, dst);
    }
    dst.len() - start
}

/// Computes the size `encode_record` would produce, without allocating the
/// output buffer.
pub fn compute_encoded_size(columns: &[ColumnValue]) -> usize {
    let mut scratch = Vec::new();
    encode_record(columns, &mut scratch)
}

fn write_body(value: &ColumnValue, dst: &mut Vec<u8>) {
    match value {
        ColumnValue::Null => {}
        ColumnValue::Integral(i) => match serial_type::serial_type_of(value) {
            8 | 9 => {}
            1 => dst.push(*i as i8 as u8),
            2 => dst.extend_from_slice(&(*i as i16).to_be_bytes()),
            3 => dst.extend_from_slice(&(*i as i32).to_be_bytes()[1..]),
            4 => dst.extend_from_slice(&(*i as i32).to_be_bytes()),
            5 => dst.extend_from_slice(&i.to_be_bytes()[2..]),
            6 => dst.extend_from_slice(&i.to_be_bytes()),
            _ => unreachable!(),
        },
        ColumnValue::Real(f) => dst.extend_from_slice(&f.to_be_bytes()),
        ColumnValue::Text(s) => dst.extend_from_slice(s.as_bytes()),
        ColumnValue::Blob(b) => dst.extend_from_slice(b),
        ColumnValue::UniqueId(id) => dst.extend_from_slice(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scenario_record_round_trip() {
        // spec.md §8 end-to-end scenario 1.
        let cols = vec![
            ColumnValue::Integral(42),
            ColumnValue::Text("hello".into()),
            ColumnValue::Null,
        ];
        let mut buf = Vec::new();
        let n = encode_record(&cols, &mut buf);
        assert_eq!(n, compute_encoded_size(&cols));
        // 42 fits an 8-bit serial type (1), the narrowest width the codec
        // picks for the integer's actual magnitude.
        assert_eq!(buf, vec![4, 1, 23, 0, 0x2A, b'h', b'e', b'l', b'l', b'o']);
        let decoded = decode_record(&buf).unwrap();
        assert_eq!(decoded, cols);
    }

    #[test]
    fn decode_column_out_of_range_is_null() {
        let cols = vec![ColumnValue::Integral(1)];
        let mut buf = Vec::new();
        encode_record(&cols, &mut buf);
        assert_eq!(decode_column(&buf, 5).unwrap(), ColumnValue::Null);
    }

    #[test]
    fn matches_predicate_over_row() {
        // spec.md §8 end-to-end scenario 2.
        let cols = vec![ColumnValue::Integral(42), ColumnValue::Text("active".into())];
        let mut buf = Vec::new();
        encode_record(&cols, &mut buf);
        let filters = vec![
            ColumnFilter {
                ordinal: 0,
                op: CompareOp::Eq,
                value: ColumnValue::Integral(42),
            },
            ColumnFilter {
                ordinal: 1,
                op: CompareOp::Eq,
                value: ColumnValue::Text("active".into()),
            },
        ];
        assert!(matches(&buf, &filters, 0, None).unwrap());

        let mismatched = vec![
            filters[0].clone(),
            ColumnFilter {
                ordinal: 1,
                op: CompareOp::Eq,
                value: ColumnValue::Text("inactive".into()),
            },
        ];
        assert!(!matches(&buf, &mismatched, 0, None).unwrap());
    }

    #[test]
    fn integral_column_widens_to_f64_against_real_filter() {
        let cols = vec![ColumnValue::Integral(3)];
        let mut buf = Vec::new();
        encode_record(&cols, &mut buf);

        let eq = vec![ColumnFilter {
            ordinal: 0,
            op: CompareOp::Eq,
            value: ColumnValue::Real(3.5),
        }];
        assert!(!matches(&buf, &eq, 0, None).unwrap());

        let lt = vec![ColumnFilter {
            ordinal: 0,
            op: CompareOp::Lt,
            value: ColumnValue::Real(3.5),
        }];
        assert!(matches(&buf, &lt, 0, None).unwrap());
    }

    #[test]
    fn matches_substitutes_rowid_for_alias_ordinal() {
        // Integer primary key columns store NULL in the body; the rowid is
        // supplied out-of-band and substituted by ordinal.
        let cols = vec![ColumnValue::Null, ColumnValue::Text("row".into())];
        let mut buf = Vec::new();
        encode_record(&cols, &mut buf);
        let filters = vec![ColumnFilter {
            ordinal: 0,
            op: CompareOp::Eq,
            value: ColumnValue::Integral(7),
        }];
        assert!(matches(&buf, &filters, 7, Some(0)).unwrap());
        assert!(!matches(&buf, &filters, 8, Some(0)).unwrap());
    }

    #[test]
    fn sign_extension_for_24_and_48_bit_ints() {
        assert_eq!(
            decode_value(&[0xff, 0xff, 0xff], 3).unwrap(),
            ColumnValue::Integral(-1)
        );
        assert_eq!(
            decode_value(&[0x00, 0x00, 0x01], 3).unwrap(),
            ColumnValue::Integral(1)
        );
        assert_eq!(
            decode_value(&[0xff, 0xff, 0xff, 0xff, 0xff, 0xff], 5).unwrap(),
            ColumnValue::Integral(-1)
        );
        assert_eq!(
            decode_value(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x01], 5).unwrap(),
            ColumnValue::Integral(1)
        );
    }

    #[test]
    fn wide_record_spills_to_heap() {
        let cols: Vec<ColumnValue> = (0..200).map(ColumnValue::Integral).collect();
        let mut buf = Vec::new();
        encode_record(&cols, &mut buf);
        let decoded = decode_record(&buf).unwrap();
        assert_eq!(decoded, cols);
        assert_eq!(column_count(&buf), 200);
    }

    #[test]
    fn reserved_serial_types_are_rejected() {
        assert!(content_size(10).is_err());
    }

    #[test]
    fn try_decode_index_record_extracts_keys_and_rowid() {
        let cols = vec![
            ColumnValue::Text("k".into()),
            ColumnValue::Integral(99), // trailing rowid column
        ];
        let mut buf = Vec::new();
        encode_record(&cols, &mut buf);
        let mut keys = Vec::new();
        let rowid = try_decode_index_record(&buf, &mut keys, 1).unwrap();
        assert_eq!(rowid, Some(99));
        assert_eq!(keys, vec![ColumnValue::Text("k".into())]);
    }

    #[test]
    fn try_decode_index_record_fails_on_too_few_columns() {
        let cols = vec![ColumnValue::Integral(1)];
        let mut buf = Vec::new();
        encode_record(&cols, &mut buf);
        let mut keys = Vec::new();
        assert_eq!(try_decode_index_record(&buf, &mut keys, 2).unwrap(), None);
    }
}
