//! BIFF12 record stream encoding
//!
//! A record is a type id, a payload length and the payload. Ids use Excel's
//! own continuation scheme: the bytes form a little-endian integer and the
//! high bit of each byte also flags that another byte follows, so the id
//! constants below keep those bits. Lengths are a 7-bit varint.

use std::io::{self, Write};

use crate::error::{XlsbError, XlsbResult};

/// Record ids, as read back by [`Records`]
pub(crate) mod ids {
    // Workbook part
    pub const BEGIN_BOOK: u32 = 0x0183;
    pub const END_BOOK: u32 = 0x0184;
    pub const BEGIN_BUNDLE_SHS: u32 = 0x018F;
    pub const END_BUNDLE_SHS: u32 = 0x0190;
    pub const BUNDLE_SH: u32 = 0x019C;

    // Worksheet parts
    pub const BEGIN_SHEET: u32 = 0x0181;
    pub const END_SHEET: u32 = 0x0182;
    pub const WS_DIM: u32 = 0x0194;
    pub const BEGIN_SHEET_DATA: u32 = 0x0191;
    pub const END_SHEET_DATA: u32 = 0x0192;
    pub const ROW_HDR: u32 = 0x0000;
    pub const CELL_BLANK: u32 = 0x0001;
    pub const CELL_RK: u32 = 0x0002;
    pub const CELL_ERROR: u32 = 0x0003;
    pub const CELL_BOOL: u32 = 0x0004;
    pub const CELL_REAL: u32 = 0x0005;
    pub const CELL_ST: u32 = 0x0006;
    pub const CELL_ISST: u32 = 0x0007;
    pub const FMLA_STRING: u32 = 0x0008;
    pub const FMLA_NUM: u32 = 0x0009;
    pub const FMLA_BOOL: u32 = 0x000A;
    pub const FMLA_ERROR: u32 = 0x000B;

    // Shared strings part
    pub const BEGIN_SST: u32 = 0x019F;
    pub const END_SST: u32 = 0x01A0;
    pub const SST_ITEM: u32 = 0x0013;
}

const MAX_ID_BYTES: usize = 4;
const MAX_LEN_BYTES: usize = 4;
const MAX_LEN: u32 = 0x0FFF_FFFF;

/// Encode a record id.
///
/// Not every `u32` has an encoding; ids that would need a fifth byte or lose
/// high bytes are rejected with `InvalidInput`.
pub(crate) fn write_record_id(w: &mut impl Write, id: u32) -> io::Result<()> {
    let bytes = id.to_le_bytes();

    // Keep emitting bytes while the previous one has its continuation bit set
    let mut n = 1usize;
    while n < MAX_ID_BYTES && bytes[n - 1] & 0x80 != 0 {
        n += 1;
    }

    if (n == MAX_ID_BYTES && bytes[3] & 0x80 != 0) || bytes[n..].iter().any(|&b| b != 0) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("record id 0x{:X} has no BIFF12 encoding", id),
        ));
    }

    w.write_all(&bytes[..n])
}

/// Encode a payload length as a 7-bit varint of at most four bytes
pub(crate) fn write_record_len(w: &mut impl Write, mut len: u32) -> io::Result<()> {
    if len > MAX_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("record length {} exceeds the 28-bit limit", len),
        ));
    }

    loop {
        let mut byte = (len & 0x7F) as u8;
        len >>= 7;
        if len != 0 {
            byte |= 0x80;
        }
        w.write_all(&[byte])?;
        if len == 0 {
            return Ok(());
        }
    }
}

/// Record payload under construction
#[derive(Debug, Default)]
pub(crate) struct Payload {
    bytes: Vec<u8>,
}

impl Payload {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn u8(&mut self, v: u8) -> &mut Self {
        self.bytes.push(v);
        self
    }

    pub(crate) fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub(crate) fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub(crate) fn f64(&mut self, v: f64) -> &mut Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// `XLWideString`: UTF-16 code unit count followed by the units
    pub(crate) fn wide_string(&mut self, s: &str) -> &mut Self {
        let start = self.bytes.len();
        self.u32(0);
        let mut units = 0u32;
        for unit in s.encode_utf16() {
            self.bytes.extend_from_slice(&unit.to_le_bytes());
            units += 1;
        }
        self.bytes[start..start + 4].copy_from_slice(&units.to_le_bytes());
        self
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Writer of a BIFF12 record stream
pub(crate) struct RecordWriter<W: Write> {
    inner: W,
}

impl<W: Write> RecordWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner }
    }

    pub(crate) fn record(&mut self, id: u32, payload: &Payload) -> io::Result<()> {
        let bytes = payload.as_bytes();
        let len = u32::try_from(bytes.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "record payload too large")
        })?;
        write_record_id(&mut self.inner, id)?;
        write_record_len(&mut self.inner, len)?;
        self.inner.write_all(bytes)
    }

    /// A record without payload
    pub(crate) fn marker(&mut self, id: u32) -> io::Result<()> {
        self.record(id, &Payload::new())
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }
}

/// Iterator over the records of an in-memory stream
pub(crate) struct Records<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Records<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = *self.data.get(self.offset)?;
        self.offset += 1;
        Some(b)
    }

    fn read_header(&mut self) -> XlsbResult<(u32, usize)> {
        let mut id = 0u32;
        let mut complete = false;
        for i in 0..MAX_ID_BYTES {
            let byte = self.next_byte().ok_or_else(|| truncated_stream("record id"))?;
            id |= (byte as u32) << (8 * i);
            if byte & 0x80 == 0 {
                complete = true;
                break;
            }
        }
        if !complete {
            return Err(XlsbError::InvalidFormat("record id longer than 4 bytes".into()));
        }

        let mut len = 0u32;
        for i in 0..MAX_LEN_BYTES {
            let byte = self.next_byte().ok_or_else(|| truncated_stream("record length"))?;
            len |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok((id, len as usize));
            }
        }
        Err(XlsbError::InvalidFormat("record length longer than 4 bytes".into()))
    }
}

fn truncated_stream(what: &str) -> XlsbError {
    XlsbError::InvalidFormat(format!("record stream ends inside a {}", what))
}

impl<'a> Iterator for Records<'a> {
    type Item = XlsbResult<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.data.len() {
            return None;
        }

        let result = self.read_header().and_then(|(id, len)| {
            let end = self
                .offset
                .checked_add(len)
                .filter(|end| *end <= self.data.len())
                .ok_or(XlsbError::TruncatedRecord(id))?;
            let all = self.data;
            let data = &all[self.offset..end];
            self.offset = end;
            Ok(Record { id, data, pos: 0 })
        });

        if result.is_err() {
            // Stop after the first framing error
            self.offset = self.data.len();
        }
        Some(result)
    }
}

/// One record and a read cursor over its payload
pub(crate) struct Record<'a> {
    pub id: u32,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Record<'a> {
    fn take(&mut self, n: usize) -> XlsbResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(XlsbError::TruncatedRecord(self.id))?;
        let data = self.data;
        let bytes = &data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub(crate) fn skip(&mut self, n: usize) -> XlsbResult<()> {
        self.take(n).map(|_| ())
    }

    pub(crate) fn u8(&mut self) -> XlsbResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u32(&mut self) -> XlsbResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn f64(&mut self) -> XlsbResult<f64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(f64::from_le_bytes(raw))
    }

    /// `RkNumber`: a 30-bit integer or truncated double, optionally divided by 100
    pub(crate) fn rk(&mut self) -> XlsbResult<f64> {
        let raw = self.u32()?;
        let mut v = if raw & 0x02 != 0 {
            ((raw as i32) >> 2) as f64
        } else {
            f64::from_bits(((raw & 0xFFFF_FFFC) as u64) << 32)
        };
        if raw & 0x01 != 0 {
            v /= 100.0;
        }
        Ok(v)
    }

    /// `XLWideString`
    pub(crate) fn wide_string(&mut self) -> XlsbResult<String> {
        let units = self.u32()? as usize;
        self.utf16(units)
    }

    /// `XLNullableWideString`; the null string reads as `None`
    pub(crate) fn nullable_wide_string(&mut self) -> XlsbResult<Option<String>> {
        let units = self.u32()?;
        if units == u32::MAX {
            return Ok(None);
        }
        self.utf16(units as usize).map(Some)
    }

    fn utf16(&mut self, units: usize) -> XlsbResult<String> {
        let byte_len = units
            .checked_mul(2)
            .ok_or(XlsbError::TruncatedRecord(self.id))?;
        let raw = self.take(byte_len)?;
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(String::from_utf16_lossy(&units))
    }
}

/// Display text of a BIFF error code
pub(crate) fn error_literal(code: u8) -> &'static str {
    match code {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        0x2C => "#SPILL!",
        0x2D => "#CALC!",
        _ => "#UNKNOWN!",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode(id: u32, payload: &Payload) -> Vec<u8> {
        let mut w = RecordWriter::new(Vec::new());
        w.record(id, payload).unwrap();
        w.into_inner()
    }

    #[test]
    fn test_record_id_bytes() {
        let mut out = Vec::new();
        write_record_id(&mut out, ids::ROW_HDR).unwrap();
        write_record_id(&mut out, ids::BUNDLE_SH).unwrap();
        assert_eq!(out, vec![0x00, 0x9C, 0x01]);
    }

    #[test]
    fn test_unencodable_record_id() {
        // 0x0100: first byte has no continuation bit, so the second byte is lost
        assert!(write_record_id(&mut Vec::new(), 0x0100).is_err());
        assert!(write_record_id(&mut Vec::new(), 0x8080_8080).is_err());
    }

    #[test]
    fn test_record_len_bytes() {
        let mut out = Vec::new();
        write_record_len(&mut out, 300).unwrap();
        assert_eq!(out, vec![0xAC, 0x02]);
        assert!(write_record_len(&mut Vec::new(), MAX_LEN + 1).is_err());
    }

    #[test]
    fn test_record_fields() {
        let mut p = Payload::new();
        p.u32(7).wide_string("hé").f64(2.5).u8(1);
        let bytes = encode(ids::CELL_ST, &p);

        let mut records = Records::new(&bytes);
        let mut rec = records.next().unwrap().unwrap();
        assert_eq!(rec.id, ids::CELL_ST);
        assert_eq!(rec.u32().unwrap(), 7);
        assert_eq!(rec.wide_string().unwrap(), "hé");
        assert_eq!(rec.f64().unwrap(), 2.5);
        assert_eq!(rec.u8().unwrap(), 1);
        assert!(matches!(rec.u8(), Err(XlsbError::TruncatedRecord(id)) if id == ids::CELL_ST));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_truncated_stream() {
        let mut bytes = encode(ids::CELL_REAL, Payload::new().f64(1.0));
        bytes.truncate(bytes.len() - 1);

        let mut records = Records::new(&bytes);
        assert!(records.next().unwrap().is_err());
        assert!(records.next().is_none());
    }

    #[test]
    fn test_rk_numbers() {
        let rk = |raw: u32| {
            let bytes = encode(ids::CELL_RK, Payload::new().u32(raw));
            Records::new(&bytes).next().unwrap().unwrap().rk().unwrap()
        };
        // Integer 5
        assert_eq!(rk((5 << 2) | 0x02), 5.0);
        // Integer -3, divided by 100
        assert_eq!(rk((((-3i32) << 2) as u32) | 0x03), -0.03);
        // Truncated double 1.0
        assert_eq!(rk((1.0f64.to_bits() >> 32) as u32), 1.0);
    }

    #[test]
    fn test_nullable_string() {
        let bytes = encode(ids::BUNDLE_SH, Payload::new().u32(u32::MAX));
        let mut rec = Records::new(&bytes).next().unwrap().unwrap();
        assert_eq!(rec.nullable_wide_string().unwrap(), None);
    }

    proptest! {
        #[test]
        fn record_lengths_roundtrip(len in 0usize..5000) {
            let mut p = Payload::new();
            for i in 0..len {
                p.u8(i as u8);
            }
            let bytes = encode(ids::BEGIN_SST, &p);
            let rec = Records::new(&bytes).next().unwrap().unwrap();
            prop_assert_eq!(rec.id, ids::BEGIN_SST);
            prop_assert_eq!(rec.data.len(), len);
        }
    }
}
