use crate::error::{Result, TsError};
use crate::utils::Cursor;
use bytes::{BufMut, BytesMut};

/// Stuffing byte value used to fill adaptation fields
pub const STUFFING_BYTE: u8 = 0xFF;

/// Adaptation field of a TS packet.
///
/// Optional fields are modeled as `Option`s; their presence drives the flag
/// byte on encode. PCR and OPCR are kept as the raw 6-byte fields so packets
/// round-trip bit-exactly; use [`super::timestamp::encode_pcr`] and
/// [`super::timestamp::decode_pcr`] to work with the numeric value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdaptationField {
    /// Discontinuity indicator
    pub discontinuity: bool,
    /// Random access indicator
    pub random_access: bool,
    /// Elementary stream priority indicator
    pub es_priority: bool,
    /// Program Clock Reference, raw 6-byte field
    pub pcr: Option<[u8; 6]>,
    /// Original Program Clock Reference, raw 6-byte field
    pub opcr: Option<[u8; 6]>,
    /// Splice countdown in packets
    pub splice_countdown: Option<i8>,
    /// Transport private data
    pub private_data: Option<Vec<u8>>,
    /// Extension flag; the extension body is accepted on decode but its
    /// contents are discarded
    pub extension: bool,
    /// Number of 0xFF stuffing bytes trailing the field
    pub stuffing_len: usize,
    /// Emit the flags byte even when no flags and no stuffing follow it,
    /// producing the two-byte field some stuffing budgets require
    pub bare_flags: bool,
}

impl AdaptationField {
    fn has_content(&self) -> bool {
        self.discontinuity
            || self.random_access
            || self.es_priority
            || self.pcr.is_some()
            || self.opcr.is_some()
            || self.splice_countdown.is_some()
            || self.private_data.is_some()
            || self.extension
    }

    /// Value of the length byte: bytes in the field body after the length
    /// byte itself. An empty field has length 0.
    pub fn field_length(&self) -> usize {
        if !self.has_content() && self.stuffing_len == 0 && !self.bare_flags {
            return 0;
        }
        let mut n = 1; // flag byte
        if self.pcr.is_some() {
            n += 6;
        }
        if self.opcr.is_some() {
            n += 6;
        }
        if self.splice_countdown.is_some() {
            n += 1;
        }
        if let Some(data) = &self.private_data {
            n += 1 + data.len();
        }
        if self.extension {
            n += 1; // zero-length extension body
        }
        n + self.stuffing_len
    }

    /// Total encoded size including the length byte.
    pub fn encoded_len(&self) -> usize {
        1 + self.field_length()
    }

    /// Grows the stuffing so the encoded field occupies exactly `total`
    /// bytes. A target of 1 keeps the single zero length byte.
    pub fn pad_to(&mut self, total: usize) -> Result<()> {
        let min = self.encoded_len();
        if total < min {
            return Err(TsError::InvalidData(format!(
                "adaptation field needs {min} byte(s), cannot fit in {total}"
            )));
        }
        if total == min {
            return Ok(());
        }
        let extra = total - min;
        if self.field_length() == 0 {
            // growing an empty field brings in the flags byte first
            self.bare_flags = true;
            self.stuffing_len = extra - 1;
        } else {
            self.stuffing_len += extra;
        }
        Ok(())
    }

    /// Writes the length byte followed by the field body.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        let length = self.field_length();
        buf.put_u8(length as u8);
        if length == 0 {
            return Ok(());
        }

        let mut flags = 0u8;
        if self.discontinuity {
            flags |= 0x80;
        }
        if self.random_access {
            flags |= 0x40;
        }
        if self.es_priority {
            flags |= 0x20;
        }
        if self.pcr.is_some() {
            flags |= 0x10;
        }
        if self.opcr.is_some() {
            flags |= 0x08;
        }
        if self.splice_countdown.is_some() {
            flags |= 0x04;
        }
        if self.private_data.is_some() {
            flags |= 0x02;
        }
        if self.extension {
            flags |= 0x01;
        }
        buf.put_u8(flags);

        if let Some(pcr) = &self.pcr {
            buf.put_slice(pcr);
        }
        if let Some(opcr) = &self.opcr {
            buf.put_slice(opcr);
        }
        if let Some(countdown) = self.splice_countdown {
            buf.put_u8(countdown as u8);
        }
        if let Some(data) = &self.private_data {
            buf.put_u8(data.len() as u8);
            buf.put_slice(data);
        }
        if self.extension {
            buf.put_u8(0);
        }
        for _ in 0..self.stuffing_len {
            buf.put_u8(STUFFING_BYTE);
        }

        Ok(())
    }

    /// Decodes the field at the cursor, consuming the length byte and the
    /// declared body.
    pub fn decode(cur: &mut Cursor<'_>) -> Result<Self> {
        let length = cur.read_u8()? as usize;
        let mut field = Self::default();
        if length == 0 {
            return Ok(field);
        }

        let mut body = Cursor::new(cur.read_slice(length)?);
        let flags = body.read_u8()?;
        field.discontinuity = flags & 0x80 != 0;
        field.random_access = flags & 0x40 != 0;
        field.es_priority = flags & 0x20 != 0;

        if flags & 0x10 != 0 {
            let mut pcr = [0u8; 6];
            pcr.copy_from_slice(body.read_slice(6)?);
            field.pcr = Some(pcr);
        }
        if flags & 0x08 != 0 {
            let mut opcr = [0u8; 6];
            opcr.copy_from_slice(body.read_slice(6)?);
            field.opcr = Some(opcr);
        }
        if flags & 0x04 != 0 {
            field.splice_countdown = Some(body.read_u8()? as i8);
        }
        if flags & 0x02 != 0 {
            let len = body.read_u8()? as usize;
            field.private_data = Some(body.read_slice(len)?.to_vec());
        }
        if flags & 0x01 != 0 {
            field.extension = true;
            let len = body.read_u8()? as usize;
            body.skip(len)?;
        }

        field.stuffing_len = body.remaining();
        field.bare_flags = !field.has_content() && field.stuffing_len == 0;
        Ok(field)
    }
}
