use super::TABLE_ID_PAT;
use crate::error::{Result, TsError};
use crate::utils::Crc32Mpeg2;
use bytes::{BufMut, BytesMut};

/// One association in the PAT.
///
/// Program number 0 maps to the network PID; any other program number maps
/// to the PID of that program's PMT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PATEntry {
    /// Program number (16 bits), 0 reserved for the network PID
    pub program_number: u16,
    /// Associated PID (13 bits)
    pub pid: u16,
}

impl PATEntry {
    /// True when this entry carries the network PID rather than a PMT PID.
    pub fn is_network(&self) -> bool {
        self.program_number == 0
    }
}

/// Program Association Table section.
///
/// Reserved bits are not stored; encoding canonicalizes them to ones and
/// computes the section length and CRC32 trailer from the entry list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PAT {
    /// Transport stream id (16 bits)
    pub transport_stream_id: u16,
    /// Table version (5 bits)
    pub version: u8,
    /// Current/next indicator
    pub current_next: bool,
    /// Section number
    pub section_number: u8,
    /// Last section number
    pub last_section_number: u8,
    /// Program associations
    pub entries: Vec<PATEntry>,
}

impl PAT {
    /// Section length value: bytes after the length field, CRC included.
    pub fn section_length(&self) -> u16 {
        (9 + 4 * self.entries.len()) as u16
    }

    /// Writes the full section including the CRC32 trailer.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        let start = buf.len();
        let section_length = self.section_length();

        buf.put_u8(TABLE_ID_PAT);
        buf.put_u8(0xB0 | ((section_length >> 8) as u8 & 0x0F));
        buf.put_u8(section_length as u8);
        buf.put_u16(self.transport_stream_id);
        let mut ver = 0xC0 | ((self.version << 1) & 0x3E);
        if self.current_next {
            ver |= 0x01;
        }
        buf.put_u8(ver);
        buf.put_u8(self.section_number);
        buf.put_u8(self.last_section_number);

        for entry in &self.entries {
            buf.put_u16(entry.program_number);
            buf.put_u16(0xE000 | (entry.pid & 0x1FFF));
        }

        let crc = Crc32Mpeg2::new().calculate(&buf[start..]);
        buf.put_u32(crc);
        Ok(())
    }

    /// Decodes a section and verifies its CRC32 trailer.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 12 {
            return Err(TsError::InvalidData("PAT section too short".into()));
        }
        if data[0] != TABLE_ID_PAT {
            return Err(TsError::InvalidData(format!(
                "invalid PAT table id: 0x{:02x}",
                data[0]
            )));
        }

        let section_length = (((data[1] & 0x0F) as usize) << 8) | data[2] as usize;
        let total = 3 + section_length;
        if section_length < 9 || data.len() < total {
            return Err(TsError::InvalidData(
                "PAT data shorter than section length".into(),
            ));
        }

        let entry_count = (section_length * 8 - 72) / 32;
        let mut entries = Vec::with_capacity(entry_count);
        let mut pos = 8;
        for _ in 0..entry_count {
            let program_number = u16::from_be_bytes([data[pos], data[pos + 1]]);
            let pid = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) & 0x1FFF;
            entries.push(PATEntry {
                program_number,
                pid,
            });
            pos += 4;
        }

        let crc = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        if crc != Crc32Mpeg2::new().calculate(&data[..pos]) {
            return Err(TsError::InvalidData("PAT CRC mismatch".into()));
        }

        Ok(Self {
            transport_stream_id: u16::from_be_bytes([data[3], data[4]]),
            version: (data[5] >> 1) & 0x1F,
            current_next: data[5] & 0x01 != 0,
            section_number: data[6],
            last_section_number: data[7],
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn one_program_pat() -> PAT {
        PAT {
            transport_stream_id: 1,
            version: 0,
            current_next: true,
            section_number: 0,
            last_section_number: 0,
            entries: vec![PATEntry {
                program_number: 1,
                pid: 0x1000,
            }],
        }
    }

    #[test]
    fn test_one_program_encoding() {
        let mut buf = BytesMut::new();
        one_program_pat().write_to(&mut buf).unwrap();

        assert_eq!(
            &buf[..],
            &[
                0x00, 0xB0, 0x0D, 0x00, 0x01, 0xC1, 0x00, 0x00, // fixed header
                0x00, 0x01, 0xF0, 0x00, // program 1 -> PID 0x1000
                0x2A, 0xB1, 0x04, 0xB2, // CRC32
            ]
        );
    }

    #[test]
    fn test_roundtrip() {
        let pat = PAT {
            transport_stream_id: 7,
            version: 3,
            current_next: true,
            section_number: 0,
            last_section_number: 0,
            entries: vec![
                PATEntry {
                    program_number: 0,
                    pid: 0x0010,
                },
                PATEntry {
                    program_number: 1,
                    pid: 0x1000,
                },
                PATEntry {
                    program_number: 2,
                    pid: 0x1001,
                },
            ],
        };

        let mut buf = BytesMut::new();
        pat.write_to(&mut buf).unwrap();
        let decoded = PAT::decode(&buf).unwrap();
        assert_eq!(decoded, pat);
        assert!(decoded.entries[0].is_network());
        assert!(!decoded.entries[1].is_network());
    }

    #[test]
    fn test_crc_mismatch_rejected() {
        let mut buf = BytesMut::new();
        one_program_pat().write_to(&mut buf).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;

        assert!(PAT::decode(&buf).is_err());
    }

    #[test]
    fn test_short_section_rejected() {
        assert!(PAT::decode(&[0x00, 0xB0, 0x0D]).is_err());
    }
}
