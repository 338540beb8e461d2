use super::pat::PAT;
use super::pmt::PMT;
use super::PID_PAT;
use crate::error::{Result, TsError};
use bytes::{BufMut, BytesMut};

/// True when `pid` carries the Program Association Table.
pub fn is_pat_pid(pid: u16) -> bool {
    pid == PID_PAT
}

/// True for the DigiCipher II PID.
pub fn is_digicipher_pid(pid: u16) -> bool {
    pid == 0x1FFB
}

/// True when `pid` falls in the general data range that may carry PMTs.
pub fn is_data_pid(pid: u16) -> bool {
    (0x0010..=0x1FFE).contains(&pid) && !is_digicipher_pid(pid)
}

/// The table carried by a PSI section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PSITable {
    /// Program Association Table
    PAT(PAT),
    /// Program Map Table
    PMT(PMT),
}

/// Program Specific Information payload: a pointer field followed by one
/// table section.
///
/// `table` is `None` when the section arrived on a data PID whose PMT
/// membership is not yet known; the bytes are accepted but not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PSI {
    /// Offset in bytes from the pointer field to the section start
    pub pointer_field: u8,
    /// Decoded table, if the PID could be classified
    pub table: Option<PSITable>,
}

impl PSI {
    /// Wraps a PAT with a zero pointer field.
    pub fn pat(pat: PAT) -> Self {
        Self {
            pointer_field: 0,
            table: Some(PSITable::PAT(pat)),
        }
    }

    /// Wraps a PMT with a zero pointer field.
    pub fn pmt(pmt: PMT) -> Self {
        Self {
            pointer_field: 0,
            table: Some(PSITable::PMT(pmt)),
        }
    }

    /// Writes the pointer field, filler and section.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(self.pointer_field);
        for _ in 0..self.pointer_field {
            buf.put_u8(0xFF);
        }
        match &self.table {
            Some(PSITable::PAT(pat)) => pat.write_to(buf)?,
            Some(PSITable::PMT(pmt)) => pmt.write_to(buf)?,
            None => {}
        }
        Ok(())
    }

    /// Decodes a PSI payload.
    ///
    /// `is_pmt_pid` tells whether the stream context has already seen this
    /// PID in a PAT; sections on unclassified data PIDs are skipped.
    pub fn decode(payload: &[u8], pid: u16, is_pmt_pid: bool) -> Result<Self> {
        if payload.is_empty() {
            return Err(TsError::InvalidData("empty PSI payload".into()));
        }

        let pointer_field = payload[0];
        let section_start = 1 + pointer_field as usize;
        if payload.len() <= section_start {
            return Err(TsError::InvalidData("PSI pointer beyond payload".into()));
        }
        let section = &payload[section_start..];

        let table = if is_pat_pid(pid) {
            Some(PSITable::PAT(PAT::decode(section)?))
        } else if is_data_pid(pid) {
            if is_pmt_pid {
                Some(PSITable::PMT(PMT::decode(section)?))
            } else {
                None
            }
        } else {
            return Err(TsError::UnsupportedPsiTable(pid));
        };

        Ok(Self {
            pointer_field,
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::pat::PATEntry;
    use pretty_assertions::assert_eq;

    fn sample_pat() -> PAT {
        PAT {
            transport_stream_id: 1,
            current_next: true,
            entries: vec![PATEntry {
                program_number: 1,
                pid: 0x1000,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_pat_roundtrip() {
        let psi = PSI::pat(sample_pat());
        let mut buf = BytesMut::new();
        psi.write_to(&mut buf).unwrap();

        assert_eq!(buf[0], 0);
        assert_eq!(PSI::decode(&buf, PID_PAT, false).unwrap(), psi);
    }

    #[test]
    fn test_pointer_field_skips_bytes() {
        let psi = PSI {
            pointer_field: 3,
            table: Some(PSITable::PAT(sample_pat())),
        };
        let mut buf = BytesMut::new();
        psi.write_to(&mut buf).unwrap();

        assert_eq!(&buf[1..4], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(PSI::decode(&buf, PID_PAT, false).unwrap(), psi);
    }

    #[test]
    fn test_unknown_data_pid_is_skipped() {
        let mut buf = BytesMut::new();
        PSI::pat(sample_pat()).write_to(&mut buf).unwrap();

        let psi = PSI::decode(&buf, 0x0100, false).unwrap();
        assert!(psi.table.is_none());
    }

    #[test]
    fn test_unsupported_pid_rejected() {
        let err = PSI::decode(&[0x00, 0x00], 0x1FFF, false).unwrap_err();
        assert!(matches!(err, TsError::UnsupportedPsiTable(0x1FFF)));
    }

    #[test]
    fn test_pid_classes() {
        assert!(is_pat_pid(0));
        assert!(!is_data_pid(0x0001));
        assert!(is_data_pid(0x0010));
        assert!(is_data_pid(0x1FFE));
        assert!(!is_data_pid(0x1FFB));
        assert!(!is_data_pid(0x1FFF));
    }
}
