use super::adaptation::{AdaptationField, STUFFING_BYTE};
use super::header::TSHeader;
use super::pat::PAT;
use super::pes::PES;
use super::pmt::PMT;
use super::psi::{PSITable, PSI};
use super::TS_PACKET_SIZE;
use crate::error::{Result, TsError};
use bytes::{BufMut, BytesMut};

/// Opaque elementary-stream payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawData {
    /// Payload bytes
    pub data: Vec<u8>,
}

/// Semantic payload of a TS packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Program Specific Information section
    PSI(PSI),
    /// Start of a PES packet
    PES(PES),
    /// Raw elementary-stream continuation bytes
    Raw(RawData),
}

impl Payload {
    fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Payload::PSI(psi) => psi.write_to(buf),
            Payload::PES(pes) => pes.write_to(buf),
            Payload::Raw(raw) => {
                buf.put_slice(&raw.data);
                Ok(())
            }
        }
    }
}

/// One 188-byte Transport Stream packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TSPacket {
    /// Fixed 4-byte header
    pub header: TSHeader,
    /// Adaptation field, required when the header announces one
    pub adaptation: Option<AdaptationField>,
    /// Decoded payload, if any
    pub payload: Option<Payload>,
}

impl TSPacket {
    /// The PAT carried by this packet, if it is a PAT packet.
    pub fn pat(&self) -> Option<&PAT> {
        match &self.payload {
            Some(Payload::PSI(PSI {
                table: Some(PSITable::PAT(pat)),
                ..
            })) => Some(pat),
            _ => None,
        }
    }

    /// The PMT carried by this packet, if it is a PMT packet.
    pub fn pmt(&self) -> Option<&PMT> {
        match &self.payload {
            Some(Payload::PSI(PSI {
                table: Some(PSITable::PMT(pmt)),
                ..
            })) => Some(pmt),
            _ => None,
        }
    }

    /// Encodes the packet into exactly 188 bytes.
    ///
    /// The adaptation field is written when the header's adaptation field
    /// control announces one, the payload when it announces payload; short
    /// frames are filled with stuffing bytes.
    pub fn encode(&self) -> Result<BytesMut> {
        let mut buf = BytesMut::with_capacity(TS_PACKET_SIZE);
        self.header.write_to(&mut buf)?;

        if self.header.has_adaptation_field() {
            let adaptation = self.adaptation.as_ref().ok_or_else(|| {
                TsError::InvalidData("adaptation field announced but missing".into())
            })?;
            adaptation.write_to(&mut buf)?;
        }

        if self.header.adaptation_field_control & 0b01 != 0 {
            if let Some(payload) = &self.payload {
                payload.write_to(&mut buf)?;
            }
        }

        if buf.len() > TS_PACKET_SIZE {
            return Err(TsError::InvalidData(format!(
                "packet would encode to {} bytes",
                buf.len()
            )));
        }
        while buf.len() < TS_PACKET_SIZE {
            buf.put_u8(STUFFING_BYTE);
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::pat::PATEntry;

    #[test]
    fn test_psi_packet_is_framed_and_stuffed() {
        let packet = TSPacket {
            header: TSHeader {
                payload_unit_start: true,
                pid: 0,
                adaptation_field_control: 0b01,
                ..Default::default()
            },
            adaptation: None,
            payload: Some(Payload::PSI(PSI::pat(PAT {
                transport_stream_id: 1,
                current_next: true,
                entries: vec![PATEntry {
                    program_number: 1,
                    pid: 0x1000,
                }],
                ..Default::default()
            }))),
        };

        let buf = packet.encode().unwrap();
        assert_eq!(buf.len(), TS_PACKET_SIZE);
        assert_eq!(buf[0], 0x47);
        // pointer field + 17-byte section, then stuffing
        assert_eq!(buf[4], 0x00);
        assert!(buf[22..].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_missing_adaptation_field_rejected() {
        let packet = TSPacket {
            header: TSHeader {
                adaptation_field_control: 0b11,
                ..Default::default()
            },
            adaptation: None,
            payload: None,
        };

        assert!(packet.encode().is_err());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let packet = TSPacket {
            header: TSHeader {
                adaptation_field_control: 0b01,
                ..Default::default()
            },
            adaptation: None,
            payload: Some(Payload::Raw(RawData {
                data: vec![0u8; 185],
            })),
        };

        assert!(packet.encode().is_err());
    }

    #[test]
    fn test_full_raw_payload() {
        let packet = TSPacket {
            header: TSHeader {
                pid: 0x100,
                adaptation_field_control: 0b01,
                continuity_counter: 5,
                ..Default::default()
            },
            adaptation: None,
            payload: Some(Payload::Raw(RawData {
                data: vec![0xAB; 184],
            })),
        };

        let buf = packet.encode().unwrap();
        assert_eq!(buf.len(), TS_PACKET_SIZE);
        assert!(buf[4..].iter().all(|&b| b == 0xAB));
    }
}
