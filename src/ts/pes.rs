use super::timestamp::{
    decode_timestamp, encode_timestamp, MARKER_DTS, MARKER_PTS, MARKER_PTS_OF_PAIR,
};
use crate::error::{Result, TsError};
use bytes::{BufMut, BytesMut};

/// Classification of a PES stream id per the ISO/IEC 13818-1 table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamIdKind {
    /// Program stream map (0xBC)
    ProgramStreamMap,
    /// Private stream 1 (0xBD)
    PrivateStream1,
    /// Padding stream (0xBE)
    PaddingStream,
    /// Private stream 2 (0xBF)
    PrivateStream2,
    /// Audio streams (0xC0..=0xDF)
    Audio,
    /// Video streams (0xE0..=0xEF)
    Video,
    /// ECM stream (0xF0)
    Ecm,
    /// EMM stream (0xF1)
    Emm,
    /// DSM-CC stream (0xF2)
    Dsmcc,
    /// ISO/IEC 13522 stream (0xF3)
    Iso13522,
    /// ITU-T Rec. H.222.1 type A (0xF4)
    TypeA,
    /// ITU-T Rec. H.222.1 type B (0xF5)
    TypeB,
    /// ITU-T Rec. H.222.1 type C (0xF6)
    TypeC,
    /// ITU-T Rec. H.222.1 type D (0xF7)
    TypeD,
    /// ITU-T Rec. H.222.1 type E (0xF8)
    TypeE,
    /// Ancillary stream (0xF9)
    Ancillary,
    /// SL-packetized stream (0xFA)
    SlPacketized,
    /// FlexMux stream (0xFB)
    FlexMux,
    /// Reserved data streams (0xFC..=0xFE)
    ReservedData,
    /// Program stream directory (0xFF)
    ProgramStreamDirectory,
}

impl StreamIdKind {
    /// Classifies a stream id.
    pub fn of(stream_id: u8) -> Self {
        match stream_id {
            0xBC => Self::ProgramStreamMap,
            0xBD => Self::PrivateStream1,
            0xBE => Self::PaddingStream,
            0xBF => Self::PrivateStream2,
            0xC0..=0xDF => Self::Audio,
            0xE0..=0xEF => Self::Video,
            0xF0 => Self::Ecm,
            0xF1 => Self::Emm,
            0xF2 => Self::Dsmcc,
            0xF3 => Self::Iso13522,
            0xF4 => Self::TypeA,
            0xF5 => Self::TypeB,
            0xF6 => Self::TypeC,
            0xF7 => Self::TypeD,
            0xF8 => Self::TypeE,
            0xF9 => Self::Ancillary,
            0xFA => Self::SlPacketized,
            0xFB => Self::FlexMux,
            0xFC..=0xFE => Self::ReservedData,
            _ => Self::ProgramStreamDirectory,
        }
    }

    /// True when packets of this class carry the optional PES header.
    pub fn has_header(self) -> bool {
        !matches!(
            self,
            Self::ProgramStreamMap
                | Self::PaddingStream
                | Self::PrivateStream2
                | Self::Ecm
                | Self::Emm
                | Self::ProgramStreamDirectory
                | Self::Dsmcc
                | Self::TypeE
        )
    }
}

/// True when `stream_id` is a defined PES stream id.
pub fn is_valid_stream_id(stream_id: u8) -> bool {
    matches!(
        stream_id,
        0xBC..=0xBF | 0xC0..=0xDF | 0xE0..=0xEF | 0xF0..=0xFB | 0xFC..=0xFE | 0xFF
    )
}

/// Optional PES header carried after the packet length field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PESHeader {
    /// PES scrambling control (2 bits)
    pub scrambling_control: u8,
    /// PES priority
    pub priority: bool,
    /// Data alignment indicator
    pub data_alignment: bool,
    /// Copyright flag
    pub copyright: bool,
    /// Original-or-copy flag
    pub original: bool,
    /// PTS/DTS indicator: 0b00 none, 0b10 PTS only, 0b11 PTS and DTS
    pub pts_dts_indicator: u8,
    /// ESCR flag
    pub escr_flag: bool,
    /// ES rate flag
    pub es_rate_flag: bool,
    /// DSM trick mode flag
    pub dsm_trick_mode_flag: bool,
    /// Additional copy info flag
    pub additional_copy_info_flag: bool,
    /// PES CRC flag
    pub crc_flag: bool,
    /// PES extension flag
    pub extension_flag: bool,
    /// Declared header data length in bytes
    pub header_data_length: u8,
    /// Presentation timestamp (33 bits)
    pub pts: Option<u64>,
    /// Decoding timestamp (33 bits)
    pub dts: Option<u64>,
}

impl PESHeader {
    /// Header carrying only a PTS.
    pub fn with_pts(pts: u64) -> Self {
        Self {
            pts_dts_indicator: 0b10,
            header_data_length: 5,
            pts: Some(pts),
            ..Default::default()
        }
    }

    /// Header carrying a PTS and a DTS.
    pub fn with_pts_dts(pts: u64, dts: u64) -> Self {
        Self {
            pts_dts_indicator: 0b11,
            header_data_length: 10,
            pts: Some(pts),
            dts: Some(dts),
            ..Default::default()
        }
    }

    /// Bytes this header occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        3 + self.timestamp_len()
    }

    fn timestamp_len(&self) -> usize {
        match self.pts_dts_indicator {
            0b10 => 5,
            0b11 => 10,
            _ => 0,
        }
    }

    fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        let mut flags = 0x80 | (self.scrambling_control << 4);
        if self.priority {
            flags |= 0x08;
        }
        if self.data_alignment {
            flags |= 0x04;
        }
        if self.copyright {
            flags |= 0x02;
        }
        if self.original {
            flags |= 0x01;
        }
        buf.put_u8(flags);

        let mut flags2 = (self.pts_dts_indicator & 0x03) << 6;
        if self.escr_flag {
            flags2 |= 0x20;
        }
        if self.es_rate_flag {
            flags2 |= 0x10;
        }
        if self.dsm_trick_mode_flag {
            flags2 |= 0x08;
        }
        if self.additional_copy_info_flag {
            flags2 |= 0x04;
        }
        if self.crc_flag {
            flags2 |= 0x02;
        }
        if self.extension_flag {
            flags2 |= 0x01;
        }
        buf.put_u8(flags2);

        buf.put_u8(self.timestamp_len() as u8);

        match self.pts_dts_indicator {
            0b10 => {
                buf.put_slice(&encode_timestamp(MARKER_PTS, self.pts.unwrap_or(0)));
            }
            0b11 => {
                buf.put_slice(&encode_timestamp(MARKER_PTS_OF_PAIR, self.pts.unwrap_or(0)));
                buf.put_slice(&encode_timestamp(MARKER_DTS, self.dts.unwrap_or(0)));
            }
            _ => {}
        }

        Ok(())
    }
}

/// Start of a Packetized Elementary Stream packet.
///
/// A PES packet spans many TS packets; only its start is framed here. The
/// payload is whatever fit into the carrying TS packet, continuation bytes
/// travel as raw data packets on the same PID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PES {
    /// Stream id selecting the elementary stream class
    pub stream_id: u8,
    /// Declared PES packet length; 0 means unbounded (video)
    pub packet_length: u16,
    /// Optional header, present for most stream id classes
    pub header: Option<PESHeader>,
    /// Payload bytes carried in this TS packet
    pub data: Vec<u8>,
}

impl PES {
    /// New PES start with the given stream id and payload.
    pub fn new(stream_id: u8, data: Vec<u8>) -> Self {
        Self {
            stream_id,
            packet_length: 0,
            header: Some(PESHeader::default()),
            data,
        }
    }

    /// Bytes occupied on the wire.
    pub fn encoded_len(&self) -> usize {
        let header = if StreamIdKind::of(self.stream_id).has_header() {
            self.header
                .as_ref()
                .map(|h| h.encoded_len())
                .unwrap_or(3)
        } else {
            0
        };
        6 + header + self.data.len()
    }

    /// Writes start code, stream id, length, header and payload.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_slice(&[0x00, 0x00, 0x01]);
        buf.put_u8(self.stream_id);
        buf.put_u16(self.packet_length);

        if StreamIdKind::of(self.stream_id).has_header() {
            match &self.header {
                Some(header) => header.write_to(buf)?,
                None => PESHeader::default().write_to(buf)?,
            }
        }

        buf.put_slice(&self.data);
        Ok(())
    }

    /// Decodes a PES start from the payload of a unit-start TS packet.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 6 {
            return Err(TsError::InvalidData("PES start too short".into()));
        }
        if payload[0..3] != [0x00, 0x00, 0x01] {
            return Err(TsError::InvalidData("missing PES start code".into()));
        }

        let stream_id = payload[3];
        if !is_valid_stream_id(stream_id) {
            return Err(TsError::InvalidStreamId(stream_id));
        }
        let packet_length = u16::from_be_bytes([payload[4], payload[5]]);

        if !StreamIdKind::of(stream_id).has_header() {
            return Ok(Self {
                stream_id,
                packet_length,
                header: None,
                data: payload[6..].to_vec(),
            });
        }

        if payload.len() < 9 {
            return Err(TsError::InvalidData("PES header too short".into()));
        }
        if payload[6] >> 6 != 0b10 {
            return Err(TsError::InvalidPesHeaderMark);
        }

        let mut header = PESHeader {
            scrambling_control: (payload[6] >> 4) & 0x03,
            priority: payload[6] & 0x08 != 0,
            data_alignment: payload[6] & 0x04 != 0,
            copyright: payload[6] & 0x02 != 0,
            original: payload[6] & 0x01 != 0,
            pts_dts_indicator: (payload[7] >> 6) & 0x03,
            escr_flag: payload[7] & 0x20 != 0,
            es_rate_flag: payload[7] & 0x10 != 0,
            dsm_trick_mode_flag: payload[7] & 0x08 != 0,
            additional_copy_info_flag: payload[7] & 0x04 != 0,
            crc_flag: payload[7] & 0x02 != 0,
            extension_flag: payload[7] & 0x01 != 0,
            header_data_length: payload[8],
            pts: None,
            dts: None,
        };

        let header_data_length = header.header_data_length as usize;
        let data_offset = 9 + header_data_length;
        if payload.len() < data_offset {
            return Err(TsError::InvalidData("PES header data truncated".into()));
        }

        match header.pts_dts_indicator {
            0b10 => {
                if header_data_length < 5 {
                    return Err(TsError::InvalidData("PES PTS field truncated".into()));
                }
                header.pts = Some(decode_timestamp(&payload[9..14])?);
            }
            0b11 => {
                if header_data_length < 10 {
                    return Err(TsError::InvalidData("PES PTS/DTS field truncated".into()));
                }
                header.pts = Some(decode_timestamp(&payload[9..14])?);
                header.dts = Some(decode_timestamp(&payload[14..19])?);
            }
            0b01 => {
                return Err(TsError::InvalidData(
                    "reserved PTS/DTS indicator 0b01".into(),
                ));
            }
            _ => {}
        }

        Ok(Self {
            stream_id,
            packet_length,
            header: Some(header),
            data: payload[data_offset..].to_vec(),
        })
    }
}
