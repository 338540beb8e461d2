use super::descriptor::{decode_descriptors, Descriptor};
use super::TABLE_ID_PMT;
use crate::error::{Result, TsError};
use crate::utils::Crc32Mpeg2;
use bytes::{BufMut, BytesMut};

/// Stream type for MPEG-1 video
pub const STREAM_TYPE_MPEG1_VIDEO: u8 = 0x01;
/// Stream type for MPEG-2 video
pub const STREAM_TYPE_MPEG2_VIDEO: u8 = 0x02;
/// Stream type for MPEG-1 audio
pub const STREAM_TYPE_MPEG1_AUDIO: u8 = 0x03;
/// Stream type for MPEG-2 audio
pub const STREAM_TYPE_MPEG2_AUDIO: u8 = 0x04;
/// Stream type for private sections
pub const STREAM_TYPE_PRIVATE_SECTION: u8 = 0x05;
/// Stream type for PES private data
pub const STREAM_TYPE_PRIVATE_DATA: u8 = 0x06;
/// Stream type for AAC audio (ADTS)
pub const STREAM_TYPE_AAC: u8 = 0x0F;
/// Stream type for MPEG-4 video
pub const STREAM_TYPE_MPEG4_VIDEO: u8 = 0x10;
/// Stream type for AAC audio (LATM)
pub const STREAM_TYPE_AAC_LATM: u8 = 0x11;
/// Stream type for metadata in PES
pub const STREAM_TYPE_METADATA: u8 = 0x15;
/// Stream type for H.264 video
pub const STREAM_TYPE_H264: u8 = 0x1B;
/// Stream type for HEVC video
pub const STREAM_TYPE_HEVC: u8 = 0x24;
/// Stream type for CAVS video
pub const STREAM_TYPE_CAVS: u8 = 0x42;
/// Stream type for AC-3 audio
pub const STREAM_TYPE_AC3: u8 = 0x81;
/// Stream type for DTS audio
pub const STREAM_TYPE_DTS: u8 = 0x82;
/// Stream type for Dolby TrueHD audio
pub const STREAM_TYPE_TRUEHD: u8 = 0x83;
/// Stream type for E-AC-3 audio
pub const STREAM_TYPE_EAC3: u8 = 0x87;
/// Stream type for Dirac video
pub const STREAM_TYPE_DIRAC: u8 = 0xD1;
/// Stream type for VC-1 video
pub const STREAM_TYPE_VC1: u8 = 0xEA;

/// True for the video stream types.
pub fn is_video_stream_type(stream_type: u8) -> bool {
    matches!(
        stream_type,
        STREAM_TYPE_MPEG1_VIDEO
            | STREAM_TYPE_MPEG2_VIDEO
            | STREAM_TYPE_MPEG4_VIDEO
            | STREAM_TYPE_H264
            | STREAM_TYPE_HEVC
            | STREAM_TYPE_CAVS
            | STREAM_TYPE_DIRAC
            | STREAM_TYPE_VC1
    )
}

/// True for the audio stream types.
pub fn is_audio_stream_type(stream_type: u8) -> bool {
    matches!(
        stream_type,
        STREAM_TYPE_MPEG1_AUDIO
            | STREAM_TYPE_MPEG2_AUDIO
            | STREAM_TYPE_AAC
            | STREAM_TYPE_AAC_LATM
            | STREAM_TYPE_AC3
            | STREAM_TYPE_DTS
            | STREAM_TYPE_TRUEHD
            | STREAM_TYPE_EAC3
    )
}

/// True when `stream_type` is one of the recognized MPEG stream types.
pub fn is_valid_stream_type_id(stream_type: u8) -> bool {
    is_video_stream_type(stream_type)
        || is_audio_stream_type(stream_type)
        || matches!(
            stream_type,
            STREAM_TYPE_PRIVATE_SECTION | STREAM_TYPE_PRIVATE_DATA | STREAM_TYPE_METADATA
        )
}

/// One elementary stream record in the PMT ES loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryStreamInfo {
    /// Elementary stream type (8 bits)
    pub stream_type: u8,
    /// PID of the packets carrying the elementary stream (13 bits)
    pub elementary_pid: u16,
    /// Descriptors for the elementary stream
    pub descriptors: Vec<Descriptor>,
}

impl ElementaryStreamInfo {
    fn encoded_len(&self) -> usize {
        5 + self
            .descriptors
            .iter()
            .map(|d| d.encoded_len())
            .sum::<usize>()
    }
}

/// Program Map Table section.
///
/// Section length and the CRC32 trailer are computed from the descriptor
/// and ES loops on encode; reserved bits are canonicalized to ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PMT {
    /// Program number (16 bits)
    pub program_number: u16,
    /// Table version (5 bits)
    pub version: u8,
    /// Current/next indicator
    pub current_next: bool,
    /// Section number
    pub section_number: u8,
    /// Last section number
    pub last_section_number: u8,
    /// PID carrying the Program Clock Reference (13 bits)
    pub pcr_pid: u16,
    /// Descriptors applying to the whole program
    pub program_descriptors: Vec<Descriptor>,
    /// Elementary stream records
    pub streams: Vec<ElementaryStreamInfo>,
}

impl PMT {
    fn program_info_length(&self) -> usize {
        self.program_descriptors
            .iter()
            .map(|d| d.encoded_len())
            .sum()
    }

    /// Section length value: bytes after the length field, CRC included.
    pub fn section_length(&self) -> u16 {
        let streams: usize = self.streams.iter().map(|s| s.encoded_len()).sum();
        (13 + self.program_info_length() + streams) as u16
    }

    /// Writes the full section including the CRC32 trailer.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        let start = buf.len();
        let section_length = self.section_length();

        buf.put_u8(TABLE_ID_PMT);
        buf.put_u8(0xB0 | ((section_length >> 8) as u8 & 0x0F));
        buf.put_u8(section_length as u8);
        buf.put_u16(self.program_number);
        let mut ver = 0xC0 | ((self.version << 1) & 0x3E);
        if self.current_next {
            ver |= 0x01;
        }
        buf.put_u8(ver);
        buf.put_u8(self.section_number);
        buf.put_u8(self.last_section_number);
        buf.put_u16(0xE000 | (self.pcr_pid & 0x1FFF));
        buf.put_u16(0xF000 | (self.program_info_length() as u16 & 0x0FFF));
        for desc in &self.program_descriptors {
            desc.write_to(buf)?;
        }

        for stream in &self.streams {
            buf.put_u8(stream.stream_type);
            buf.put_u16(0xE000 | (stream.elementary_pid & 0x1FFF));
            let es_info_length: usize = stream
                .descriptors
                .iter()
                .map(|d| d.encoded_len())
                .sum();
            buf.put_u16(0xF000 | (es_info_length as u16 & 0x0FFF));
            for desc in &stream.descriptors {
                desc.write_to(buf)?;
            }
        }

        let crc = Crc32Mpeg2::new().calculate(&buf[start..]);
        buf.put_u32(crc);
        Ok(())
    }

    /// Decodes a section and verifies its CRC32 trailer.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(TsError::InvalidData("PMT section too short".into()));
        }
        if data[0] != TABLE_ID_PMT {
            return Err(TsError::InvalidData(format!(
                "invalid PMT table id: 0x{:02x}",
                data[0]
            )));
        }

        let section_length = (((data[1] & 0x0F) as usize) << 8) | data[2] as usize;
        let total = 3 + section_length;
        if section_length < 13 || data.len() < total {
            return Err(TsError::InvalidData(
                "PMT data shorter than section length".into(),
            ));
        }
        let crc_pos = total - 4;

        let pcr_pid = u16::from_be_bytes([data[8], data[9]]) & 0x1FFF;
        let program_info_length = (((data[10] & 0x0F) as usize) << 8) | data[11] as usize;

        let mut pos = 12;
        if pos + program_info_length > crc_pos {
            return Err(TsError::InvalidData(
                "PMT program info extends beyond section".into(),
            ));
        }
        let program_descriptors = decode_descriptors(&data[pos..pos + program_info_length])?;
        pos += program_info_length;

        let mut streams = Vec::new();
        while pos + 5 <= crc_pos {
            let stream_type = data[pos];
            let elementary_pid = u16::from_be_bytes([data[pos + 1], data[pos + 2]]) & 0x1FFF;
            let es_info_length = (((data[pos + 3] & 0x0F) as usize) << 8) | data[pos + 4] as usize;
            pos += 5;

            if pos + es_info_length > crc_pos {
                return Err(TsError::InvalidData(
                    "PMT ES info extends beyond section".into(),
                ));
            }
            let descriptors = decode_descriptors(&data[pos..pos + es_info_length])?;
            pos += es_info_length;

            streams.push(ElementaryStreamInfo {
                stream_type,
                elementary_pid,
                descriptors,
            });
        }

        let crc =
            u32::from_be_bytes([data[crc_pos], data[crc_pos + 1], data[crc_pos + 2], data[crc_pos + 3]]);
        if crc != Crc32Mpeg2::new().calculate(&data[..crc_pos]) {
            return Err(TsError::InvalidData("PMT CRC mismatch".into()));
        }

        Ok(Self {
            program_number: u16::from_be_bytes([data[3], data[4]]),
            version: (data[5] >> 1) & 0x1F,
            current_next: data[5] & 0x01 != 0,
            section_number: data[6],
            last_section_number: data[7],
            pcr_pid,
            program_descriptors,
            streams,
        })
    }
}
