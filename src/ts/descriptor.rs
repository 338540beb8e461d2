use crate::error::{Result, TsError};
use bytes::{BufMut, BytesMut};

/// Video stream descriptor tag
pub const TAG_VIDEO: u8 = 2;
/// Audio stream descriptor tag
pub const TAG_AUDIO: u8 = 3;
/// Video window descriptor tag
pub const TAG_VIDEO_WINDOW: u8 = 8;
/// ISO 639 language descriptor tag
pub const TAG_ISO639_LANGUAGE: u8 = 10;
/// System clock descriptor tag
pub const TAG_SYSTEM_CLOCK: u8 = 11;
/// Maximum bitrate descriptor tag
pub const TAG_MAXIMUM_BITRATE: u8 = 14;
/// MPEG-4 video descriptor tag
pub const TAG_MPEG4_VIDEO: u8 = 27;
/// MPEG-4 audio descriptor tag
pub const TAG_MPEG4_AUDIO: u8 = 28;
/// AVC video descriptor tag
pub const TAG_AVC_VIDEO: u8 = 40;
/// AVC timing and HRD descriptor tag
pub const TAG_AVC_TIMING_AND_HRD: u8 = 42;

/// A descriptor attached to a program or an elementary stream.
///
/// The payload is kept as raw bytes so unknown and vendor descriptors
/// survive a decode/encode round trip untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Tag identifying the descriptor type
    pub tag: u8,
    /// Raw descriptor payload
    pub data: Vec<u8>,
}

impl Descriptor {
    /// Encoded size: tag byte, length byte, payload.
    pub fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }

    /// Writes the descriptor as tag, length, payload.
    pub fn write_to(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(self.tag);
        buf.put_u8(self.data.len() as u8);
        buf.put_slice(&self.data);
        Ok(())
    }
}

/// Parses a descriptor loop covering the whole of `data`.
pub fn decode_descriptors(data: &[u8]) -> Result<Vec<Descriptor>> {
    let mut descriptors = Vec::new();
    let mut pos = 0;

    while pos + 2 <= data.len() {
        let tag = data[pos];
        let length = data[pos + 1] as usize;
        pos += 2;

        if pos + length > data.len() {
            return Err(TsError::InvalidData("descriptor data too short".into()));
        }
        descriptors.push(Descriptor {
            tag,
            data: data[pos..pos + length].to_vec(),
        });
        pos += length;
    }

    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_loop_roundtrip() {
        let descriptors = vec![
            Descriptor {
                tag: TAG_ISO639_LANGUAGE,
                data: vec![b'e', b'n', b'g', 0x00],
            },
            Descriptor {
                tag: TAG_MAXIMUM_BITRATE,
                data: vec![0xC0, 0x00, 0x10],
            },
        ];

        let mut buf = BytesMut::new();
        for d in &descriptors {
            d.write_to(&mut buf).unwrap();
        }

        assert_eq!(decode_descriptors(&buf).unwrap(), descriptors);
    }

    #[test]
    fn test_truncated_descriptor_fails() {
        // claims 4 payload bytes, carries 1
        assert!(decode_descriptors(&[TAG_AVC_VIDEO, 0x04, 0xAA]).is_err());
    }

    #[test]
    fn test_empty_loop() {
        assert!(decode_descriptors(&[]).unwrap().is_empty());
    }
}
