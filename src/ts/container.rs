use super::adaptation::AdaptationField;
use super::header::TSHeader;
use super::packet::{Payload, RawData, TSPacket};
use super::pes::PES;
use super::pmt::{is_audio_stream_type, is_video_stream_type};
use super::psi::PSI;
use super::TS_PACKET_SIZE;
use crate::error::{Result, TsError};
use crate::utils::Cursor;
use log::trace;
use std::collections::HashSet;

/// Stateful decode context for one Transport Stream.
///
/// A PID's semantics are not known until the PAT and PMT naming it have been
/// parsed, so the container accumulates the discovered PMT PIDs and the
/// audio/video elementary-stream PIDs while packets flow through
/// [`Container::decode_packet`]. The registries only ever grow.
#[derive(Debug, Default)]
pub struct Container {
    pmt_pids: HashSet<u16>,
    audio_stream_pids: HashSet<u16>,
    video_stream_pids: HashSet<u16>,
}

impl Container {
    /// New context with empty registries.
    pub fn new() -> Self {
        Self::default()
    }

    /// PIDs announced as PMT carriers by parsed PATs.
    pub fn pmt_pids(&self) -> &HashSet<u16> {
        &self.pmt_pids
    }

    /// Audio elementary-stream PIDs discovered from parsed PMTs.
    pub fn audio_stream_pids(&self) -> &HashSet<u16> {
        &self.audio_stream_pids
    }

    /// Video elementary-stream PIDs discovered from parsed PMTs.
    pub fn video_stream_pids(&self) -> &HashSet<u16> {
        &self.video_stream_pids
    }

    /// True when `pid` is a known audio or video stream PID.
    pub fn is_stream_pid(&self, pid: u16) -> bool {
        self.audio_stream_pids.contains(&pid) || self.video_stream_pids.contains(&pid)
    }

    /// Decodes one 188-byte packet and folds any PAT/PMT content into the
    /// PID registries.
    pub fn decode_packet(&mut self, data: &[u8]) -> Result<TSPacket> {
        if data.len() != TS_PACKET_SIZE {
            return Err(TsError::InvalidData(format!(
                "packet is {} bytes, expected {}",
                data.len(),
                TS_PACKET_SIZE
            )));
        }

        let header = TSHeader::decode(data)?;
        let mut cur = Cursor::new(&data[4..]);

        let adaptation = if header.has_adaptation_field() {
            Some(AdaptationField::decode(&mut cur)?)
        } else {
            None
        };
        let rest = cur.read_to_end();

        let payload = if header.has_payload() {
            if rest.len() > 3 && rest[0..3] == [0x00, 0x00, 0x01] {
                Some(Payload::PES(PES::decode(rest)?))
            } else if !header.has_adaptation_field() {
                Some(Payload::PSI(PSI::decode(
                    rest,
                    header.pid,
                    self.pmt_pids.contains(&header.pid),
                )?))
            } else {
                None
            }
        } else if self.is_stream_pid(header.pid) {
            Some(Payload::Raw(RawData {
                data: rest.to_vec(),
            }))
        } else {
            None
        };

        let packet = TSPacket {
            header,
            adaptation,
            payload,
        };
        self.register(&packet);
        Ok(packet)
    }

    fn register(&mut self, packet: &TSPacket) {
        if let Some(pat) = packet.pat() {
            for entry in &pat.entries {
                if !entry.is_network() && self.pmt_pids.insert(entry.pid) {
                    trace!("discovered PMT pid {}", entry.pid);
                }
            }
        }

        if let Some(pmt) = packet.pmt() {
            for stream in &pmt.streams {
                if is_video_stream_type(stream.stream_type) {
                    if self.video_stream_pids.insert(stream.elementary_pid) {
                        trace!("discovered video pid {}", stream.elementary_pid);
                    }
                } else if is_audio_stream_type(stream.stream_type)
                    && self.audio_stream_pids.insert(stream.elementary_pid)
                {
                    trace!("discovered audio pid {}", stream.elementary_pid);
                }
            }
        }
    }
}
