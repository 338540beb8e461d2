use super::muxer::{Muxer, MuxerConfig, StreamMeta, StreamPacket, INPUT_QUEUE_CAPACITY};
use crate::error::{Result, TsError};
use crate::ts::pes::{is_valid_stream_id, StreamIdKind};
use crate::ts::pmt;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Default PES stream id for video streams
pub const DEFAULT_VIDEO_STREAM_ID: u8 = 0xE0;
/// Default PES stream id for audio streams
pub const DEFAULT_AUDIO_STREAM_ID: u8 = 0xC0;
/// Default PID for the Program Map Table
pub const DEFAULT_PMT_PID: u16 = 0x1000;
/// Default PID for the first video stream
pub const DEFAULT_VIDEO_PID: u16 = 0x100;
/// Default PID for the first audio stream
pub const DEFAULT_AUDIO_PID: u16 = 0xFA;

/// Codec selection for [`FileMuxer::add_stream`], mapped to the MPEG
/// stream type codes carried in the PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// H.264 / AVC video
    H264,
    /// H.265 / HEVC video
    Hevc,
    /// MPEG-1 video
    Mpeg1Video,
    /// MPEG-2 video
    Mpeg2Video,
    /// MPEG-4 video
    Mpeg4Video,
    /// CAVS video
    Cavs,
    /// Dirac video
    Dirac,
    /// VC-1 video
    Vc1,
    /// AAC audio (ADTS)
    Aac,
    /// AAC audio (LATM)
    AacLatm,
    /// AC-3 audio
    Ac3,
    /// DTS audio
    Dts,
    /// MPEG-1 audio
    Mpeg1Audio,
    /// MPEG-2 audio
    Mpeg2Audio,
    /// Dolby TrueHD audio
    TrueHd,
    /// E-AC-3 audio
    Eac3,
}

impl StreamType {
    /// The MPEG stream type code announced in the PMT.
    pub fn stream_type_id(self) -> u8 {
        match self {
            Self::H264 => pmt::STREAM_TYPE_H264,
            Self::Hevc => pmt::STREAM_TYPE_HEVC,
            Self::Mpeg1Video => pmt::STREAM_TYPE_MPEG1_VIDEO,
            Self::Mpeg2Video => pmt::STREAM_TYPE_MPEG2_VIDEO,
            Self::Mpeg4Video => pmt::STREAM_TYPE_MPEG4_VIDEO,
            Self::Cavs => pmt::STREAM_TYPE_CAVS,
            Self::Dirac => pmt::STREAM_TYPE_DIRAC,
            Self::Vc1 => pmt::STREAM_TYPE_VC1,
            Self::Aac => pmt::STREAM_TYPE_AAC,
            Self::AacLatm => pmt::STREAM_TYPE_AAC_LATM,
            Self::Ac3 => pmt::STREAM_TYPE_AC3,
            Self::Dts => pmt::STREAM_TYPE_DTS,
            Self::Mpeg1Audio => pmt::STREAM_TYPE_MPEG1_AUDIO,
            Self::Mpeg2Audio => pmt::STREAM_TYPE_MPEG2_AUDIO,
            Self::TrueHd => pmt::STREAM_TYPE_TRUEHD,
            Self::Eac3 => pmt::STREAM_TYPE_EAC3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ready,
    Opened,
    Closed,
}

/// Procedural muxer surface writing to a file.
///
/// Streams are registered in `Ready` state, `open` starts the pipeline and
/// emits PAT/PMT, `write` enqueues access units, `close` drains and waits
/// for completion. Operations outside their state fail with
/// [`TsError::WrongState`].
pub struct FileMuxer {
    dest_path: PathBuf,
    pmt_pid: u16,
    state: State,
    streams: Vec<StreamMeta>,
    sender: Option<mpsc::Sender<StreamPacket>>,
    receiver: Option<mpsc::Receiver<StreamPacket>>,
    done: Option<oneshot::Receiver<Result<()>>>,
    cancel: CancellationToken,
}

impl FileMuxer {
    /// New muxer targeting `dest_path`, not yet opened.
    pub fn new(dest_path: impl Into<PathBuf>, pmt_pid: u16) -> Self {
        let (sender, receiver) = mpsc::channel(INPUT_QUEUE_CAPACITY);
        Self {
            dest_path: dest_path.into(),
            pmt_pid,
            state: State::Ready,
            streams: Vec::new(),
            sender: Some(sender),
            receiver: Some(receiver),
            done: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Registers an elementary stream. Only legal before `open`.
    pub fn add_stream(&mut self, pid: u16, stream_id: u8, stream_type: StreamType) -> Result<()> {
        if self.state != State::Ready {
            return Err(TsError::WrongState);
        }
        if pid == 0 {
            return Err(TsError::InvalidPid(pid));
        }
        if !is_valid_stream_id(stream_id) {
            return Err(TsError::InvalidStreamId(stream_id));
        }

        self.streams.push(StreamMeta {
            pid,
            stream_id,
            stream_type_id: stream_type.stream_type_id(),
        });
        Ok(())
    }

    /// Creates the destination file, starts the pipeline and emits PAT/PMT.
    ///
    /// On failure the state stays `Ready` so the configuration can be fixed
    /// and `open` retried.
    pub async fn open(&mut self) -> Result<()> {
        if self.state != State::Ready {
            return Err(TsError::WrongState);
        }

        let pcr_pid = self.select_pcr_pid();
        let file = File::create(&self.dest_path).await?;
        let receiver = self.receiver.take().ok_or(TsError::WrongState)?;

        let config = MuxerConfig {
            pmt_pid: self.pmt_pid,
            pcr_pid,
            psi_interval: None,
        };
        match Muxer::run(
            self.cancel.clone(),
            file,
            config,
            self.streams.clone(),
            receiver,
        )
        .await
        {
            Ok(done) => {
                self.done = Some(done);
                self.state = State::Opened;
                Ok(())
            }
            Err(err) => {
                let (sender, receiver) = mpsc::channel(INPUT_QUEUE_CAPACITY);
                self.sender = Some(sender);
                self.receiver = Some(receiver);
                Err(err)
            }
        }
    }

    /// Enqueues one access unit. Only legal while opened; the bytes are
    /// copied before enqueue. Back-pressure blocks when the queue is full.
    pub async fn write(&mut self, pid: u16, data: &[u8], pts: i64, is_head: bool) -> Result<()> {
        if self.state != State::Opened {
            return Err(TsError::WrongState);
        }
        let sender = self.sender.as_ref().ok_or(TsError::WrongState)?;
        sender
            .send(StreamPacket {
                pid,
                pts,
                is_head,
                data: Bytes::copy_from_slice(data),
            })
            .await
            .map_err(|_| TsError::Sink("muxer pipeline is gone".into()))
    }

    /// Closes the input queue, waits for the pipeline to drain, and
    /// propagates its terminal status.
    pub async fn close(&mut self) -> Result<()> {
        if self.state != State::Opened {
            return Err(TsError::WrongState);
        }
        self.state = State::Closed;
        self.sender = None;

        match self.done.take() {
            Some(done) => done
                .await
                .unwrap_or_else(|_| Err(TsError::Sink("muxer pipeline vanished".into()))),
            None => Ok(()),
        }
    }

    /// First video stream wins, else the first audio stream, else the first
    /// registered stream.
    fn select_pcr_pid(&self) -> u16 {
        let mut pcr_pid = 0;
        for meta in &self.streams {
            match StreamIdKind::of(meta.stream_id) {
                StreamIdKind::Video => {
                    pcr_pid = meta.pid;
                    break;
                }
                StreamIdKind::Audio if pcr_pid == 0 => pcr_pid = meta.pid,
                _ => {}
            }
        }
        if pcr_pid == 0 {
            pcr_pid = self.streams.first().map(|m| m.pid).unwrap_or(0);
        }
        pcr_pid
    }
}
