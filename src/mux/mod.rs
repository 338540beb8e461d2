//! # Muxer pipeline and front-ends
//!
//! The muxer consumes access units over a bounded channel and emits a
//! conformant Transport Stream to an async byte sink:
//!
//! - [`Muxer`]: the producer/consumer pipeline itself
//! - [`FileMuxer`]: a procedural open/write/close surface writing to a file
//! - [`PtsStabilizer`]: wall-clock to TS-tick timestamp smoothing

/// Procedural file-backed muxer surface
pub mod adapter;

/// The muxer pipeline task
pub mod muxer;

/// Wall-clock timestamp stabilization
pub mod stabilizer;

pub use adapter::{
    FileMuxer, StreamType, DEFAULT_AUDIO_PID, DEFAULT_AUDIO_STREAM_ID, DEFAULT_PMT_PID,
    DEFAULT_VIDEO_PID, DEFAULT_VIDEO_STREAM_ID,
};
pub use muxer::{Muxer, MuxerConfig, StreamMeta, StreamPacket, INPUT_QUEUE_CAPACITY, NO_PTS};
pub use stabilizer::PtsStabilizer;
