#![doc(html_root_url = "https://docs.rs/tsmux/0.1.0")]

//! # tsmux - MPEG-2 Transport Stream muxer and packet codec
//!
//! `tsmux` encodes and decodes MPEG-2 Transport Stream byte streams as
//! defined by ISO/IEC 13818-1. It pairs a bit-exact codec for every TS
//! structure (header, adaptation field, PAT, PMT, PES) with an async muxer
//! pipeline that turns timestamped access units into a conformant stream of
//! 188-byte packets.
//!
//! ## Features
//!
//! ### Packet codec
//! - Symmetric encode/decode for headers, adaptation fields, PSI sections
//!   and PES packets
//! - CRC-32/MPEG-2 computation and verification for PAT/PMT
//! - Stateful stream decoding: PIDs discovered from PAT/PMT drive how
//!   later packets are interpreted
//!
//! ### Muxing
//! - PES packetization with PTS insertion and PCR on the clock PID
//! - Continuity-counter sequencing and adaptation-field stuffing
//! - A bounded-queue producer/consumer pipeline over any async byte sink
//! - A procedural open/write/close surface for file output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tsmux::mux::{FileMuxer, StreamType, DEFAULT_PMT_PID, DEFAULT_VIDEO_PID,
//!     DEFAULT_VIDEO_STREAM_ID};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut muxer = FileMuxer::new("output.ts", DEFAULT_PMT_PID);
//!     muxer.add_stream(DEFAULT_VIDEO_PID, DEFAULT_VIDEO_STREAM_ID, StreamType::H264)?;
//!     muxer.open().await?;
//!
//!     // one access unit with a timestamp, then the stream ends
//!     muxer.write(DEFAULT_VIDEO_PID, &[0u8; 1024], 9000, true).await?;
//!     muxer.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Decoding a stream
//!
//! ```rust,no_run
//! use tsmux::ts::{Container, TS_PACKET_SIZE};
//!
//! fn inspect(stream: &[u8]) -> tsmux::Result<()> {
//!     let mut container = Container::new();
//!     for frame in stream.chunks(TS_PACKET_SIZE) {
//!         let packet = container.decode_packet(frame)?;
//!         println!("pid {} cc {}", packet.header.pid, packet.header.continuity_counter);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - `ts`: wire structure codecs and the stateful decode context
//! - `mux`: the muxer pipeline, file adapter and PTS stabilizer
//! - `repack`: packet-level decode/encode pump between byte streams
//! - `error`: the [`TsError`] type and [`Result`] alias
//! - `utils`: CRC-32/MPEG-2 and the byte cursor used by decoders

/// Error types and utilities
pub mod error;

/// Muxer pipeline, procedural adapter and timestamp stabilizer
pub mod mux;

/// Packet-level repackaging between byte streams
pub mod repack;

/// Transport Stream structure codecs and decode context
pub mod ts;

/// Common utilities and helper functions
pub mod utils;

pub use error::{Result, TsError};
