//! # Error Types
//!
//! Central error type for the tsmux library. Every fallible operation in the
//! codec, the muxer pipeline, and the procedural adapter returns [`Result`].

use thiserror::Error;

/// Primary error type for the tsmux library
#[derive(Error, Debug)]
pub enum TsError {
    /// I/O errors from the byte source or sink
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Input buffer too short or structurally impossible
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// First byte of a purported packet is not 0x47
    #[error("invalid sync byte: 0x{0:02x}")]
    InvalidSyncByte(u8),

    /// PES stream id outside the valid set
    #[error("invalid PES stream id: 0x{0:02x}")]
    InvalidStreamId(u8),

    /// PMT stream type not recognized
    #[error("invalid stream type id: 0x{0:02x}")]
    InvalidStreamTypeId(u8),

    /// Zero or duplicate PID in stream metadata
    #[error("invalid pid: {0}")]
    InvalidPid(u16),

    /// PMT PID is zero
    #[error("invalid pmt pid")]
    InvalidPmtPid,

    /// PCR PID is not one of the registered stream PIDs
    #[error("invalid pcr pid: {0}")]
    InvalidPcrPid(u16),

    /// PES header marker bits are not 0b10
    #[error("invalid PES header mark")]
    InvalidPesHeaderMark,

    /// PSI section on a PID that is neither PAT, data, nor a known PMT
    #[error("unsupported PSI table on pid {0}")]
    UnsupportedPsiTable(u16),

    /// Adapter operation not legal in the current state
    #[error("operation not allowed in current state")]
    WrongState,

    /// Downstream byte sink failed
    #[error("sink error: {0}")]
    Sink(String),
}

/// A specialized Result type for tsmux operations.
pub type Result<T> = std::result::Result<T, TsError>;
