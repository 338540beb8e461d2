//! # Transport Stream packet codec
//!
//! Bit-exact encoders and decoders for every structure of an MPEG-2
//! Transport Stream packet as defined by ISO/IEC 13818-1:
//!
//! - TS packet header and adaptation field
//! - PSI sections (PAT, PMT) with CRC32 trailers
//! - PES packets with PTS/DTS timestamps
//! - The 188-byte packet frame itself
//!
//! Decoding is stateful at the stream level: a [`Container`] accumulates the
//! PIDs discovered from PAT/PMT tables so that packets on elementary-stream
//! PIDs are treated as raw payload rather than PSI.

/// Adaptation field codec
pub mod adaptation;

/// Stateful decode context
pub mod container;

/// Program and ES descriptors
pub mod descriptor;

/// TS packet header codec
pub mod header;

/// 188-byte packet frame and payload union
pub mod packet;

/// Program Association Table codec
pub mod pat;

/// PES packet codec and stream id classification
pub mod pes;

/// Program Map Table codec and stream types
pub mod pmt;

/// PSI section wrapper
pub mod psi;

/// PTS/DTS and PCR bit packing
pub mod timestamp;

/// Size of a Transport Stream packet in bytes
pub const TS_PACKET_SIZE: usize = 188;
/// Size of a Transport Stream header in bytes
pub const TS_HEADER_SIZE: usize = 4;
/// Maximum payload bytes in one TS packet
pub const TS_PAYLOAD_SIZE: usize = TS_PACKET_SIZE - TS_HEADER_SIZE;
/// Sync byte opening every TS packet
pub const SYNC_BYTE: u8 = 0x47;

/// PID carrying the Program Association Table
pub const PID_PAT: u16 = 0x0000;
/// Null packet PID
pub const PID_NULL: u16 = 0x1fff;

/// Table ID of the Program Association Table
pub const TABLE_ID_PAT: u8 = 0x00;
/// Table ID of the Program Map Table
pub const TABLE_ID_PMT: u8 = 0x02;

// Re-export commonly used types
pub use adaptation::AdaptationField;
pub use container::Container;
pub use descriptor::Descriptor;
pub use header::TSHeader;
pub use packet::{Payload, RawData, TSPacket};
pub use pat::{PATEntry, PAT};
pub use pes::{is_valid_stream_id, StreamIdKind, PESHeader, PES};
pub use pmt::{is_valid_stream_type_id, ElementaryStreamInfo, PMT};
pub use psi::{PSITable, PSI};
