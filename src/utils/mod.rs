//! # Utility Functions and Types
//!
//! Common utilities used by the packet codec:
//!
//! - Positional byte cursor for bounds-checked decoding
//! - MPEG-2 CRC32 calculation for PSI table trailers

/// Positional byte cursor for decoders
pub mod cursor;

/// CRC calculation implementations
pub mod crc;

// Re-export commonly used types
pub use crc::Crc32Mpeg2;
pub use cursor::Cursor;
