//! Little-endian fixed-width field helpers shared by every on-disk struct.

pub mod bin_error;
pub mod conversions;
pub mod le;

pub use bin_error::BinaryError;
pub use conversions::{ConversionError, UsizeConversion};
pub use le::{read_le, write_le, LittleEndianInteger};
