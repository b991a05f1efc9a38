//! The 20-byte page header: prev/next/cur page links, the free-space and
//! slot-count counters, and the page-type tag.

use binary_helpers::{read_le, write_le, BinaryError};
use paste::paste;

/// Total size in bytes of the page header.
pub const HEADER_SIZE: usize = 20;

macro_rules! impl_header_accessors {
    ($( $field:ident : $ty:ty = $offset:expr ),+ $(,)?) => {
        impl<'a> HeaderRef<'a> {
            $(
                paste! {
                    #[doc = concat!("Reads the `", stringify!($field), "` header field.")]
                    pub fn [<$field>](&self) -> Result<$ty, BinaryError> {
                        read_le::<$ty>(self.bytes, $offset)
                    }
                }
            )+
        }

        impl<'a> HeaderMut<'a> {
            $(
                paste! {
                    #[doc = concat!("Reads the `", stringify!($field), "` header field.")]
                    pub fn [<$field>](&self) -> Result<$ty, BinaryError> {
                        read_le::<$ty>(self.bytes, $offset)
                    }

                    #[doc = concat!("Writes the `", stringify!($field), "` header field.")]
                    pub fn [<set_ $field>](&mut self, value: $ty) -> Result<(), BinaryError> {
                        write_le::<$ty>(self.bytes, $offset, value)
                    }
                }
            )+
        }
    };
}

/// A read-only typed view over a page's header bytes.
pub struct HeaderRef<'a> {
    bytes: &'a [u8],
}

impl<'a> HeaderRef<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, BinaryError> {
        if bytes.len() != HEADER_SIZE {
            return Err(BinaryError::BytesSliceSizeMismatch {
                expected: HEADER_SIZE,
                from_offset: 0,
            });
        }
        Ok(Self { bytes })
    }
}

/// A mutable typed view over a page's header bytes.
pub struct HeaderMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> HeaderMut<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Result<Self, BinaryError> {
        if bytes.len() != HEADER_SIZE {
            return Err(BinaryError::BytesSliceSizeMismatch {
                expected: HEADER_SIZE,
                from_offset: 0,
            });
        }
        Ok(Self { bytes })
    }

    /// Resets every field to the state of a freshly allocated page of the
    /// given type: no prev/next link, `cur_page` set to its own id, no
    /// live records, and the whole body free.
    pub fn reset(&mut self, cur_page: i32, page_type: u16, body_len: u16) -> Result<(), BinaryError> {
        self.set_prev_page(crate::INVALID_PAGEID)?;
        self.set_next_page(crate::INVALID_PAGEID)?;
        self.set_cur_page(cur_page)?;
        self.set_free_space(body_len)?;
        self.set_slot_count(0)?;
        self.set_page_type(page_type)?;
        self.set_reserved(0)?;
        Ok(())
    }
}

impl_header_accessors!(
    prev_page: i32 = 0,
    next_page: i32 = 4,
    cur_page: i32 = 8,
    free_space: u16 = 12,
    slot_count: u16 = 14,
    page_type: u16 = 16,
    reserved: u16 = 18,
);
