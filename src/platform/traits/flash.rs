//! Flash interface trait
//!
//! Non-volatile storage boundary used by the configuration store. Flash has
//! erase-before-write semantics: programming can only clear bits (1 -> 0), so a
//! block must be erased (all 0xFF) before fresh data is written into it.

use crate::platform::Result;

/// Flash peripheral interface
pub trait FlashInterface {
    /// Read `buf.len()` bytes starting at `address`
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()>;

    /// Program `data` starting at `address`
    ///
    /// The region must have been erased first; programming clears bits only.
    /// `address` does not need to be block-aligned.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// Erase `size` bytes starting at `address`
    ///
    /// Both `address` and `size` must be multiples of [`block_size`](Self::block_size).
    fn erase(&mut self, address: u32, size: u32) -> Result<()>;

    /// Erase block size in bytes
    fn block_size(&self) -> u32;

    /// Total flash capacity in bytes
    fn capacity(&self) -> u32;
}
