//! Mock Flash implementation for testing
//!
//! Provides in-memory flash simulation for unit tests, modeled on the reference
//! board: 128 KiB total, 1 KiB erase pages, configuration stored in the last
//! two pages.

use crate::platform::{error::FlashError, traits::FlashInterface, Result};

/// Erase page size (1 KiB)
const PAGE_SIZE: u32 = 0x400;

/// Flash capacity (128 KiB)
const FLASH_CAPACITY: u32 = 0x20000;

/// Protected firmware region (everything below the reserved configuration area)
const FIRMWARE_SIZE: u32 = FLASH_CAPACITY - 0x800;

/// Mock flash implementation
///
/// Simulates flash storage in memory for testing. Supports:
/// - Read/write/erase with real flash semantics (write clears bits only)
/// - Erase count tracking per page
/// - Scheduled write/erase failures for exercising retry paths
/// - Corruption injection for validation tests
pub struct MockFlash {
    /// Flash contents (0xFF is the erased state)
    storage: [u8; FLASH_CAPACITY as usize],
    /// Erase count per page
    erase_counts: [u32; (FLASH_CAPACITY / PAGE_SIZE) as usize],
    /// Number of upcoming write calls that fail
    fail_writes: u32,
    /// Number of upcoming erase calls that fail
    fail_erases: u32,
}

impl MockFlash {
    /// Create a new mock flash instance, fully erased
    pub fn new() -> Self {
        Self {
            storage: [0xFF; FLASH_CAPACITY as usize],
            erase_counts: [0; (FLASH_CAPACITY / PAGE_SIZE) as usize],
            fail_writes: 0,
            fail_erases: 0,
        }
    }

    /// Make the next `count` write calls fail with `FlashError::WriteFailed`
    pub fn fail_next_writes(&mut self, count: u32) {
        self.fail_writes = count;
    }

    /// Make the next `count` erase calls fail with `FlashError::EraseFailed`
    pub fn fail_next_erases(&mut self, count: u32) {
        self.fail_erases = count;
    }

    /// Get flash contents (for test verification)
    pub fn contents(&self, address: u32, len: usize) -> &[u8] {
        &self.storage[address as usize..address as usize + len]
    }

    /// Overwrite bytes directly, bypassing program semantics
    ///
    /// Used by tests to corrupt stored data in ways programming cannot
    /// (setting bits without an erase).
    pub fn patch(&mut self, address: u32, data: &[u8]) {
        self.storage[address as usize..address as usize + data.len()].copy_from_slice(data);
    }

    /// Number of times the page containing `address` has been erased
    pub fn erase_count(&self, address: u32) -> u32 {
        self.erase_counts[(address / PAGE_SIZE) as usize]
    }

    fn is_writable(&self, address: u32) -> bool {
        (FIRMWARE_SIZE..FLASH_CAPACITY).contains(&address)
    }
}

impl Default for MockFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashInterface for MockFlash {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> Result<()> {
        let end = address as usize + buf.len();
        if end > FLASH_CAPACITY as usize {
            return Err(FlashError::InvalidAddress.into());
        }

        buf.copy_from_slice(&self.storage[address as usize..end]);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        if !self.is_writable(address) {
            return Err(FlashError::InvalidAddress.into());
        }
        if address as usize + data.len() > FLASH_CAPACITY as usize {
            return Err(FlashError::InvalidAddress.into());
        }

        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(FlashError::WriteFailed.into());
        }

        // Programming can only clear bits (1 -> 0)
        for (i, &byte) in data.iter().enumerate() {
            self.storage[address as usize + i] &= byte;
        }
        Ok(())
    }

    fn erase(&mut self, address: u32, size: u32) -> Result<()> {
        if !self.is_writable(address) {
            return Err(FlashError::InvalidAddress.into());
        }
        if address % PAGE_SIZE != 0 || size % PAGE_SIZE != 0 {
            return Err(FlashError::InvalidAddress.into());
        }
        if address + size > FLASH_CAPACITY {
            return Err(FlashError::InvalidAddress.into());
        }

        if self.fail_erases > 0 {
            self.fail_erases -= 1;
            return Err(FlashError::EraseFailed.into());
        }

        for byte in &mut self.storage[address as usize..(address + size) as usize] {
            *byte = 0xFF;
        }

        let first_page = (address / PAGE_SIZE) as usize;
        for page in 0..(size / PAGE_SIZE) as usize {
            self.erase_counts[first_page + page] += 1;
        }
        Ok(())
    }

    fn block_size(&self) -> u32 {
        PAGE_SIZE
    }

    fn capacity(&self) -> u32 {
        FLASH_CAPACITY
    }
}
