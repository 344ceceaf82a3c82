//! Configuration store
//!
//! Persists the [`MasterConfig`] as a checksummed image in a reserved region
//! at the top of flash, and owns the working copy of the active profile.
//!
//! Boot sequence: [`ConfigStore::ensure_valid`] (self-heals an empty or
//! corrupt image by writing factory defaults) followed by
//! [`ConfigStore::read`]. After that, a failing read or write is fatal: the
//! caller maps the error to a terminal failure indicator rather than flying
//! on unknown settings.

pub mod eeprom;
pub mod features;
pub mod master;
pub mod profile;

#[cfg(feature = "embassy")]
pub mod saver;

pub use eeprom::{EEPROM_CONF_VERSION, FLASH_TO_RESERVE_FOR_CONFIG};
pub use features::Features;
pub use master::{MasterConfig, MAX_PROFILE_COUNT};
pub use profile::Profile;

use crate::platform::error::PlatformError;
use crate::platform::traits::FlashInterface;
use crate::{log_error, log_info, log_warn};

/// Full image program attempts before giving up
const WRITE_ATTEMPTS: u32 = 3;

/// Flash programming word size
const WRITE_WORD_SIZE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored image failed header or checksum validation
    ContentInvalid,
    /// All write attempts or the post-write verification failed
    WriteFailed,
    /// Flash access error outside the retried program path
    Platform(PlatformError),
}

impl From<PlatformError> for ConfigError {
    fn from(err: PlatformError) -> Self {
        ConfigError::Platform(err)
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::ContentInvalid => write!(f, "stored configuration invalid"),
            ConfigError::WriteFailed => write!(f, "configuration write failed"),
            ConfigError::Platform(err) => write!(f, "platform error: {err}"),
        }
    }
}

/// Configuration store over a flash peripheral
pub struct ConfigStore<F: FlashInterface> {
    flash: F,
    master: MasterConfig,
    profile: Profile,
    /// Invariant image length, derived once at construction
    image_len: usize,
}

impl<F: FlashInterface> ConfigStore<F> {
    /// Create a store holding factory defaults in memory
    ///
    /// Nothing is read or written until [`ensure_valid`](Self::ensure_valid)
    /// or [`read`](Self::read) runs.
    pub fn new(flash: F) -> Self {
        let master = MasterConfig::defaults();
        let profile = master.profiles[0].clone();
        Self {
            flash,
            master,
            profile,
            image_len: eeprom::expected_image_len(),
        }
    }

    fn config_address(&self) -> u32 {
        self.flash.capacity() - FLASH_TO_RESERVE_FOR_CONFIG as u32
    }

    pub fn master(&self) -> &MasterConfig {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut MasterConfig {
        &mut self.master
    }

    /// The working copy of the active profile
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.profile
    }

    pub fn current_profile_index(&self) -> u8 {
        self.master.current_profile_index
    }

    pub fn flash_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    pub fn into_flash(self) -> F {
        self.flash
    }

    /// Whether the stored image passes header and checksum validation
    pub fn is_content_valid(&mut self) -> bool {
        let mut buf = [0u8; FLASH_TO_RESERVE_FOR_CONFIG];
        if self.flash.read(self.config_address(), &mut buf).is_err() {
            return false;
        }
        eeprom::is_image_valid(&buf, self.image_len)
    }

    /// Self-heal an invalid image by writing factory defaults
    ///
    /// No-op when the stored image is already valid.
    pub fn ensure_valid(&mut self) -> Result<(), ConfigError> {
        if self.is_content_valid() {
            return Ok(());
        }
        log_warn!("stored configuration invalid, resetting to defaults");
        self.reset_to_defaults()
    }

    /// Replace everything with factory defaults and persist them
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.master = MasterConfig::defaults();
        self.profile = self.master.profiles[0].clone();
        self.write()
    }

    /// Load the stored image into memory
    ///
    /// Clamps an out-of-range profile index to 0, copies the active slot into
    /// the working profile, and re-validates the feature flags.
    pub fn read(&mut self) -> Result<(), ConfigError> {
        let mut buf = [0u8; FLASH_TO_RESERVE_FOR_CONFIG];
        self.flash.read(self.config_address(), &mut buf)?;

        if !eeprom::is_image_valid(&buf, self.image_len) {
            return Err(ConfigError::ContentInvalid);
        }

        let mut master = eeprom::decode_image(&buf);
        if master.current_profile_index as usize >= MAX_PROFILE_COUNT {
            master.current_profile_index = 0;
        }
        features::validate_and_fix(&mut master.enabled_features);

        self.profile = master.profiles[master.current_profile_index as usize].clone();
        self.master = master;
        Ok(())
    }

    /// Persist the in-memory master configuration
    ///
    /// Erase-then-program in word units, up to [`WRITE_ATTEMPTS`] full
    /// attempts, then verify by re-validating the stored image.
    pub fn write(&mut self) -> Result<(), ConfigError> {
        let mut buf = [0u8; FLASH_TO_RESERVE_FOR_CONFIG];
        let Some(len) = eeprom::encode_image(&self.master, &mut buf) else {
            return Err(ConfigError::WriteFailed);
        };
        let address = self.config_address();
        let word_len = len.div_ceil(WRITE_WORD_SIZE) * WRITE_WORD_SIZE;

        let mut programmed = false;
        for attempt in 1..=WRITE_ATTEMPTS {
            if self.program_image(address, &buf[..word_len]).is_err() {
                log_warn!("configuration write attempt {} failed", attempt);
                continue;
            }
            programmed = true;
            break;
        }

        if !programmed {
            log_error!("configuration write exhausted all attempts");
            return Err(ConfigError::WriteFailed);
        }

        if !self.is_content_valid() {
            log_error!("configuration readback verification failed");
            return Err(ConfigError::WriteFailed);
        }

        log_info!("configuration written, {} bytes", len);
        Ok(())
    }

    fn program_image(&mut self, address: u32, image: &[u8]) -> Result<(), PlatformError> {
        self.flash
            .erase(address, FLASH_TO_RESERVE_FOR_CONFIG as u32)?;
        for (i, word) in image.chunks(WRITE_WORD_SIZE).enumerate() {
            self.flash
                .write(address + (i * WRITE_WORD_SIZE) as u32, word)?;
        }
        Ok(())
    }

    /// Switch the active profile
    ///
    /// The outgoing working profile is persisted into its slot first, then the
    /// new index is written and the image re-read so the working copy matches
    /// storage. Indices past the last slot are clamped.
    pub fn change_profile(&mut self, index: u8) -> Result<(), ConfigError> {
        let index = index.min(MAX_PROFILE_COUNT as u8 - 1);
        let current = self.master.current_profile_index as usize;
        self.master.profiles[current] = self.profile.clone();
        self.master.current_profile_index = index;
        self.write()?;
        self.read()
    }

    /// Persist the working profile into its slot and reload
    pub fn save_current_profile(&mut self) -> Result<(), ConfigError> {
        let current = self.master.current_profile_index as usize;
        self.master.profiles[current] = self.profile.clone();
        self.write()?;
        self.read()
    }

    pub fn feature(&self, mask: Features) -> bool {
        self.master.enabled_features.intersects(mask)
    }

    pub fn feature_set(&mut self, mask: Features) {
        self.master.enabled_features.insert(mask);
    }

    pub fn feature_clear(&mut self, mask: Features) {
        self.master.enabled_features.remove(mask);
    }

    pub fn feature_clear_all(&mut self) {
        self.master.enabled_features = Features::empty();
    }

    pub fn feature_mask(&self) -> Features {
        self.master.enabled_features
    }
}
