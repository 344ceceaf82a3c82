//! Serial receiver front-end
//!
//! Frame parsing for the individual serial protocols lives in the UART
//! driver layer; this module holds the decoded channel values and the
//! frame-completion flag the aggregation loop polls. Channel counts per
//! provider match the protocols' frame formats.

use crate::rx::MIDRC_DEFAULT;
use heapless::Vec;

/// Widest serial frame (SBUS)
pub const MAX_SERIAL_CHANNEL_COUNT: usize = 16;

/// Serial receiver protocol selector, persisted as a small integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialRxProvider {
    Spektrum1024,
    Spektrum2048,
    Sbus,
    Sumd,
}

impl SerialRxProvider {
    /// Decode the persisted selector; unknown values fall back to the default
    pub fn from_index(index: u8) -> Self {
        match index {
            1 => SerialRxProvider::Spektrum2048,
            2 => SerialRxProvider::Sbus,
            3 => SerialRxProvider::Sumd,
            _ => SerialRxProvider::Spektrum1024,
        }
    }

    pub const fn index(self) -> u8 {
        match self {
            SerialRxProvider::Spektrum1024 => 0,
            SerialRxProvider::Spektrum2048 => 1,
            SerialRxProvider::Sbus => 2,
            SerialRxProvider::Sumd => 3,
        }
    }

    /// Channels carried by one frame of this protocol
    pub const fn channel_count(self) -> u8 {
        match self {
            SerialRxProvider::Spektrum1024 => 7,
            SerialRxProvider::Spektrum2048 => 8,
            SerialRxProvider::Sbus => 16,
            SerialRxProvider::Sumd => 8,
        }
    }
}

pub struct SerialReceiver {
    provider: SerialRxProvider,
    /// Sized to the provider's frame format
    channels: Vec<u16, MAX_SERIAL_CHANNEL_COUNT>,
    frame_flag: bool,
}

impl SerialReceiver {
    pub fn new(provider: SerialRxProvider, midrc: u16) -> Self {
        let mut channels = Vec::new();
        channels
            .resize(provider.channel_count() as usize, midrc)
            .ok();
        Self {
            provider,
            channels,
            frame_flag: false,
        }
    }

    pub fn provider(&self) -> SerialRxProvider {
        self.provider
    }

    pub const fn channel_count(&self) -> u8 {
        self.provider.channel_count()
    }

    /// Publish a decoded frame from the protocol parser
    ///
    /// Values beyond the provider's channel count are ignored; a short slice
    /// updates only the channels it carries.
    pub fn frame_received(&mut self, channels: &[u16]) {
        for (slot, &value) in self.channels.iter_mut().zip(channels) {
            *slot = value;
        }
        self.frame_flag = true;
    }

    /// Consume the frame-completion flag
    pub fn frame_complete(&mut self) -> bool {
        core::mem::replace(&mut self.frame_flag, false)
    }

    /// Last decoded value for `channel`, in microseconds
    pub fn read_raw(&self, channel: u8) -> u16 {
        self.channels
            .get(channel as usize)
            .copied()
            .unwrap_or(MIDRC_DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_start_at_midstick() {
        let rx = SerialReceiver::new(SerialRxProvider::Sbus, 1500);
        for channel in 0..16 {
            assert_eq!(rx.read_raw(channel), 1500);
        }
    }

    #[test]
    fn test_frame_flag_consumed_once() {
        let mut rx = SerialReceiver::new(SerialRxProvider::Sumd, 1500);
        assert!(!rx.frame_complete());

        rx.frame_received(&[1000, 1100, 1200, 1300, 1400, 1500, 1600, 1700]);
        assert!(rx.frame_complete());
        assert!(!rx.frame_complete());
    }

    #[test]
    fn test_frame_values_published() {
        let mut rx = SerialReceiver::new(SerialRxProvider::Spektrum2048, 1500);
        rx.frame_received(&[1000, 1100, 1200, 1300, 1400, 1500, 1600, 1700]);

        assert_eq!(rx.read_raw(0), 1000);
        assert_eq!(rx.read_raw(7), 1700);
    }

    #[test]
    fn test_excess_channels_ignored() {
        let mut rx = SerialReceiver::new(SerialRxProvider::Spektrum1024, 1500);
        let frame = [1100u16; 10];
        rx.frame_received(&frame);

        assert_eq!(rx.read_raw(6), 1100);
        // beyond the 7-channel provider, values stay at midstick
        assert_eq!(rx.read_raw(7), 1500);
    }

    #[test]
    fn test_provider_channel_counts() {
        assert_eq!(SerialRxProvider::Spektrum1024.channel_count(), 7);
        assert_eq!(SerialRxProvider::Spektrum2048.channel_count(), 8);
        assert_eq!(SerialRxProvider::Sbus.channel_count(), 16);
        assert_eq!(SerialRxProvider::Sumd.channel_count(), 8);
    }

    #[test]
    fn test_provider_index_round_trip() {
        for provider in [
            SerialRxProvider::Spektrum1024,
            SerialRxProvider::Spektrum2048,
            SerialRxProvider::Sbus,
            SerialRxProvider::Sumd,
        ] {
            assert_eq!(SerialRxProvider::from_index(provider.index()), provider);
        }
        // unknown selector falls back
        assert_eq!(
            SerialRxProvider::from_index(99),
            SerialRxProvider::Spektrum1024
        );
    }
}
