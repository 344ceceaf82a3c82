//! Channel injection over the telemetry link
//!
//! A ground station can drive the craft by pushing stick values through the
//! serial command protocol instead of a radio. The command handler calls
//! [`MspReceiver::frame_received`]; the aggregation loop treats it like any
//! other data-driven receiver.

use crate::rx::MIDRC_DEFAULT;

/// Channels carried by one channel-injection command
pub const MSP_CHANNEL_COUNT: usize = 8;

pub struct MspReceiver {
    channels: [u16; MSP_CHANNEL_COUNT],
    frame_flag: bool,
}

impl MspReceiver {
    pub const fn new(midrc: u16) -> Self {
        Self {
            channels: [midrc; MSP_CHANNEL_COUNT],
            frame_flag: false,
        }
    }

    pub const fn channel_count(&self) -> u8 {
        MSP_CHANNEL_COUNT as u8
    }

    /// Publish injected channel values from the command handler
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

    /// Last injected value for `channel`, in microseconds
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
    fn test_injection_round_trip() {
        let mut rx = MspReceiver::new(1500);
        assert_eq!(rx.read_raw(0), 1500);
        assert!(!rx.frame_complete());

        rx.frame_received(&[1000, 1200, 1400, 1600, 1800, 2000, 1100, 1300]);
        assert!(rx.frame_complete());
        assert!(!rx.frame_complete());
        assert_eq!(rx.read_raw(0), 1000);
        assert_eq!(rx.read_raw(7), 1300);
    }

    #[test]
    fn test_short_injection_updates_prefix() {
        let mut rx = MspReceiver::new(1500);
        rx.frame_received(&[1000, 2000]);

        assert_eq!(rx.read_raw(0), 1000);
        assert_eq!(rx.read_raw(1), 2000);
        assert_eq!(rx.read_raw(2), 1500);
    }
}
