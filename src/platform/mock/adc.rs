//! Mock ADC implementation for testing

use crate::platform::{traits::{AdcChannel, AdcInterface}, Result};

/// Mock ADC returning scripted per-channel values
#[derive(Debug, Default)]
pub struct MockAdc {
    rssi: u16,
    battery: u16,
    current: u16,
}

impl MockAdc {
    /// Create a new mock ADC with all channels reading zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value returned for a channel
    pub fn set(&mut self, channel: AdcChannel, value: u16) {
        match channel {
            AdcChannel::Rssi => self.rssi = value,
            AdcChannel::Battery => self.battery = value,
            AdcChannel::Current => self.current = value,
        }
    }
}

impl AdcInterface for MockAdc {
    fn read(&mut self, channel: AdcChannel) -> Result<u16> {
        Ok(match channel {
            AdcChannel::Rssi => self.rssi,
            AdcChannel::Battery => self.battery,
            AdcChannel::Current => self.current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_values() {
        let mut adc = MockAdc::new();
        adc.set(AdcChannel::Rssi, 2048);

        assert_eq!(adc.read(AdcChannel::Rssi).unwrap(), 2048);
        assert_eq!(adc.read(AdcChannel::Battery).unwrap(), 0);
    }
}
