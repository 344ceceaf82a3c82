//! ADC interface trait

use crate::platform::Result;

/// ADC input channels used by the flight-control core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdcChannel {
    /// Dedicated RSSI input
    Rssi,
    /// Battery voltage divider
    Battery,
    /// Current sensor
    Current,
}

/// ADC peripheral interface
///
/// Conversions are 12-bit: the returned sample is in 0..=4095.
pub trait AdcInterface {
    /// Read one sample from the given channel
    fn read(&mut self, channel: AdcChannel) -> Result<u16>;
}
