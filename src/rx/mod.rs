//! RC receiver aggregation
//!
//! Owns the authoritative channel array consumed by the control loops. One
//! receiver front-end is active at a time; the aggregation loop polls it at a
//! 50 Hz floor, remaps stick channels, substitutes implausible pulses,
//! smooths poll-driven sources, and drives the failsafe state machine.

pub mod failsafe;
pub mod msp;
pub mod pulse;
pub mod serial;

pub use failsafe::{Failsafe, FailsafeConfig, FailsafePhase};
pub use msp::MspReceiver;
pub use pulse::{PpmReceiver, PwmReceiver, MAX_PULSE_INPUT_CHANNEL_COUNT};
pub use serial::{SerialReceiver, SerialRxProvider};

use crate::config::features::Features;
use crate::platform::traits::{AdcChannel, AdcInterface};

/// Size of the authoritative channel array
pub const MAX_SUPPORTED_RC_CHANNEL_COUNT: usize = 18;

/// Channels that participate in stick remapping
pub const REMAPPABLE_CHANNEL_COUNT: usize = 8;

/// Pulses outside [`PULSE_MIN`], [`PULSE_MAX`] are replaced with mid-stick
pub const PULSE_MIN: u16 = 750;
pub const PULSE_MAX: u16 = 2250;

/// Mid-stick fallback when no configuration is available
pub const MIDRC_DEFAULT: u16 = 1500;

/// Moving-average window for poll-driven receivers
const PPM_AND_PWM_SAMPLE_COUNT: usize = 4;

/// Floor processing interval (50 Hz), in microseconds
const DELAY_50_HZ_US: u32 = 1_000_000 / 50;

/// Channel letters in map-index order: the position of a letter in this string
/// is the channel function its position in a layout string is assigned to
pub const RC_CHANNEL_LETTERS: &str = "AERT1234";

/// RSSI output full scale
const RSSI_MAX_VALUE: u16 = 1023;

const RSSI_ADC_SAMPLE_COUNT: usize = 16;

/// Receiver aggregation settings, persisted in the master configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxConfig {
    /// Serial protocol selector, see [`SerialRxProvider::from_index`]
    pub serialrx_provider: u8,
    /// Stick center, in microseconds
    pub midrc: u16,
    /// Sticks below this count as low
    pub mincheck: u16,
    /// Sticks above this count as high
    pub maxcheck: u16,
    /// 1-based channel carrying RSSI, 0 to disable
    pub rssi_channel: u8,
    /// Function index for each of the first 8 physical channels
    pub rcmap: [u8; REMAPPABLE_CHANNEL_COUNT],
}

impl Default for RxConfig {
    fn default() -> Self {
        let mut rcmap = [0; REMAPPABLE_CHANNEL_COUNT];
        parse_rc_channels("AETR1234", &mut rcmap);
        Self {
            serialrx_provider: SerialRxProvider::Spektrum1024.index(),
            midrc: MIDRC_DEFAULT,
            mincheck: 1100,
            maxcheck: 1900,
            rssi_channel: 0,
            rcmap,
        }
    }
}

/// Parse a channel layout string like `"AETR1234"` into a channel map
///
/// Each letter's position in the input becomes the physical channel assigned
/// to that function. Unknown letters are skipped, and letters absent from the
/// input leave their map entry untouched.
pub fn parse_rc_channels(input: &str, rcmap: &mut [u8; REMAPPABLE_CHANNEL_COUNT]) {
    for (position, letter) in input.chars().enumerate().take(REMAPPABLE_CHANNEL_COUNT) {
        if let Some(function) = RC_CHANNEL_LETTERS.find(letter) {
            rcmap[function] = position as u8;
        }
    }
}

/// The active receiver front-end
pub enum Receiver {
    /// No receiver: every channel reads mid-stick
    None,
    ParallelPwm(PwmReceiver),
    Ppm(PpmReceiver),
    Serial(SerialReceiver),
    Msp(MspReceiver),
}

impl Receiver {
    /// Select the front-end from the enabled feature flags
    ///
    /// When several receiver features survive validation, injection wins over
    /// serial, which wins over PPM, which wins over parallel PWM.
    pub fn from_features(features: Features, config: &RxConfig) -> Self {
        if features.contains(Features::RX_MSP) {
            Receiver::Msp(MspReceiver::new(config.midrc))
        } else if features.contains(Features::RX_SERIAL) {
            Receiver::Serial(SerialReceiver::new(
                SerialRxProvider::from_index(config.serialrx_provider),
                config.midrc,
            ))
        } else if features.contains(Features::RX_PPM) {
            Receiver::Ppm(PpmReceiver::new())
        } else if features.contains(Features::RX_PARALLEL_PWM) {
            Receiver::ParallelPwm(PwmReceiver::new())
        } else {
            Receiver::None
        }
    }

    /// Channels this front-end publishes
    pub fn channel_count(&self) -> u8 {
        match self {
            Receiver::None => MAX_PULSE_INPUT_CHANNEL_COUNT as u8,
            Receiver::ParallelPwm(_) | Receiver::Ppm(_) => MAX_PULSE_INPUT_CHANNEL_COUNT as u8,
            Receiver::Serial(rx) => rx.channel_count(),
            Receiver::Msp(rx) => rx.channel_count(),
        }
    }

    /// Whether fresh data is announced by frames rather than polled pulses
    pub fn is_data_driven(&self) -> bool {
        matches!(self, Receiver::None | Receiver::Serial(_) | Receiver::Msp(_))
    }

    /// Last raw value for `channel`, in microseconds
    pub fn read_raw(&self, channel: u8) -> u16 {
        match self {
            Receiver::None => MIDRC_DEFAULT,
            Receiver::ParallelPwm(rx) => rx.read_raw(channel),
            Receiver::Ppm(rx) => rx.read_raw(channel),
            Receiver::Serial(rx) => rx.read_raw(channel),
            Receiver::Msp(rx) => rx.read_raw(channel),
        }
    }

    /// Consume the frame-completion flag of a data-driven front-end
    pub fn frame_complete(&mut self) -> bool {
        match self {
            Receiver::Serial(rx) => rx.frame_complete(),
            Receiver::Msp(rx) => rx.frame_complete(),
            _ => false,
        }
    }
}

struct RssiAdcState {
    samples: [u8; RSSI_ADC_SAMPLE_COUNT],
    sample_index: usize,
    update_at: u32,
}

impl RssiAdcState {
    const fn new() -> Self {
        Self {
            samples: [0; RSSI_ADC_SAMPLE_COUNT],
            sample_index: 0,
            update_at: 0,
        }
    }
}

/// Channel aggregation state
pub struct RxSystem {
    config: RxConfig,
    features: Features,
    receiver: Receiver,
    channel_count: u8,
    rc_data: [u16; MAX_SUPPORTED_RC_CHANNEL_COUNT],
    rc_data_received: bool,
    rx_update_at: u32,
    rc_sample_index: u32,
    samples_collected: bool,
    rc_samples: [[u16; PPM_AND_PWM_SAMPLE_COUNT]; MAX_PULSE_INPUT_CHANNEL_COUNT],
    rssi: u16,
    rssi_adc: RssiAdcState,
}

impl RxSystem {
    pub fn new(config: RxConfig, features: Features, receiver: Receiver) -> Self {
        let channel_count = receiver.channel_count();
        Self {
            config,
            features,
            receiver,
            channel_count,
            rc_data: [config.midrc; MAX_SUPPORTED_RC_CHANNEL_COUNT],
            rc_data_received: false,
            rx_update_at: 0,
            rc_sample_index: 0,
            samples_collected: false,
            rc_samples: [[0; PPM_AND_PWM_SAMPLE_COUNT]; MAX_PULSE_INPUT_CHANNEL_COUNT],
            rssi: 0,
            rssi_adc: RssiAdcState::new(),
        }
    }

    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut Receiver {
        &mut self.receiver
    }

    pub fn channel_count(&self) -> u8 {
        self.channel_count
    }

    /// The authoritative, remapped channel array
    pub fn rc_data(&self) -> &[u16; MAX_SUPPORTED_RC_CHANNEL_COUNT] {
        &self.rc_data
    }

    /// One remapped channel value
    pub fn channel(&self, index: usize) -> u16 {
        self.rc_data
            .get(index)
            .copied()
            .unwrap_or(self.config.midrc)
    }

    /// Poll the front-end for a completed frame
    ///
    /// A completed frame is proof of a live link, so it clears the failsafe
    /// loss counter immediately.
    pub fn update_rx(&mut self, failsafe: &mut Failsafe) {
        self.rc_data_received = self.receiver.frame_complete();
        if self.rc_data_received && self.features.contains(Features::FAILSAFE) {
            failsafe.reset();
        }
    }

    /// Whether channel processing is due at time `now` (microseconds)
    ///
    /// Due when a frame is pending or the 50 Hz deadline passed. The deadline
    /// comparison wraps with the 32-bit clock.
    pub fn should_process_rx(&self, now: u32) -> bool {
        self.rc_data_received || (now.wrapping_sub(self.rx_update_at) as i32) >= 0
    }

    /// Run one channel processing tick at time `now` (microseconds)
    pub fn calculate_rx_channels_and_update_failsafe(&mut self, now: u32, failsafe: &mut Failsafe) {
        self.rx_update_at = now.wrapping_add(DELAY_50_HZ_US);

        if self.features.contains(Features::FAILSAFE) {
            failsafe.increment_counter();
        }

        if self.receiver.is_data_driven() {
            self.process_data_driven(failsafe);
        } else {
            self.process_poll_driven(failsafe);
        }
    }

    fn process_data_driven(&mut self, failsafe: &mut Failsafe) {
        if !self.rc_data_received {
            return;
        }
        if self.features.contains(Features::FAILSAFE) {
            failsafe.reset();
        }
        self.process_rx_channels(failsafe);
        self.rc_data_received = false;
    }

    fn process_poll_driven(&mut self, failsafe: &mut Failsafe) {
        self.rc_sample_index += 1;
        self.process_rx_channels(failsafe);
    }

    fn process_rx_channels(&mut self, failsafe: &mut Failsafe) {
        let mut should_check_pulse = true;

        if self
            .features
            .intersects(Features::FAILSAFE | Features::RX_PPM)
        {
            if let Receiver::Ppm(ppm) = &mut self.receiver {
                should_check_pulse = ppm.is_receiving();
                ppm.reset_received_state();
            } else {
                should_check_pulse = false;
            }
        }

        for chan in 0..self.channel_count as usize {
            if matches!(self.receiver, Receiver::None) {
                self.rc_data[chan] = self.config.midrc;
                continue;
            }

            let raw_channel = self.remap_channel(chan);
            let mut sample = self.receiver.read_raw(raw_channel);

            if self.features.contains(Features::FAILSAFE) && should_check_pulse {
                failsafe.check_pulse(raw_channel, sample);
            }

            if !(PULSE_MIN..=PULSE_MAX).contains(&sample) {
                sample = self.config.midrc;
            }

            self.rc_data[chan] = if self.receiver.is_data_driven() {
                sample
            } else {
                self.smooth_poll_driven_sample(chan, sample)
            };
        }
    }

    /// Map a function channel to the physical channel carrying it
    ///
    /// Channels past the remappable range pass through unchanged.
    fn remap_channel(&self, chan: usize) -> u8 {
        if chan < REMAPPABLE_CHANNEL_COUNT {
            self.config.rcmap[chan]
        } else {
            chan as u8
        }
    }

    /// Four-sample moving average for pulse-decoded channels
    ///
    /// Raw values pass through until the first window fills.
    fn smooth_poll_driven_sample(&mut self, chan: usize, sample: u16) -> u16 {
        let slot = (self.rc_sample_index as usize) % PPM_AND_PWM_SAMPLE_COUNT;
        self.rc_samples[chan][slot] = sample;

        if !self.samples_collected {
            if (self.rc_sample_index as usize) < PPM_AND_PWM_SAMPLE_COUNT {
                return sample;
            }
            self.samples_collected = true;
        }

        let sum: u32 = self.rc_samples[chan].iter().map(|&s| s as u32).sum();
        (sum / PPM_AND_PWM_SAMPLE_COUNT as u32) as u16
    }

    /// Current RSSI on the 0..=1023 scale
    pub fn rssi(&self) -> u16 {
        self.rssi
    }

    /// Refresh RSSI from the configured source
    ///
    /// A configured RSSI channel takes priority over the ADC source.
    pub fn update_rssi<A: AdcInterface>(&mut self, now: u32, adc: &mut A) {
        if self.config.rssi_channel > 0 {
            self.update_rssi_from_channel();
        } else if self.features.contains(Features::RSSI_ADC) {
            self.update_rssi_from_adc(now, adc);
        }
    }

    fn update_rssi_from_channel(&mut self) {
        let channel = (self.config.rssi_channel - 1) as usize;
        let value = self.channel(channel) as i32;
        let constrained = (value - 1000).clamp(0, 1000) as u32;
        self.rssi = scale_to_rssi(constrained, 1000);
    }

    fn update_rssi_from_adc<A: AdcInterface>(&mut self, now: u32, adc: &mut A) {
        if (now.wrapping_sub(self.rssi_adc.update_at) as i32) < 0 {
            return;
        }
        self.rssi_adc.update_at = now.wrapping_add(DELAY_50_HZ_US);

        let Ok(raw) = adc.read(AdcChannel::Rssi) else {
            return;
        };
        let percent = ((raw as u32) * 100 / 4095) as u8;

        self.rssi_adc.sample_index = (self.rssi_adc.sample_index + 1) % RSSI_ADC_SAMPLE_COUNT;
        self.rssi_adc.samples[self.rssi_adc.sample_index] = percent;

        let sum: u32 = self.rssi_adc.samples.iter().map(|&s| s as u32).sum();
        let mean = (sum / RSSI_ADC_SAMPLE_COUNT as u32).min(100);
        self.rssi = scale_to_rssi(mean, 100);
    }
}

/// Scale `value` out of `full_scale` onto 0..=1023, rounding to nearest
fn scale_to_rssi(value: u32, full_scale: u32) -> u16 {
    ((value * RSSI_MAX_VALUE as u32 + full_scale / 2) / full_scale) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockAdc;

    fn poll_system_with(frame: &[u16; 8]) -> (RxSystem, Failsafe) {
        let features = Features::RX_PPM | Features::FAILSAFE;
        let config = RxConfig::default();
        let mut ppm = PpmReceiver::new();
        let mut t: u16 = 0;
        t = t.wrapping_add(4000);
        ppm.on_edge(t);
        for &w in frame {
            t = t.wrapping_add(w);
            ppm.on_edge(t);
        }
        let rx = RxSystem::new(config, features, Receiver::Ppm(ppm));
        (rx, Failsafe::default())
    }

    #[test]
    fn test_rc_data_initialized_to_midstick() {
        let rx = RxSystem::new(RxConfig::default(), Features::empty(), Receiver::None);
        assert!(rx.rc_data().iter().all(|&v| v == 1500));
    }

    #[test]
    fn test_parse_rc_channels_default_layout() {
        let mut rcmap = [0; REMAPPABLE_CHANNEL_COUNT];
        parse_rc_channels("AETR1234", &mut rcmap);
        // A=0 E=1 T=3 R=2, aux passthrough
        assert_eq!(rcmap, [0, 1, 3, 2, 4, 5, 6, 7]);
    }

    #[test]
    fn test_parse_rc_channels_taer() {
        let mut rcmap = [0; REMAPPABLE_CHANNEL_COUNT];
        parse_rc_channels("TAER1234", &mut rcmap);
        // roll on input 1, pitch on 2, throttle on 0, yaw on 3
        assert_eq!(rcmap, [1, 2, 3, 0, 4, 5, 6, 7]);
    }

    #[test]
    fn test_parse_rc_channels_ignores_unknown_letters() {
        let mut rcmap = RxConfig::default().rcmap;
        let before = rcmap;
        parse_rc_channels("XYZW", &mut rcmap);
        assert_eq!(rcmap, before);
    }

    #[test]
    fn test_remap_applies_to_rc_data() {
        let (mut rx, mut fs) = poll_system_with(&[1000, 1100, 1200, 1300, 1400, 1500, 1600, 1700]);
        // warm the moving average past its fill window with the same frame
        for i in 0..5 {
            rx.calculate_rx_channels_and_update_failsafe(i * 20_000, &mut fs);
        }
        // default AETR: roll=input0, pitch=input1, throttle=input2, yaw=input3
        // function order is AERT: index 2 is yaw, index 3 throttle
        assert_eq!(rx.channel(0), 1000);
        assert_eq!(rx.channel(1), 1100);
        assert_eq!(rx.channel(2), 1300);
        assert_eq!(rx.channel(3), 1200);
        assert_eq!(rx.channel(7), 1700);
    }

    #[test]
    fn test_out_of_range_pulse_replaced_with_midstick() {
        let features = Features::RX_SERIAL;
        let config = RxConfig::default();
        let mut serial = SerialReceiver::new(SerialRxProvider::Sbus, config.midrc);
        serial.frame_received(&[749, 750, 2250, 2251]);
        let mut rx = RxSystem::new(config, features, Receiver::Serial(serial));
        let mut fs = Failsafe::default();

        rx.update_rx(&mut fs);
        rx.calculate_rx_channels_and_update_failsafe(0, &mut fs);

        assert_eq!(rx.channel(0), 1500); // input 0, below minimum
        assert_eq!(rx.channel(1), 750); // input 1, boundary accepted
        assert_eq!(rx.channel(3), 2250); // input 2, boundary accepted
        assert_eq!(rx.channel(2), 1500); // input 3, above maximum
    }

    #[test]
    fn test_moving_average_warmup_and_steady_state() {
        let features = Features::RX_PPM;
        let mut config = RxConfig::default();
        // identity map so input 0 lands on channel 0
        config.rcmap = [0, 1, 2, 3, 4, 5, 6, 7];
        let mut rx = RxSystem::new(config, features, Receiver::Ppm(PpmReceiver::new()));
        let mut fs = Failsafe::default();

        let feed = |rx: &mut RxSystem, width: u16| {
            if let Receiver::Ppm(ppm) = rx.receiver_mut() {
                ppm.on_edge(0);
                ppm.on_overflow(0xFFFF);
                let mut t: u16 = 4000;
                ppm.on_edge(t);
                t = t.wrapping_add(width);
                ppm.on_edge(t);
            }
        };

        let samples = [1000u16, 1100, 1200, 1300, 1400];
        let mut outputs = [0u16; 5];
        for (i, &s) in samples.iter().enumerate() {
            feed(&mut rx, s);
            rx.calculate_rx_channels_and_update_failsafe(i as u32 * 20_000, &mut fs);
            outputs[i] = rx.channel(0);
        }

        // raw pass-through while the window fills
        assert_eq!(outputs[0], 1000);
        assert_eq!(outputs[1], 1100);
        assert_eq!(outputs[2], 1200);
        // first averaged outputs
        assert_eq!(outputs[3], 1150);
        assert_eq!(outputs[4], 1250);
    }

    #[test]
    fn test_should_process_rx_deadline() {
        let mut rx = RxSystem::new(RxConfig::default(), Features::empty(), Receiver::None);
        let mut fs = Failsafe::default();

        rx.calculate_rx_channels_and_update_failsafe(100_000, &mut fs);
        assert!(!rx.should_process_rx(100_001));
        assert!(!rx.should_process_rx(119_999));
        assert!(rx.should_process_rx(120_000));
        assert!(rx.should_process_rx(150_000));
    }

    #[test]
    fn test_should_process_rx_wraps_with_clock() {
        let mut rx = RxSystem::new(RxConfig::default(), Features::empty(), Receiver::None);
        let mut fs = Failsafe::default();

        // deadline lands past the 32-bit wrap point
        rx.calculate_rx_channels_and_update_failsafe(u32::MAX - 5_000, &mut fs);
        assert!(!rx.should_process_rx(u32::MAX - 1_000));
        assert!(rx.should_process_rx(15_001));
    }

    #[test]
    fn test_pending_frame_forces_processing() {
        let features = Features::RX_MSP;
        let config = RxConfig::default();
        let mut rx = RxSystem::new(config, features, Receiver::Msp(MspReceiver::new(1500)));
        let mut fs = Failsafe::default();

        rx.calculate_rx_channels_and_update_failsafe(0, &mut fs);
        assert!(!rx.should_process_rx(1));

        if let Receiver::Msp(msp) = rx.receiver_mut() {
            msp.frame_received(&[1600; 8]);
        }
        rx.update_rx(&mut fs);
        assert!(rx.should_process_rx(1));
    }

    #[test]
    fn test_data_driven_tick_without_frame_is_a_no_op() {
        let features = Features::RX_SERIAL;
        let config = RxConfig::default();
        let mut serial = SerialReceiver::new(SerialRxProvider::Sbus, config.midrc);
        serial.frame_received(&[1700; 16]);
        let mut rx = RxSystem::new(config, features, Receiver::Serial(serial));
        let mut fs = Failsafe::default();

        // frame sits in the decoder but was never announced via update_rx
        rx.calculate_rx_channels_and_update_failsafe(0, &mut fs);
        assert_eq!(rx.channel(0), 1500);

        rx.update_rx(&mut fs);
        rx.calculate_rx_channels_and_update_failsafe(20_000, &mut fs);
        assert_eq!(rx.channel(0), 1700);
    }

    #[test]
    fn test_frame_completion_resets_failsafe() {
        let features = Features::RX_SERIAL | Features::FAILSAFE;
        let config = RxConfig::default();
        let mut serial = SerialReceiver::new(SerialRxProvider::Sbus, config.midrc);
        serial.frame_received(&[1500; 16]);
        let mut rx = RxSystem::new(config, features, Receiver::Serial(serial));
        let mut fs = Failsafe::default();

        for i in 0..10 {
            rx.calculate_rx_channels_and_update_failsafe(i * 20_000, &mut fs);
        }
        assert_eq!(fs.counter(), 10);

        if let Receiver::Serial(s) = rx.receiver_mut() {
            s.frame_received(&[1500; 16]);
        }
        rx.update_rx(&mut fs);
        assert_eq!(fs.counter(), 0);
    }

    #[test]
    fn test_ppm_pulses_feed_failsafe() {
        let (mut rx, mut fs) = poll_system_with(&[1500; 8]);
        for _ in 0..10 {
            fs.increment_counter();
        }
        // the stored frame marks the data-received flag, so pulses are judged
        rx.calculate_rx_channels_and_update_failsafe(0, &mut fs);
        assert_eq!(fs.counter(), 0);
    }

    #[test]
    fn test_ppm_silence_skips_pulse_check() {
        let (mut rx, mut fs) = poll_system_with(&[1500; 8]);
        // consume the received flag
        rx.calculate_rx_channels_and_update_failsafe(0, &mut fs);
        fs.reset();

        // no new edges: subsequent ticks only grow the counter
        for i in 1..=30u32 {
            rx.calculate_rx_channels_and_update_failsafe(i * 20_000, &mut fs);
        }
        assert_eq!(fs.counter(), 30);
        assert_eq!(fs.phase(), FailsafePhase::RxLossDetected);
    }

    #[test]
    fn test_no_receiver_reads_midstick() {
        let mut config = RxConfig::default();
        config.midrc = 1502;
        let mut rx = RxSystem::new(config, Features::empty(), Receiver::None);
        let mut fs = Failsafe::default();

        rx.calculate_rx_channels_and_update_failsafe(0, &mut fs);
        for chan in 0..rx.channel_count() as usize {
            assert_eq!(rx.channel(chan), 1502);
        }
    }

    #[test]
    fn test_rssi_from_channel_midstick() {
        let mut config = RxConfig::default();
        config.rssi_channel = 9;
        let features = Features::RX_SERIAL;
        let mut serial = SerialReceiver::new(SerialRxProvider::Sbus, config.midrc);
        serial.frame_received(&[1500; 16]);
        let mut rx = RxSystem::new(config, features, Receiver::Serial(serial));
        let mut fs = Failsafe::default();
        rx.update_rx(&mut fs);
        rx.calculate_rx_channels_and_update_failsafe(0, &mut fs);

        let mut adc = MockAdc::new();
        rx.update_rssi(0, &mut adc);
        assert_eq!(rx.rssi(), 512);
    }

    #[test]
    fn test_rssi_from_channel_extremes() {
        let mut config = RxConfig::default();
        config.rssi_channel = 1;
        let features = Features::RX_SERIAL;
        let mut serial = SerialReceiver::new(SerialRxProvider::Sbus, config.midrc);
        serial.frame_received(&[1000; 16]);
        let mut rx = RxSystem::new(config, features, Receiver::Serial(serial));
        let mut fs = Failsafe::default();
        rx.update_rx(&mut fs);
        rx.calculate_rx_channels_and_update_failsafe(0, &mut fs);

        let mut adc = MockAdc::new();
        rx.update_rssi(0, &mut adc);
        assert_eq!(rx.rssi(), 0);

        if let Receiver::Serial(s) = rx.receiver_mut() {
            s.frame_received(&[2000; 16]);
        }
        rx.update_rx(&mut fs);
        rx.calculate_rx_channels_and_update_failsafe(20_000, &mut fs);
        rx.update_rssi(20_000, &mut adc);
        assert_eq!(rx.rssi(), 1023);
    }

    #[test]
    fn test_rssi_channel_takes_priority_over_adc() {
        let mut config = RxConfig::default();
        config.rssi_channel = 1;
        let features = Features::RSSI_ADC;
        let mut rx = RxSystem::new(config, features, Receiver::None);
        let mut fs = Failsafe::default();
        rx.calculate_rx_channels_and_update_failsafe(0, &mut fs);

        let mut adc = MockAdc::new();
        adc.set(AdcChannel::Rssi, 4095);
        rx.update_rssi(0, &mut adc);
        // mid-stick channel value, not the saturated ADC reading
        assert_eq!(rx.rssi(), 512);
    }

    #[test]
    fn test_rssi_adc_averages_ring() {
        let config = RxConfig::default();
        let features = Features::RSSI_ADC;
        let mut rx = RxSystem::new(config, features, Receiver::None);
        let mut adc = MockAdc::new();
        adc.set(AdcChannel::Rssi, 4095); // 100%

        // one sample into a zeroed 16-slot ring: mean is 6%
        rx.update_rssi(0, &mut adc);
        assert_eq!(rx.rssi(), 61);

        // fill the ring, respecting the 20 ms cadence
        let mut now = 0u32;
        for _ in 0..16 {
            now = now.wrapping_add(20_000);
            rx.update_rssi(now, &mut adc);
        }
        assert_eq!(rx.rssi(), 1023);
    }

    #[test]
    fn test_rssi_adc_respects_cadence() {
        let config = RxConfig::default();
        let features = Features::RSSI_ADC;
        let mut rx = RxSystem::new(config, features, Receiver::None);
        let mut adc = MockAdc::new();
        adc.set(AdcChannel::Rssi, 4095);

        rx.update_rssi(0, &mut adc);
        let first = rx.rssi();
        // too soon: no new sample taken
        rx.update_rssi(5_000, &mut adc);
        assert_eq!(rx.rssi(), first);
    }

    #[test]
    fn test_receiver_selection_priority() {
        let config = RxConfig::default();
        let all = Features::RX_MSP | Features::RX_SERIAL | Features::RX_PPM;
        assert!(matches!(
            Receiver::from_features(all, &config),
            Receiver::Msp(_)
        ));
        assert!(matches!(
            Receiver::from_features(Features::RX_SERIAL | Features::RX_PPM, &config),
            Receiver::Serial(_)
        ));
        assert!(matches!(
            Receiver::from_features(Features::RX_PPM, &config),
            Receiver::Ppm(_)
        ));
        assert!(matches!(
            Receiver::from_features(Features::RX_PARALLEL_PWM, &config),
            Receiver::ParallelPwm(_)
        ));
        assert!(matches!(
            Receiver::from_features(Features::empty(), &config),
            Receiver::None
        ));
    }
}
