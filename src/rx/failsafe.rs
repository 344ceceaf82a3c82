//! Signal-loss failsafe state machine
//!
//! Driven at the 50 Hz channel processing cadence: every processing tick
//! increments a loss counter, and evidence of a live link (a completed serial
//! frame, or plausible pulses on all four stick channels) resets it. When the
//! counter runs long enough the machine commits to an autonomous descent and
//! finally to motor cutoff.

/// Processing ticks per 0.1 s at the 50 Hz cadence
const TICKS_PER_DECISECOND: u32 = 5;

/// Ticks of continuous loss before the link is declared down (0.4 s)
const RX_LOSS_TICKS: u32 = 20;

/// Stick channels whose pulses must all look plausible to clear the counter
const GOOD_PULSE_CHANNEL_COUNT: u8 = 4;
const ALL_CHANNELS_GOOD: u8 = (1 << GOOD_PULSE_CHANNEL_COUNT) - 1;

/// Failsafe tuning, persisted in the control profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailsafeConfig {
    /// Guard time before the landing phase engages, in 0.1 s units
    pub failsafe_delay: u8,
    /// Landing phase duration before motors stop, in 0.1 s units
    pub failsafe_off_delay: u8,
    /// Throttle commanded while descending
    pub failsafe_throttle: u16,
    /// Pulses at or below this are implausible
    pub failsafe_min_usec: u16,
    /// Pulses at or above this are implausible
    pub failsafe_max_usec: u16,
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            failsafe_delay: 10,       // 1 s
            failsafe_off_delay: 200,  // 20 s
            failsafe_throttle: 1200,
            failsafe_min_usec: 985,
            failsafe_max_usec: 2115,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailsafePhase {
    /// Link healthy or loss too brief to act on
    Idle,
    /// Link declared down, waiting out the guard time
    RxLossDetected,
    /// Autonomous descent at the configured failsafe throttle
    Landing,
    /// Motors cut; terminal until explicitly rearmed
    Landed,
}

pub struct Failsafe {
    config: FailsafeConfig,
    counter: u32,
    good_pulse_channels: u8,
    phase: FailsafePhase,
}

impl Failsafe {
    pub const fn new(config: FailsafeConfig) -> Self {
        Self {
            config,
            counter: 0,
            good_pulse_channels: 0,
            phase: FailsafePhase::Idle,
        }
    }

    pub fn phase(&self) -> FailsafePhase {
        self.phase
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn config(&self) -> &FailsafeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: FailsafeConfig) {
        self.config = config;
    }

    /// Signal recovered: clear the loss counter
    ///
    /// Called when a data-driven receiver completes a frame. Does not leave
    /// the `Landed` phase; a cut-off craft stays cut off until [`rearm`].
    ///
    /// [`rearm`]: Failsafe::rearm
    pub fn reset(&mut self) {
        self.counter = 0;
        self.good_pulse_channels = 0;
        if self.phase != FailsafePhase::Landed {
            self.phase = FailsafePhase::Idle;
        }
    }

    /// One 50 Hz processing tick without confirmed signal
    pub fn increment_counter(&mut self) {
        self.counter = self.counter.saturating_add(1);
        self.update_phase();
    }

    /// Judge one raw stick-channel pulse
    ///
    /// Pulses strictly inside (min_usec, max_usec) on channels 0..3 accumulate;
    /// once all four have been seen plausible the link is considered alive and
    /// the counter clears, unless the machine has already committed to landing.
    pub fn check_pulse(&mut self, channel: u8, pulse_duration: u16) {
        if channel < GOOD_PULSE_CHANNEL_COUNT
            && pulse_duration > self.config.failsafe_min_usec
            && pulse_duration < self.config.failsafe_max_usec
        {
            self.good_pulse_channels |= 1 << channel;
        }

        if self.good_pulse_channels == ALL_CHANNELS_GOOD {
            self.good_pulse_channels = 0;
            if matches!(self.phase, FailsafePhase::Idle | FailsafePhase::RxLossDetected) {
                self.counter = 0;
                self.phase = FailsafePhase::Idle;
            }
        }
    }

    /// Whether the descent phase is commanding the failsafe throttle
    pub fn should_force_landing(&self) -> bool {
        self.phase == FailsafePhase::Landing
    }

    /// Whether motors have been cut
    pub fn has_landed(&self) -> bool {
        self.phase == FailsafePhase::Landed
    }

    /// Leave the terminal `Landed` phase after operator intervention
    pub fn rearm(&mut self) {
        self.counter = 0;
        self.good_pulse_channels = 0;
        self.phase = FailsafePhase::Idle;
    }

    fn update_phase(&mut self) {
        let landing_at = RX_LOSS_TICKS.max(TICKS_PER_DECISECOND * self.config.failsafe_delay as u32);
        let landed_at = TICKS_PER_DECISECOND
            * (self.config.failsafe_delay as u32 + self.config.failsafe_off_delay as u32);

        match self.phase {
            FailsafePhase::Idle if self.counter > RX_LOSS_TICKS => {
                self.phase = FailsafePhase::RxLossDetected;
            }
            FailsafePhase::RxLossDetected if self.counter > landing_at => {
                self.phase = FailsafePhase::Landing;
            }
            FailsafePhase::Landing if self.counter > landed_at => {
                self.phase = FailsafePhase::Landed;
            }
            _ => {}
        }
    }
}

impl Default for Failsafe {
    fn default() -> Self {
        Self::new(FailsafeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(fs: &mut Failsafe, n: u32) {
        for _ in 0..n {
            fs.increment_counter();
        }
    }

    #[test]
    fn test_idle_until_loss_threshold() {
        let mut fs = Failsafe::default();
        tick(&mut fs, RX_LOSS_TICKS);
        assert_eq!(fs.phase(), FailsafePhase::Idle);

        tick(&mut fs, 1);
        assert_eq!(fs.phase(), FailsafePhase::RxLossDetected);
    }

    #[test]
    fn test_full_loss_sequence() {
        let mut fs = Failsafe::default();
        // delay = 10 -> landing past 50 ticks
        tick(&mut fs, 51);
        assert_eq!(fs.phase(), FailsafePhase::Landing);
        assert!(fs.should_force_landing());

        // off_delay = 200 -> landed past 1050 ticks
        tick(&mut fs, 1000);
        assert_eq!(fs.phase(), FailsafePhase::Landed);
        assert!(fs.has_landed());
        assert!(!fs.should_force_landing());
    }

    #[test]
    fn test_good_pulses_clear_counter() {
        let mut fs = Failsafe::default();
        tick(&mut fs, 15);

        for channel in 0..4 {
            fs.check_pulse(channel, 1500);
        }
        assert_eq!(fs.counter(), 0);
        assert_eq!(fs.phase(), FailsafePhase::Idle);
    }

    #[test]
    fn test_partial_good_pulses_do_not_clear() {
        let mut fs = Failsafe::default();
        tick(&mut fs, 15);

        fs.check_pulse(0, 1500);
        fs.check_pulse(1, 1500);
        fs.check_pulse(2, 1500);
        // channel 3 missing
        assert_eq!(fs.counter(), 15);
    }

    #[test]
    fn test_implausible_pulses_ignored() {
        let mut fs = Failsafe::default();
        tick(&mut fs, 15);

        fs.check_pulse(0, 985); // at min, exclusive
        fs.check_pulse(1, 2115); // at max, exclusive
        fs.check_pulse(2, 1500);
        fs.check_pulse(3, 1500);
        assert_eq!(fs.counter(), 15);

        // the two bad channels recover
        fs.check_pulse(0, 986);
        fs.check_pulse(1, 2114);
        assert_eq!(fs.counter(), 0);
    }

    #[test]
    fn test_pulses_on_non_stick_channels_ignored() {
        let mut fs = Failsafe::default();
        tick(&mut fs, 15);

        for channel in 4..8 {
            fs.check_pulse(channel, 1500);
        }
        assert_eq!(fs.counter(), 15);
    }

    #[test]
    fn test_landing_not_aborted_by_pulses() {
        let mut fs = Failsafe::default();
        tick(&mut fs, 51);
        assert_eq!(fs.phase(), FailsafePhase::Landing);

        for channel in 0..4 {
            fs.check_pulse(channel, 1500);
        }
        assert_eq!(fs.phase(), FailsafePhase::Landing);
    }

    #[test]
    fn test_landed_is_terminal_until_rearm() {
        let mut fs = Failsafe::default();
        tick(&mut fs, 1051);
        assert!(fs.has_landed());

        fs.reset();
        assert!(fs.has_landed());
        assert_eq!(fs.counter(), 0);

        fs.rearm();
        assert_eq!(fs.phase(), FailsafePhase::Idle);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut fs = Failsafe::default();
        tick(&mut fs, 30);
        assert_eq!(fs.phase(), FailsafePhase::RxLossDetected);

        fs.reset();
        assert_eq!(fs.phase(), FailsafePhase::Idle);
        assert_eq!(fs.counter(), 0);
    }
}
