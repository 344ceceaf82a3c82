//! Feature flags
//!
//! A persisted 32-bit mask of optional subsystems. Some combinations are
//! contradictory (a pin bank cannot carry parallel PWM inputs and analog
//! sensors at once); [`validate_and_fix`] resolves them after every load.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Features: u32 {
        const RX_PPM          = 1 << 0;
        const VBAT            = 1 << 1;
        const INFLIGHT_ACC_CAL = 1 << 2;
        const RX_SERIAL       = 1 << 3;
        const MOTOR_STOP      = 1 << 4;
        const SERVO_TILT      = 1 << 5;
        const SOFTSERIAL      = 1 << 6;
        const GPS             = 1 << 7;
        const FAILSAFE        = 1 << 8;
        const SONAR           = 1 << 9;
        const TELEMETRY       = 1 << 10;
        const CURRENT_METER   = 1 << 11;
        const THREE_D         = 1 << 12;
        const RX_PARALLEL_PWM = 1 << 13;
        const RX_MSP          = 1 << 14;
        const RSSI_ADC        = 1 << 15;
        const LED_STRIP       = 1 << 16;
        const ONESHOT125      = 1 << 17;
    }
}

impl Features {
    const RECEIVER_MASK: Features = Features::RX_PPM
        .union(Features::RX_SERIAL)
        .union(Features::RX_PARALLEL_PWM)
        .union(Features::RX_MSP);
}

/// Enforce receiver exclusivity and pin-conflict rules
///
/// Applied after every configuration load and reset, so downstream code can
/// rely on exactly one receiver feature being set and parallel PWM never
/// coexisting with the analog inputs it shadows.
pub fn validate_and_fix(features: &mut Features) {
    if !features.intersects(Features::RECEIVER_MASK) {
        features.insert(Features::RX_PARALLEL_PWM);
    }

    if features.contains(Features::RX_PPM) {
        features.remove(Features::RX_PARALLEL_PWM);
    }

    if features.contains(Features::RX_MSP) {
        features.remove(Features::RX_SERIAL | Features::RX_PARALLEL_PWM | Features::RX_PPM);
    }

    if features.contains(Features::RX_SERIAL) {
        features.remove(Features::RX_PARALLEL_PWM | Features::RX_PPM);
    }

    if features.contains(Features::RX_PARALLEL_PWM) {
        features.remove(
            Features::RSSI_ADC | Features::CURRENT_METER | Features::SONAR | Features::SOFTSERIAL,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_receiver_defaults_to_parallel_pwm() {
        let mut f = Features::VBAT | Features::FAILSAFE;
        validate_and_fix(&mut f);
        assert!(f.contains(Features::RX_PARALLEL_PWM));
        assert!(f.contains(Features::VBAT | Features::FAILSAFE));
    }

    #[test]
    fn test_ppm_clears_parallel_pwm() {
        let mut f = Features::RX_PPM | Features::RX_PARALLEL_PWM;
        validate_and_fix(&mut f);
        assert_eq!(f & Features::RECEIVER_MASK, Features::RX_PPM);
    }

    #[test]
    fn test_msp_wins_over_everything() {
        let mut f =
            Features::RX_MSP | Features::RX_SERIAL | Features::RX_PPM | Features::RX_PARALLEL_PWM;
        validate_and_fix(&mut f);
        assert_eq!(f & Features::RECEIVER_MASK, Features::RX_MSP);
    }

    #[test]
    fn test_serial_wins_over_pulse_receivers() {
        let mut f = Features::RX_SERIAL | Features::RX_PPM | Features::RX_PARALLEL_PWM;
        validate_and_fix(&mut f);
        assert_eq!(f & Features::RECEIVER_MASK, Features::RX_SERIAL);
    }

    #[test]
    fn test_parallel_pwm_clears_conflicting_analog_features() {
        let mut f = Features::RX_PARALLEL_PWM
            | Features::RSSI_ADC
            | Features::CURRENT_METER
            | Features::SONAR
            | Features::SOFTSERIAL
            | Features::TELEMETRY;
        validate_and_fix(&mut f);
        assert!(!f.intersects(
            Features::RSSI_ADC | Features::CURRENT_METER | Features::SONAR | Features::SOFTSERIAL
        ));
        assert!(f.contains(Features::TELEMETRY));
    }

    #[test]
    fn test_valid_configuration_unchanged() {
        let mut f = Features::RX_SERIAL | Features::RSSI_ADC | Features::FAILSAFE;
        let before = f;
        validate_and_fix(&mut f);
        assert_eq!(f, before);
    }
}
