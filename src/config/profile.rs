//! Control profile
//!
//! One of three persisted tuning banks. Everything here is pilot-tunable and
//! switchable at runtime; hardware-bound settings live in
//! [`MasterConfig`](crate::config::master::MasterConfig).

use crate::config::eeprom::{ImageReader, ImageWriter};
use crate::rx::FailsafeConfig;

/// Axes in the integer/float PID banks:
/// roll, pitch, yaw, alt, pos, posr, navr, level, mag, vel
pub const PID_ITEM_COUNT: usize = 10;

pub const MAX_SUPPORTED_SERVOS: usize = 8;

/// Servo slot not forwarding any RC channel
pub const CHANNEL_FORWARDING_DISABLED: u8 = 0xFF;

#[derive(Debug, Clone, PartialEq)]
pub struct PidProfile {
    pub pid_controller: u8,
    pub p8: [u8; PID_ITEM_COUNT],
    pub i8: [u8; PID_ITEM_COUNT],
    pub d8: [u8; PID_ITEM_COUNT],
    /// Float controller gains for roll/pitch/yaw
    pub p_f: [f32; 3],
    pub i_f: [f32; 3],
    pub d_f: [f32; 3],
    pub a_level: f32,
    pub h_level: f32,
}

impl Default for PidProfile {
    fn default() -> Self {
        Self {
            pid_controller: 0,
            p8: [40, 40, 85, 50, 11, 20, 14, 90, 40, 120],
            i8: [30, 30, 45, 0, 0, 8, 20, 10, 0, 45],
            d8: [23, 23, 0, 0, 0, 45, 80, 100, 0, 1],
            p_f: [2.5, 2.5, 2.5],
            i_f: [0.6, 0.6, 1.0],
            d_f: [0.06, 0.06, 0.05],
            a_level: 5.0,
            h_level: 3.0,
        }
    }
}

impl PidProfile {
    pub(crate) fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_u8(self.pid_controller);
        for bank in [&self.p8, &self.i8, &self.d8] {
            for &v in bank {
                w.put_u8(v);
            }
        }
        for bank in [&self.p_f, &self.i_f, &self.d_f] {
            for &v in bank {
                w.put_f32(v);
            }
        }
        w.put_f32(self.a_level);
        w.put_f32(self.h_level);
    }

    pub(crate) fn read_from(r: &mut ImageReader<'_>) -> Self {
        let pid_controller = r.get_u8();
        let mut banks = [[0u8; PID_ITEM_COUNT]; 3];
        for bank in banks.iter_mut() {
            for v in bank.iter_mut() {
                *v = r.get_u8();
            }
        }
        let mut float_banks = [[0f32; 3]; 3];
        for bank in float_banks.iter_mut() {
            for v in bank.iter_mut() {
                *v = r.get_f32();
            }
        }
        Self {
            pid_controller,
            p8: banks[0],
            i8: banks[1],
            d8: banks[2],
            p_f: float_banks[0],
            i_f: float_banks[1],
            d_f: float_banks[2],
            a_level: r.get_f32(),
            h_level: r.get_f32(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRateConfig {
    pub rc_rate: u8,
    pub rc_expo: u8,
    pub roll_pitch_rate: u8,
    pub yaw_rate: u8,
    pub thr_mid: u8,
    pub thr_expo: u8,
}

impl Default for ControlRateConfig {
    fn default() -> Self {
        Self {
            rc_rate: 90,
            rc_expo: 65,
            roll_pitch_rate: 0,
            yaw_rate: 0,
            thr_mid: 50,
            thr_expo: 0,
        }
    }
}

impl ControlRateConfig {
    pub(crate) fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_u8(self.rc_rate);
        w.put_u8(self.rc_expo);
        w.put_u8(self.roll_pitch_rate);
        w.put_u8(self.yaw_rate);
        w.put_u8(self.thr_mid);
        w.put_u8(self.thr_expo);
    }

    pub(crate) fn read_from(r: &mut ImageReader<'_>) -> Self {
        Self {
            rc_rate: r.get_u8(),
            rc_expo: r.get_u8(),
            roll_pitch_rate: r.get_u8(),
            yaw_rate: r.get_u8(),
            thr_mid: r.get_u8(),
            thr_expo: r.get_u8(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoParam {
    pub min: u16,
    pub max: u16,
    pub middle: u16,
    pub rate: i8,
    pub forward_from_channel: u8,
}

impl ServoParam {
    fn with_rate(rate: i8) -> Self {
        Self {
            min: 1020,
            max: 2000,
            middle: 1500,
            rate,
            forward_from_channel: CHANNEL_FORWARDING_DISABLED,
        }
    }

    pub(crate) fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_u16(self.min);
        w.put_u16(self.max);
        w.put_u16(self.middle);
        w.put_i8(self.rate);
        w.put_u8(self.forward_from_channel);
    }

    pub(crate) fn read_from(r: &mut ImageReader<'_>) -> Self {
        Self {
            min: r.get_u16(),
            max: r.get_u16(),
            middle: r.get_u16(),
            rate: r.get_i8(),
            forward_from_channel: r.get_u8(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarometerConfig {
    pub sample_count: u8,
    pub noise_lpf: f32,
    pub cf_vel: f32,
    pub cf_alt: f32,
}

impl Default for BarometerConfig {
    fn default() -> Self {
        Self {
            sample_count: 21,
            noise_lpf: 0.6,
            cf_vel: 0.985,
            cf_alt: 0.965,
        }
    }
}

impl BarometerConfig {
    pub(crate) fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_u8(self.sample_count);
        w.put_f32(self.noise_lpf);
        w.put_f32(self.cf_vel);
        w.put_f32(self.cf_alt);
    }

    pub(crate) fn read_from(r: &mut ImageReader<'_>) -> Self {
        Self {
            sample_count: r.get_u8(),
            noise_lpf: r.get_f32(),
            cf_vel: r.get_f32(),
            cf_alt: r.get_f32(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerTuning {
    pub yaw_direction: i8,
    pub tri_unarmed_servo: u8,
}

impl Default for MixerTuning {
    fn default() -> Self {
        Self {
            yaw_direction: 1,
            tri_unarmed_servo: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsProfile {
    pub wp_radius: u16,
    pub lpf: u8,
    pub nav_slew_rate: u8,
    pub nav_controls_heading: u8,
    pub nav_speed_min: u16,
    pub nav_speed_max: u16,
    pub ap_mode: u8,
}

impl Default for GpsProfile {
    fn default() -> Self {
        Self {
            wp_radius: 200,
            lpf: 20,
            nav_slew_rate: 30,
            nav_controls_heading: 1,
            nav_speed_min: 100,
            nav_speed_max: 300,
            ap_mode: 40,
        }
    }
}

impl GpsProfile {
    pub(crate) fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_u16(self.wp_radius);
        w.put_u8(self.lpf);
        w.put_u8(self.nav_slew_rate);
        w.put_u8(self.nav_controls_heading);
        w.put_u16(self.nav_speed_min);
        w.put_u16(self.nav_speed_max);
        w.put_u8(self.ap_mode);
    }

    pub(crate) fn read_from(r: &mut ImageReader<'_>) -> Self {
        Self {
            wp_radius: r.get_u16(),
            lpf: r.get_u8(),
            nav_slew_rate: r.get_u8(),
            nav_controls_heading: r.get_u8(),
            nav_speed_min: r.get_u16(),
            nav_speed_max: r.get_u16(),
            ap_mode: r.get_u8(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub pid: PidProfile,
    pub control_rate: ControlRateConfig,
    pub dyn_thr_pid: u8,
    pub tpa_breakpoint: u16,
    pub angle_trim_roll: i16,
    pub angle_trim_pitch: i16,
    pub mag_declination: i16,
    pub acc_lpf_factor: u8,
    pub accz_lpf_cutoff: f32,
    pub acc_unarmedcal: u8,
    pub acc_deadband_xy: u8,
    pub acc_deadband_z: u8,
    pub baro: BarometerConfig,
    pub deadband: u8,
    pub yaw_deadband: u8,
    pub alt_hold_deadband: u8,
    pub alt_hold_fast_change: u8,
    pub throttle_correction_value: u8,
    pub throttle_correction_angle: u16,
    pub failsafe: FailsafeConfig,
    pub servos: [ServoParam; MAX_SUPPORTED_SERVOS],
    pub mixer_tuning: MixerTuning,
    pub gimbal_flags: u8,
    pub gps: GpsProfile,
}

impl Default for Profile {
    fn default() -> Self {
        let mut servos = [ServoParam::with_rate(100); MAX_SUPPORTED_SERVOS];
        servos[0].rate = 30;
        servos[1].rate = 30;
        Self {
            pid: PidProfile::default(),
            control_rate: ControlRateConfig::default(),
            dyn_thr_pid: 0,
            tpa_breakpoint: 1500,
            angle_trim_roll: 0,
            angle_trim_pitch: 0,
            mag_declination: 0,
            acc_lpf_factor: 4,
            accz_lpf_cutoff: 5.0,
            acc_unarmedcal: 1,
            acc_deadband_xy: 40,
            acc_deadband_z: 40,
            baro: BarometerConfig::default(),
            deadband: 0,
            yaw_deadband: 0,
            alt_hold_deadband: 40,
            alt_hold_fast_change: 1,
            throttle_correction_value: 0,
            throttle_correction_angle: 800,
            failsafe: FailsafeConfig::default(),
            servos,
            mixer_tuning: MixerTuning::default(),
            gimbal_flags: 1,
            gps: GpsProfile::default(),
        }
    }
}

impl Profile {
    pub(crate) fn write_to(&self, w: &mut ImageWriter<'_>) {
        self.pid.write_to(w);
        self.control_rate.write_to(w);
        w.put_u8(self.dyn_thr_pid);
        w.put_u16(self.tpa_breakpoint);
        w.put_i16(self.angle_trim_roll);
        w.put_i16(self.angle_trim_pitch);
        w.put_i16(self.mag_declination);
        w.put_u8(self.acc_lpf_factor);
        w.put_f32(self.accz_lpf_cutoff);
        w.put_u8(self.acc_unarmedcal);
        w.put_u8(self.acc_deadband_xy);
        w.put_u8(self.acc_deadband_z);
        self.baro.write_to(w);
        w.put_u8(self.deadband);
        w.put_u8(self.yaw_deadband);
        w.put_u8(self.alt_hold_deadband);
        w.put_u8(self.alt_hold_fast_change);
        w.put_u8(self.throttle_correction_value);
        w.put_u16(self.throttle_correction_angle);
        self.failsafe.write_to(w);
        for servo in &self.servos {
            servo.write_to(w);
        }
        w.put_i8(self.mixer_tuning.yaw_direction);
        w.put_u8(self.mixer_tuning.tri_unarmed_servo);
        w.put_u8(self.gimbal_flags);
        self.gps.write_to(w);
    }

    pub(crate) fn read_from(r: &mut ImageReader<'_>) -> Self {
        let pid = PidProfile::read_from(r);
        let control_rate = ControlRateConfig::read_from(r);
        let dyn_thr_pid = r.get_u8();
        let tpa_breakpoint = r.get_u16();
        let angle_trim_roll = r.get_i16();
        let angle_trim_pitch = r.get_i16();
        let mag_declination = r.get_i16();
        let acc_lpf_factor = r.get_u8();
        let accz_lpf_cutoff = r.get_f32();
        let acc_unarmedcal = r.get_u8();
        let acc_deadband_xy = r.get_u8();
        let acc_deadband_z = r.get_u8();
        let baro = BarometerConfig::read_from(r);
        let deadband = r.get_u8();
        let yaw_deadband = r.get_u8();
        let alt_hold_deadband = r.get_u8();
        let alt_hold_fast_change = r.get_u8();
        let throttle_correction_value = r.get_u8();
        let throttle_correction_angle = r.get_u16();
        let failsafe = FailsafeConfig::read_from(r);
        let servos = core::array::from_fn(|_| ServoParam::read_from(r));
        let mixer_tuning = MixerTuning {
            yaw_direction: r.get_i8(),
            tri_unarmed_servo: r.get_u8(),
        };
        let gimbal_flags = r.get_u8();
        let gps = GpsProfile::read_from(r);
        Self {
            pid,
            control_rate,
            dyn_thr_pid,
            tpa_breakpoint,
            angle_trim_roll,
            angle_trim_pitch,
            mag_declination,
            acc_lpf_factor,
            accz_lpf_cutoff,
            acc_unarmedcal,
            acc_deadband_xy,
            acc_deadband_z,
            baro,
            deadband,
            yaw_deadband,
            alt_hold_deadband,
            alt_hold_fast_change,
            throttle_correction_value,
            throttle_correction_angle,
            failsafe,
            servos,
            mixer_tuning,
            gimbal_flags,
            gps,
        }
    }
}

impl FailsafeConfig {
    pub(crate) fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_u8(self.failsafe_delay);
        w.put_u8(self.failsafe_off_delay);
        w.put_u16(self.failsafe_throttle);
        w.put_u16(self.failsafe_min_usec);
        w.put_u16(self.failsafe_max_usec);
    }

    pub(crate) fn read_from(r: &mut ImageReader<'_>) -> Self {
        Self {
            failsafe_delay: r.get_u8(),
            failsafe_off_delay: r.get_u8(),
            failsafe_throttle: r.get_u16(),
            failsafe_min_usec: r.get_u16(),
            failsafe_max_usec: r.get_u16(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::eeprom::{ImageReader, ImageWriter};

    #[test]
    fn test_profile_codec_round_trip() {
        let mut profile = Profile::default();
        profile.pid.p8[2] = 99; // yaw
        profile.control_rate.rc_expo = 70;
        profile.failsafe.failsafe_throttle = 1300;
        profile.servos[5].rate = -50;

        let mut buf = [0u8; 512];
        let mut w = ImageWriter::new(&mut buf);
        profile.write_to(&mut w);
        assert!(!w.overflowed());
        let len = w.position();

        let mut r = ImageReader::new(&buf[..len]);
        let decoded = Profile::read_from(&mut r);
        assert_eq!(decoded, profile);
        assert_eq!(r.position(), len);
    }

    #[test]
    fn test_default_servo_rates() {
        let profile = Profile::default();
        assert_eq!(profile.servos[0].rate, 30);
        assert_eq!(profile.servos[1].rate, 30);
        assert!(profile.servos[2..].iter().all(|s| s.rate == 100));
        assert!(profile
            .servos
            .iter()
            .all(|s| s.forward_from_channel == CHANNEL_FORWARDING_DISABLED));
    }

    #[test]
    fn test_encoded_length_is_invariant() {
        let defaults = Profile::default();
        let mut tuned = Profile::default();
        tuned.pid.p_f = [9.0, 9.0, 9.0];
        tuned.tpa_breakpoint = 2000;

        let mut buf_a = [0u8; 512];
        let mut buf_b = [0u8; 512];
        let mut wa = ImageWriter::new(&mut buf_a);
        let mut wb = ImageWriter::new(&mut buf_b);
        defaults.write_to(&mut wa);
        tuned.write_to(&mut wb);
        assert_eq!(wa.position(), wb.position());
    }
}
