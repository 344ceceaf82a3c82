//! Master configuration
//!
//! Hardware-bound settings plus the three profile slots. This is the unit the
//! EEPROM codec serializes; field order here is the persisted payload order.

use crate::config::eeprom::{ImageReader, ImageWriter};
use crate::config::features::{self, Features};
use crate::config::profile::Profile;
use crate::rx::{parse_rc_channels, RxConfig, REMAPPABLE_CHANNEL_COUNT};

pub const MAX_PROFILE_COUNT: usize = 3;
pub const MAX_SUPPORTED_MOTORS: usize = 12;

const SERIAL_PORT_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorTrims {
    pub roll: i16,
    pub pitch: i16,
    pub yaw: i16,
}

impl SensorTrims {
    fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_i16(self.roll);
        w.put_i16(self.pitch);
        w.put_i16(self.yaw);
    }

    fn read_from(r: &mut ImageReader<'_>) -> Self {
        Self {
            roll: r.get_i16(),
            pitch: r.get_i16(),
            yaw: r.get_i16(),
        }
    }
}

/// Board mounting offsets, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoardAlignment {
    pub roll_degrees: i16,
    pub pitch_degrees: i16,
    pub yaw_degrees: i16,
}

/// Per-sensor axis remap selectors (0 = board default)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorAlignment {
    pub gyro: u8,
    pub acc: u8,
    pub mag: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryConfig {
    pub vbat_scale: u8,
    /// 0.1 V units
    pub vbat_max_cell_voltage: u8,
    pub vbat_min_cell_voltage: u8,
    pub current_meter_offset: u16,
    pub current_meter_scale: u16,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            vbat_scale: 110,
            vbat_max_cell_voltage: 43,
            vbat_min_cell_voltage: 33,
            current_meter_offset: 0,
            current_meter_scale: 400,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetryConfig {
    pub provider: u8,
    pub telemetry_switch: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscAndServoConfig {
    pub min_throttle: u16,
    pub max_throttle: u16,
    pub min_command: u16,
}

impl Default for EscAndServoConfig {
    fn default() -> Self {
        Self {
            min_throttle: 1150,
            max_throttle: 1850,
            min_command: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flight3dConfig {
    pub deadband3d_low: u16,
    pub deadband3d_high: u16,
    pub neutral3d: u16,
    pub deadband3d_throttle: u16,
}

impl Default for Flight3dConfig {
    fn default() -> Self {
        Self {
            deadband3d_low: 1406,
            deadband3d_high: 1514,
            neutral3d: 1460,
            deadband3d_throttle: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpsConfig {
    pub provider: u8,
    pub sbas_mode: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    pub port_scenarios: [u8; SERIAL_PORT_COUNT],
    pub msp_baudrate: u32,
    pub cli_baudrate: u32,
    pub gps_baudrate: u32,
    pub gps_passthrough_baudrate: u32,
    pub reboot_character: u8,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port_scenarios: [1, 2, 0, 0],
            msp_baudrate: 115_200,
            cli_baudrate: 115_200,
            gps_baudrate: 115_200,
            gps_passthrough_baudrate: 115_200,
            reboot_character: b'R',
        }
    }
}

impl SerialConfig {
    fn write_to(&self, w: &mut ImageWriter<'_>) {
        for &scenario in &self.port_scenarios {
            w.put_u8(scenario);
        }
        w.put_u32(self.msp_baudrate);
        w.put_u32(self.cli_baudrate);
        w.put_u32(self.gps_baudrate);
        w.put_u32(self.gps_passthrough_baudrate);
        w.put_u8(self.reboot_character);
    }

    fn read_from(r: &mut ImageReader<'_>) -> Self {
        let mut port_scenarios = [0u8; SERIAL_PORT_COUNT];
        for scenario in port_scenarios.iter_mut() {
            *scenario = r.get_u8();
        }
        Self {
            port_scenarios,
            msp_baudrate: r.get_u32(),
            cli_baudrate: r.get_u32(),
            gps_baudrate: r.get_u32(),
            gps_passthrough_baudrate: r.get_u32(),
            reboot_character: r.get_u8(),
        }
    }
}

/// One custom motor mix line
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorMixer {
    pub throttle: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl MotorMixer {
    fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_f32(self.throttle);
        w.put_f32(self.roll);
        w.put_f32(self.pitch);
        w.put_f32(self.yaw);
    }

    fn read_from(r: &mut ImageReader<'_>) -> Self {
        Self {
            throttle: r.get_f32(),
            roll: r.get_f32(),
            pitch: r.get_f32(),
            yaw: r.get_f32(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MasterConfig {
    pub enabled_features: Features,
    pub mixer_mode: u8,
    pub looptime: u16,
    pub emf_avoidance: u8,
    pub gyro_cmpf_factor: u16,
    pub gyro_cmpfm_factor: u16,
    pub gyro_lpf: u16,
    pub acc_zero: SensorTrims,
    pub board_alignment: BoardAlignment,
    pub sensor_alignment: SensorAlignment,
    /// 0.1 degree units
    pub max_angle_inclination: u16,
    pub yaw_control_direction: i8,
    pub battery: BatteryConfig,
    pub telemetry: TelemetryConfig,
    pub rx_config: RxConfig,
    pub input_filtering_mode: u8,
    pub retarded_arm: u8,
    pub small_angle: u8,
    pub flaps_speed: u8,
    pub fixedwing_althold_dir: i8,
    pub esc_and_servo: EscAndServoConfig,
    pub flight3d: Flight3dConfig,
    pub motor_pwm_rate: u16,
    pub servo_pwm_rate: u16,
    pub gps_config: GpsConfig,
    pub serial: SerialConfig,
    pub custom_mixer: [MotorMixer; MAX_SUPPORTED_MOTORS],
    pub current_profile_index: u8,
    pub profiles: [Profile; MAX_PROFILE_COUNT],
}

impl MasterConfig {
    /// Factory defaults, one default profile replicated into all slots
    pub fn defaults() -> Self {
        let mut rcmap = [0u8; REMAPPABLE_CHANNEL_COUNT];
        parse_rc_channels("AETR1234", &mut rcmap);

        let mut enabled_features = Features::VBAT;
        features::validate_and_fix(&mut enabled_features);

        let profile = Profile::default();
        Self {
            enabled_features,
            mixer_mode: 3, // quad X
            looptime: 3500,
            emf_avoidance: 0,
            gyro_cmpf_factor: 600,
            gyro_cmpfm_factor: 250,
            gyro_lpf: 42,
            acc_zero: SensorTrims::default(),
            board_alignment: BoardAlignment::default(),
            sensor_alignment: SensorAlignment::default(),
            max_angle_inclination: 500,
            yaw_control_direction: 1,
            battery: BatteryConfig::default(),
            telemetry: TelemetryConfig::default(),
            rx_config: RxConfig {
                rcmap,
                ..RxConfig::default()
            },
            input_filtering_mode: 0,
            retarded_arm: 0,
            small_angle: 25,
            flaps_speed: 0,
            fixedwing_althold_dir: 1,
            esc_and_servo: EscAndServoConfig::default(),
            flight3d: Flight3dConfig::default(),
            motor_pwm_rate: 400,
            servo_pwm_rate: 50,
            gps_config: GpsConfig::default(),
            serial: SerialConfig::default(),
            custom_mixer: [MotorMixer::default(); MAX_SUPPORTED_MOTORS],
            current_profile_index: 0,
            profiles: [profile.clone(), profile.clone(), profile],
        }
    }

    pub(crate) fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_u32(self.enabled_features.bits());
        w.put_u8(self.mixer_mode);
        w.put_u16(self.looptime);
        w.put_u8(self.emf_avoidance);
        w.put_u16(self.gyro_cmpf_factor);
        w.put_u16(self.gyro_cmpfm_factor);
        w.put_u16(self.gyro_lpf);
        self.acc_zero.write_to(w);
        w.put_i16(self.board_alignment.roll_degrees);
        w.put_i16(self.board_alignment.pitch_degrees);
        w.put_i16(self.board_alignment.yaw_degrees);
        w.put_u8(self.sensor_alignment.gyro);
        w.put_u8(self.sensor_alignment.acc);
        w.put_u8(self.sensor_alignment.mag);
        w.put_u16(self.max_angle_inclination);
        w.put_i8(self.yaw_control_direction);
        w.put_u8(self.battery.vbat_scale);
        w.put_u8(self.battery.vbat_max_cell_voltage);
        w.put_u8(self.battery.vbat_min_cell_voltage);
        w.put_u16(self.battery.current_meter_offset);
        w.put_u16(self.battery.current_meter_scale);
        w.put_u8(self.telemetry.provider);
        w.put_u8(self.telemetry.telemetry_switch);
        self.rx_config.write_to(w);
        w.put_u8(self.input_filtering_mode);
        w.put_u8(self.retarded_arm);
        w.put_u8(self.small_angle);
        w.put_u8(self.flaps_speed);
        w.put_i8(self.fixedwing_althold_dir);
        w.put_u16(self.esc_and_servo.min_throttle);
        w.put_u16(self.esc_and_servo.max_throttle);
        w.put_u16(self.esc_and_servo.min_command);
        w.put_u16(self.flight3d.deadband3d_low);
        w.put_u16(self.flight3d.deadband3d_high);
        w.put_u16(self.flight3d.neutral3d);
        w.put_u16(self.flight3d.deadband3d_throttle);
        w.put_u16(self.motor_pwm_rate);
        w.put_u16(self.servo_pwm_rate);
        w.put_u8(self.gps_config.provider);
        w.put_u8(self.gps_config.sbas_mode);
        self.serial.write_to(w);
        for mixer in &self.custom_mixer {
            mixer.write_to(w);
        }
        w.put_u8(self.current_profile_index);
        for profile in &self.profiles {
            profile.write_to(w);
        }
    }

    pub(crate) fn read_from(r: &mut ImageReader<'_>) -> Self {
        let enabled_features = Features::from_bits_truncate(r.get_u32());
        let mixer_mode = r.get_u8();
        let looptime = r.get_u16();
        let emf_avoidance = r.get_u8();
        let gyro_cmpf_factor = r.get_u16();
        let gyro_cmpfm_factor = r.get_u16();
        let gyro_lpf = r.get_u16();
        let acc_zero = SensorTrims::read_from(r);
        let board_alignment = BoardAlignment {
            roll_degrees: r.get_i16(),
            pitch_degrees: r.get_i16(),
            yaw_degrees: r.get_i16(),
        };
        let sensor_alignment = SensorAlignment {
            gyro: r.get_u8(),
            acc: r.get_u8(),
            mag: r.get_u8(),
        };
        let max_angle_inclination = r.get_u16();
        let yaw_control_direction = r.get_i8();
        let battery = BatteryConfig {
            vbat_scale: r.get_u8(),
            vbat_max_cell_voltage: r.get_u8(),
            vbat_min_cell_voltage: r.get_u8(),
            current_meter_offset: r.get_u16(),
            current_meter_scale: r.get_u16(),
        };
        let telemetry = TelemetryConfig {
            provider: r.get_u8(),
            telemetry_switch: r.get_u8(),
        };
        let rx_config = RxConfig::read_from(r);
        let input_filtering_mode = r.get_u8();
        let retarded_arm = r.get_u8();
        let small_angle = r.get_u8();
        let flaps_speed = r.get_u8();
        let fixedwing_althold_dir = r.get_i8();
        let esc_and_servo = EscAndServoConfig {
            min_throttle: r.get_u16(),
            max_throttle: r.get_u16(),
            min_command: r.get_u16(),
        };
        let flight3d = Flight3dConfig {
            deadband3d_low: r.get_u16(),
            deadband3d_high: r.get_u16(),
            neutral3d: r.get_u16(),
            deadband3d_throttle: r.get_u16(),
        };
        let motor_pwm_rate = r.get_u16();
        let servo_pwm_rate = r.get_u16();
        let gps_config = GpsConfig {
            provider: r.get_u8(),
            sbas_mode: r.get_u8(),
        };
        let serial = SerialConfig::read_from(r);
        let custom_mixer = core::array::from_fn(|_| MotorMixer::read_from(r));
        let current_profile_index = r.get_u8();
        let profiles = core::array::from_fn(|_| Profile::read_from(r));
        Self {
            enabled_features,
            mixer_mode,
            looptime,
            emf_avoidance,
            gyro_cmpf_factor,
            gyro_cmpfm_factor,
            gyro_lpf,
            acc_zero,
            board_alignment,
            sensor_alignment,
            max_angle_inclination,
            yaw_control_direction,
            battery,
            telemetry,
            rx_config,
            input_filtering_mode,
            retarded_arm,
            small_angle,
            flaps_speed,
            fixedwing_althold_dir,
            esc_and_servo,
            flight3d,
            motor_pwm_rate,
            servo_pwm_rate,
            gps_config,
            serial,
            custom_mixer,
            current_profile_index,
            profiles,
        }
    }
}

impl RxConfig {
    pub(crate) fn write_to(&self, w: &mut ImageWriter<'_>) {
        w.put_u8(self.serialrx_provider);
        w.put_u16(self.midrc);
        w.put_u16(self.mincheck);
        w.put_u16(self.maxcheck);
        w.put_u8(self.rssi_channel);
        for &entry in &self.rcmap {
            w.put_u8(entry);
        }
    }

    pub(crate) fn read_from(r: &mut ImageReader<'_>) -> Self {
        let serialrx_provider = r.get_u8();
        let midrc = r.get_u16();
        let mincheck = r.get_u16();
        let maxcheck = r.get_u16();
        let rssi_channel = r.get_u8();
        let mut rcmap = [0u8; REMAPPABLE_CHANNEL_COUNT];
        for entry in rcmap.iter_mut() {
            *entry = r.get_u8();
        }
        Self {
            serialrx_provider,
            midrc,
            mincheck,
            maxcheck,
            rssi_channel,
            rcmap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_have_exactly_one_rx_source() {
        let config = MasterConfig::defaults();
        let rx_mask = Features::RX_PPM
            | Features::RX_SERIAL
            | Features::RX_PARALLEL_PWM
            | Features::RX_MSP;
        assert_eq!(
            config.enabled_features & rx_mask,
            Features::RX_PARALLEL_PWM
        );
    }

    #[test]
    fn test_default_profiles_identical() {
        let config = MasterConfig::defaults();
        assert_eq!(config.profiles[0], config.profiles[1]);
        assert_eq!(config.profiles[1], config.profiles[2]);
        assert_eq!(config.current_profile_index, 0);
    }

    #[test]
    fn test_default_rcmap_is_aetr() {
        let config = MasterConfig::defaults();
        assert_eq!(config.rx_config.rcmap, [0, 1, 3, 2, 4, 5, 6, 7]);
    }

    #[test]
    fn test_master_codec_round_trip() {
        use crate::config::eeprom::{ImageReader, ImageWriter};

        let mut config = MasterConfig::defaults();
        config.looptime = 2500;
        config.acc_zero.pitch = -12;
        config.custom_mixer[3].yaw = -1.0;
        config.profiles[1].control_rate.rc_rate = 100;
        config.current_profile_index = 2;

        let mut buf = [0u8; 2048];
        let mut w = ImageWriter::new(&mut buf);
        config.write_to(&mut w);
        assert!(!w.overflowed());
        let len = w.position();

        let mut r = ImageReader::new(&buf[..len]);
        let decoded = MasterConfig::read_from(&mut r);
        assert_eq!(decoded, config);
        assert_eq!(r.position(), len);
    }
}
