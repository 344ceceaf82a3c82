//! PPM and parallel PWM pulse decoders
//!
//! Both decoders consume raw timer capture events delivered through the
//! [`CaptureTable`](crate::devices::timer_capture::CaptureTable) and publish
//! per-channel pulse widths in microseconds. Capture timers run at 1 MHz, so
//! tick counts are microseconds directly.
//!
//! The decoder state is written exclusively from interrupt context and read
//! from the main loop; fields are small scalars so reads are atomic at the
//! target word size.

use crate::devices::timer_capture::{CaptureChannel, CaptureTable, TimerId};
use crate::rx::Receiver;

/// Maximum channels on a PPM sum line or a parallel PWM bank
pub const MAX_PULSE_INPUT_CHANNEL_COUNT: usize = 8;

/// Gap longer than this is a PPM frame sync pulse
const PPM_SYNC_GAP_US: u32 = 2700;

/// Default full-period tick count before the first overflow event (16-bit timer)
const DEFAULT_TIMER_PERIOD: u32 = 0x10000;

/// Distance between two captures, riding through counter wraparound
fn capture_delta(last: u16, current: u16, period: u32) -> u32 {
    if current >= last {
        (current - last) as u32
    } else {
        period - last as u32 + current as u32
    }
}

/// PPM-sum decoder
///
/// One input line carries all channels as consecutive pulse gaps; a long gap
/// (> 2700 us) is the frame sync and resets the channel cursor.
pub struct PpmReceiver {
    captures: [u16; MAX_PULSE_INPUT_CHANNEL_COUNT],
    current_channel: u8,
    last_capture: u16,
    period: u32,
    receiving: bool,
}

impl PpmReceiver {
    pub const fn new() -> Self {
        Self {
            captures: [0; MAX_PULSE_INPUT_CHANNEL_COUNT],
            current_channel: 0,
            last_capture: 0,
            period: DEFAULT_TIMER_PERIOD,
            receiving: false,
        }
    }

    /// Handle one capture edge on the PPM line
    pub fn on_edge(&mut self, capture: u16) {
        let delta = capture_delta(self.last_capture, capture, self.period);
        self.last_capture = capture;

        if delta > PPM_SYNC_GAP_US {
            self.current_channel = 0;
            return;
        }

        if (self.current_channel as usize) < MAX_PULSE_INPUT_CHANNEL_COUNT {
            self.captures[self.current_channel as usize] = delta as u16;
            self.receiving = true;
        }
        // wraps like the 8-bit cursor it models; a sync gap resets it anyway
        self.current_channel = self.current_channel.wrapping_add(1);
    }

    /// Handle a timer overflow carrying the auto-reload value
    pub fn on_overflow(&mut self, auto_reload: u16) {
        self.period = auto_reload as u32 + 1;
    }

    /// Last decoded width for `channel`, in microseconds
    pub fn read_raw(&self, channel: u8) -> u16 {
        self.captures
            .get(channel as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Whether pulses arrived since the flag was last reset
    ///
    /// Feeds the failsafe pulse-presence check: the aggregation loop samples
    /// and resets this once per processing tick.
    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    /// Reset the pulse-presence flag
    pub fn reset_received_state(&mut self) {
        self.receiving = false;
    }
}

impl Default for PpmReceiver {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
struct PwmInputState {
    rise: u16,
    width: u16,
    awaiting_fall: bool,
}

/// Parallel PWM decoder
///
/// Eight independent input lines, one channel each. The capture channel is
/// configured for both edges: the first edge latches the rising timestamp, the
/// second publishes the pulse width.
pub struct PwmReceiver {
    inputs: [PwmInputState; MAX_PULSE_INPUT_CHANNEL_COUNT],
    period: u32,
}

impl PwmReceiver {
    pub const fn new() -> Self {
        Self {
            inputs: [PwmInputState {
                rise: 0,
                width: 0,
                awaiting_fall: false,
            }; MAX_PULSE_INPUT_CHANNEL_COUNT],
            period: DEFAULT_TIMER_PERIOD,
        }
    }

    /// Handle one capture edge on input `input`
    pub fn on_edge(&mut self, input: u8, capture: u16) {
        let period = self.period;
        let Some(state) = self.inputs.get_mut(input as usize) else {
            return;
        };

        if state.awaiting_fall {
            state.width = capture_delta(state.rise, capture, period) as u16;
            state.awaiting_fall = false;
        } else {
            state.rise = capture;
            state.awaiting_fall = true;
        }
    }

    /// Handle a timer overflow carrying the auto-reload value
    pub fn on_overflow(&mut self, _input: u8, auto_reload: u16) {
        self.period = auto_reload as u32 + 1;
    }

    /// Last decoded width for `channel`, in microseconds
    pub fn read_raw(&self, channel: u8) -> u16 {
        self.inputs
            .get(channel as usize)
            .map(|s| s.width)
            .unwrap_or(0)
    }
}

impl Default for PwmReceiver {
    fn default() -> Self {
        Self::new()
    }
}

// Capture table trampolines. The interrupt entry owns a `&mut Receiver`; these
// route the event into the active pulse decoder and ignore it otherwise.

fn ppm_edge_callback(rx: &mut Receiver, _reference: u8, capture: u16) {
    if let Receiver::Ppm(ppm) = rx {
        ppm.on_edge(capture);
    }
}

fn ppm_overflow_callback(rx: &mut Receiver, _reference: u8, period: u16) {
    if let Receiver::Ppm(ppm) = rx {
        ppm.on_overflow(period);
    }
}

fn pwm_edge_callback(rx: &mut Receiver, reference: u8, capture: u16) {
    if let Receiver::ParallelPwm(pwm) = rx {
        pwm.on_edge(reference, capture);
    }
}

fn pwm_overflow_callback(rx: &mut Receiver, reference: u8, period: u16) {
    if let Receiver::ParallelPwm(pwm) = rx {
        pwm.on_overflow(reference, period);
    }
}

/// Register the PPM input line in the capture table
pub fn configure_ppm_capture(
    table: &mut CaptureTable<Receiver>,
    timer: TimerId,
    channel: CaptureChannel,
) {
    table.configure_channel_callbacks(
        timer,
        channel,
        0,
        Some(ppm_edge_callback),
        Some(ppm_overflow_callback),
    );
}

/// Register up to 8 parallel PWM input lines in the capture table
///
/// The position in `inputs` becomes the receiver channel the line feeds.
pub fn configure_pwm_capture(
    table: &mut CaptureTable<Receiver>,
    inputs: &[(TimerId, CaptureChannel)],
) {
    for (index, &(timer, channel)) in inputs.iter().take(MAX_PULSE_INPUT_CHANNEL_COUNT).enumerate()
    {
        table.configure_channel_callbacks(
            timer,
            channel,
            index as u8,
            Some(pwm_edge_callback),
            Some(pwm_overflow_callback),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed a full PPM frame starting at tick `start`, returning the next tick
    fn feed_ppm_frame(ppm: &mut PpmReceiver, start: u16, widths: &[u16]) -> u16 {
        let mut t = start;
        // sync gap before the frame
        t = t.wrapping_add(4000);
        ppm.on_edge(t);
        for &w in widths {
            t = t.wrapping_add(w);
            ppm.on_edge(t);
        }
        t
    }

    #[test]
    fn test_ppm_decodes_channels() {
        let mut ppm = PpmReceiver::new();
        feed_ppm_frame(&mut ppm, 0, &[1000, 1500, 2000, 1250]);

        assert_eq!(ppm.read_raw(0), 1000);
        assert_eq!(ppm.read_raw(1), 1500);
        assert_eq!(ppm.read_raw(2), 2000);
        assert_eq!(ppm.read_raw(3), 1250);
        assert!(ppm.is_receiving());
    }

    #[test]
    fn test_ppm_sync_resets_cursor() {
        let mut ppm = PpmReceiver::new();
        let t = feed_ppm_frame(&mut ppm, 0, &[1100, 1200]);
        // next frame overwrites from channel 0
        feed_ppm_frame(&mut ppm, t, &[1300, 1400]);

        assert_eq!(ppm.read_raw(0), 1300);
        assert_eq!(ppm.read_raw(1), 1400);
    }

    #[test]
    fn test_ppm_width_across_wraparound() {
        let mut ppm = PpmReceiver::new();
        // sync edge just below the wrap point
        ppm.on_edge(0xFFF0);
        ppm.current_channel = 0; // treat as synced
        ppm.on_edge(0xFFF0u16.wrapping_add(1500));

        assert_eq!(ppm.read_raw(0), 1500);
    }

    #[test]
    fn test_ppm_ignores_channels_beyond_capacity() {
        let mut ppm = PpmReceiver::new();
        let widths = [1000u16; 10];
        feed_ppm_frame(&mut ppm, 0, &widths);

        // 9th and 10th pulses are dropped without wrapping into the buffer
        assert_eq!(ppm.read_raw(7), 1000);
        assert_eq!(ppm.read_raw(8), 0);
    }

    #[test]
    fn test_ppm_gapless_edge_train_never_panics() {
        let mut ppm = PpmReceiver::new();
        // noisy line with no sync gap: every delta stays below the sync
        // threshold, so the cursor only ever advances
        let mut t: u16 = 0;
        for _ in 0..300 {
            t = t.wrapping_add(1000);
            ppm.on_edge(t);
        }

        // decoder stays usable once a real frame shows up
        let mut t = feed_ppm_frame(&mut ppm, t, &[1500, 1600]);
        assert_eq!(ppm.read_raw(0), 1500);
        assert_eq!(ppm.read_raw(1), 1600);

        // a second burst followed by a sync still decodes cleanly
        for _ in 0..300 {
            t = t.wrapping_add(2000);
            ppm.on_edge(t);
        }
        feed_ppm_frame(&mut ppm, t, &[1200, 1800]);
        assert_eq!(ppm.read_raw(0), 1200);
        assert_eq!(ppm.read_raw(1), 1800);
    }

    #[test]
    fn test_ppm_receiving_flag_reset() {
        let mut ppm = PpmReceiver::new();
        feed_ppm_frame(&mut ppm, 0, &[1500]);
        assert!(ppm.is_receiving());

        ppm.reset_received_state();
        assert!(!ppm.is_receiving());
    }

    #[test]
    fn test_pwm_pairs_edges_into_width() {
        let mut pwm = PwmReceiver::new();
        pwm.on_edge(2, 10_000);
        pwm.on_edge(2, 11_520);

        assert_eq!(pwm.read_raw(2), 1520);
        assert_eq!(pwm.read_raw(3), 0);
    }

    #[test]
    fn test_pwm_width_across_wraparound() {
        let mut pwm = PwmReceiver::new();
        pwm.on_edge(0, 0xFFB0);
        pwm.on_edge(0, 0xFFB0u16.wrapping_add(1200));

        assert_eq!(pwm.read_raw(0), 1200);
    }

    #[test]
    fn test_pwm_respects_overflow_period() {
        let mut pwm = PwmReceiver::new();
        // timer reloads at 30000 ticks
        pwm.on_overflow(0, 29_999);
        pwm.on_edge(0, 29_500);
        pwm.on_edge(0, 1_000);

        assert_eq!(pwm.read_raw(0), 1500);
    }

    #[test]
    fn test_capture_table_routes_to_active_decoder() {
        use crate::devices::timer_capture::TimerIrq;

        let mut table = CaptureTable::new();
        configure_ppm_capture(&mut table, TimerId::Tim2, CaptureChannel::Ch1);

        let mut rx = Receiver::Ppm(PpmReceiver::new());
        table.handle_irq(&mut rx, &TimerIrq::new(TimerId::Tim2).with_capture(CaptureChannel::Ch1, 4000));
        table.handle_irq(&mut rx, &TimerIrq::new(TimerId::Tim2).with_capture(CaptureChannel::Ch1, 5500));

        assert_eq!(rx.read_raw(0), 1500);
    }
}
