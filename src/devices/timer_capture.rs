//! Timer capture dispatch
//!
//! Maps (timer, capture channel) pairs to registered edge/overflow callbacks and
//! fans hardware timer interrupts out to them. This is the only code that runs
//! at interrupt priority; everything downstream of the callbacks is polled from
//! the main loop.
//!
//! The table is generic over a context type `C` so the interrupt path carries no
//! allocation and no dynamic dispatch: callbacks are plain function pointers and
//! the decoder state they mutate is passed in explicitly by the interrupt entry.

/// Number of general-purpose timers with capture channels
pub const MAX_TIMERS: usize = 4;

/// Capture/compare channels per timer
pub const CC_CHANNELS_PER_TIMER: usize = 4;

/// Hardware timer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    Tim1,
    Tim2,
    Tim3,
    Tim4,
}

impl TimerId {
    /// Ordinal used for table indexing
    pub const fn index(self) -> usize {
        match self {
            TimerId::Tim1 => 0,
            TimerId::Tim2 => 1,
            TimerId::Tim3 => 2,
            TimerId::Tim4 => 3,
        }
    }
}

/// Capture/compare channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureChannel {
    Ch1,
    Ch2,
    Ch3,
    Ch4,
}

impl CaptureChannel {
    /// Ordinal used for table indexing
    pub const fn index(self) -> usize {
        match self {
            CaptureChannel::Ch1 => 0,
            CaptureChannel::Ch2 => 1,
            CaptureChannel::Ch3 => 2,
            CaptureChannel::Ch4 => 3,
        }
    }

    const ALL: [CaptureChannel; CC_CHANNELS_PER_TIMER] = [
        CaptureChannel::Ch1,
        CaptureChannel::Ch2,
        CaptureChannel::Ch3,
        CaptureChannel::Ch4,
    ];
}

/// Capture callback: (decoder context, opaque reference, captured tick count)
pub type CaptureCallback<C> = fn(&mut C, u8, u16);

/// One latched timer interrupt
///
/// `period` is present on an update/overflow event and carries the full-period
/// tick count (auto-reload value) used for wraparound-aware pulse width
/// calculation. `captures` holds the captured counter value for each compare
/// channel that signaled.
#[derive(Debug, Clone, Copy)]
pub struct TimerIrq {
    pub timer: TimerId,
    pub period: Option<u16>,
    pub captures: [Option<u16>; CC_CHANNELS_PER_TIMER],
}

impl TimerIrq {
    /// An interrupt with no pending events on `timer`
    pub const fn new(timer: TimerId) -> Self {
        Self {
            timer,
            period: None,
            captures: [None; CC_CHANNELS_PER_TIMER],
        }
    }

    /// Mark an update/overflow event carrying the full-period tick count
    pub const fn with_overflow(mut self, period: u16) -> Self {
        self.period = Some(period);
        self
    }

    /// Mark a compare capture on `channel`
    pub const fn with_capture(mut self, channel: CaptureChannel, ticks: u16) -> Self {
        self.captures[channel.index()] = Some(ticks);
        self
    }
}

struct Slot<C> {
    reference: u8,
    edge_callback: Option<CaptureCallback<C>>,
    overflow_callback: Option<CaptureCallback<C>>,
}

impl<C> Slot<C> {
    const fn empty() -> Self {
        Self {
            reference: 0,
            edge_callback: None,
            overflow_callback: None,
        }
    }
}

/// Fixed-size capture dispatch table
///
/// Sized `MAX_TIMERS x CC_CHANNELS_PER_TIMER` and indexed directly by the
/// (timer, channel) ordinals, so lookup from interrupt context is O(1) with no
/// scanning. Unconfigured slots are inert: dispatch skips them.
pub struct CaptureTable<C> {
    slots: [Slot<C>; MAX_TIMERS * CC_CHANNELS_PER_TIMER],
}

impl<C> CaptureTable<C> {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::empty()),
        }
    }

    const fn slot_index(timer: TimerId, channel: CaptureChannel) -> usize {
        timer.index() + MAX_TIMERS * channel.index()
    }

    /// Register an edge callback and an optional overflow callback for a channel
    ///
    /// `reference` is an opaque value handed back to the callbacks, typically
    /// the receiver input index the channel feeds. Registering over an existing
    /// slot replaces it.
    pub fn configure_channel_callbacks(
        &mut self,
        timer: TimerId,
        channel: CaptureChannel,
        reference: u8,
        edge_callback: Option<CaptureCallback<C>>,
        overflow_callback: Option<CaptureCallback<C>>,
    ) {
        let slot = &mut self.slots[Self::slot_index(timer, channel)];
        slot.reference = reference;
        slot.edge_callback = edge_callback;
        slot.overflow_callback = overflow_callback;
    }

    /// Register an edge callback only
    pub fn configure_channel_callback(
        &mut self,
        timer: TimerId,
        channel: CaptureChannel,
        reference: u8,
        edge_callback: CaptureCallback<C>,
    ) {
        self.configure_channel_callbacks(timer, channel, reference, Some(edge_callback), None);
    }

    /// Dispatch one latched interrupt to the registered callbacks
    ///
    /// Overflow fans out first to every channel of the timer that registered an
    /// overflow callback, then each pending compare capture is delivered to its
    /// edge callback. Channels without a callback are silently skipped.
    pub fn handle_irq(&self, ctx: &mut C, irq: &TimerIrq) {
        if let Some(period) = irq.period {
            for channel in CaptureChannel::ALL {
                let slot = &self.slots[Self::slot_index(irq.timer, channel)];
                if let Some(callback) = slot.overflow_callback {
                    callback(ctx, slot.reference, period);
                }
            }
        }

        for channel in CaptureChannel::ALL {
            if let Some(capture) = irq.captures[channel.index()] {
                let slot = &self.slots[Self::slot_index(irq.timer, channel)];
                if let Some(callback) = slot.edge_callback {
                    callback(ctx, slot.reference, capture);
                }
            }
        }
    }
}

impl<C> Default for CaptureTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
