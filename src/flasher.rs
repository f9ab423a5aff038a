use crate::Indicator;
use crate::config::ConfigError;

const DEFAULT_ON_TIME: u32 = 100;
const DEFAULT_OFF_TIME: u32 = 100;

/// Represents the output state of an indicator LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedState {
    /// LED is lit
    On,
    /// LED is dark
    Off,
}

/// Callback invoked when the LED output changes.
///
/// # Parameters
/// - `state`: The new state of the LED
pub type LedCallback = fn(&LedState);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlinkMode {
    Idle,
    Constant,
    Count(u16),
}

/// Non-blocking LED blink scheduler.
///
/// The LED toggles once strictly more than the on or off time has elapsed
/// since the previous toggle. Counted blinks finish on the falling edge.
pub struct Flasher {
    on_ms: u32,
    off_ms: u32,
    led: LedState,
    last_toggle: u32,
    mode: BlinkMode,
    on_off_callback: LedCallback,
}

impl Flasher {
    #[must_use]
    pub fn builder() -> FlasherBuilder {
        FlasherBuilder::new()
    }

    pub fn led(&self) -> LedState {
        self.led
    }

    pub fn timing(&self) -> (u32, u32) {
        (self.on_ms, self.off_ms)
    }

    /// True while a constant or counted blink pattern is running.
    pub fn is_active(&self) -> bool {
        self.mode != BlinkMode::Idle
    }

    fn switch(&mut self, led: LedState, now_ms: u32) {
        self.led = led;
        self.last_toggle = now_ms;
        (self.on_off_callback)(&led);
    }
}

impl Indicator for Flasher {
    fn set_timing(&mut self, on_ms: u32, off_ms: u32) {
        self.on_ms = on_ms;
        self.off_ms = off_ms;
    }

    fn blink_constant(&mut self) {
        self.mode = BlinkMode::Constant;
    }

    fn blink_n_times(&mut self, n: u16) {
        self.mode = if n == 0 {
            BlinkMode::Idle
        } else {
            BlinkMode::Count(n)
        };
    }

    fn off(&mut self) {
        self.mode = BlinkMode::Idle;
        self.led = LedState::Off;
        (self.on_off_callback)(&LedState::Off);
    }

    fn tick(&mut self, now_ms: u32) {
        if self.mode == BlinkMode::Idle {
            return;
        }

        let elapsed = now_ms.wrapping_sub(self.last_toggle);

        match self.led {
            LedState::On if elapsed > self.on_ms => {
                self.switch(LedState::Off, now_ms);

                if let BlinkMode::Count(n) = self.mode {
                    self.mode = if n > 1 {
                        BlinkMode::Count(n - 1)
                    } else {
                        BlinkMode::Idle
                    };
                }
            }
            LedState::Off if elapsed > self.off_ms => self.switch(LedState::On, now_ms),
            _ => {}
        }
    }
}

pub struct FlasherBuilder {
    on_ms: u32,
    off_ms: u32,
    on_off_callback: Option<LedCallback>,
}

impl FlasherBuilder {
    pub(crate) fn new() -> Self {
        Self {
            on_ms: DEFAULT_ON_TIME,
            off_ms: DEFAULT_OFF_TIME,
            on_off_callback: None,
        }
    }

    pub fn on_off_callback(mut self, on_off_callback: LedCallback) -> Self {
        self.on_off_callback = Some(on_off_callback);
        self
    }

    pub fn timing(mut self, on_ms: u32, off_ms: u32) -> Self {
        self.on_ms = on_ms;
        self.off_ms = off_ms;
        self
    }

    /// Builds an idle flasher with the LED switched off.
    pub fn build(self) -> Result<Flasher, ConfigError> {
        let on_off_callback = self.on_off_callback.ok_or(ConfigError::MissingCallback)?;

        on_off_callback(&LedState::Off);

        Ok(Flasher {
            on_ms: self.on_ms,
            off_ms: self.off_ms,
            led: LedState::Off,
            last_toggle: 0,
            mode: BlinkMode::Idle,
            on_off_callback,
        })
    }
}
