use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{AnimationConfig, DisplayConfig, SettingsTrigger};
use crate::frame::{self, Frame};
use crate::settings::ColorSettings;

/// Bar column and direction of travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarPosition {
    pub x: i32,
    pub dx: i32,
}

impl BarPosition {
    pub fn start() -> Self {
        BarPosition { x: 0, dx: 1 }
    }

    /// Move one column and bounce off the edges. Returns true on a reversal.
    ///
    /// The bounds are checked after the move, so the bar touches each edge
    /// column for exactly one tick before heading back.
    pub fn step(&mut self, width: usize) -> bool {
        self.x += self.dx;
        if self.x >= width as i32 - 1 || self.x <= 0 {
            self.dx = -self.dx;
            true
        } else {
            false
        }
    }
}

/// Sweeping bar animation plus the color settings that go with it
pub struct AnimationEngine<R: Rng = StdRng> {
    position: BarPosition,
    settings: ColorSettings,
    trigger: SettingsTrigger,
    width: usize,
    height: usize,
    sweeps: u64,
    rng: R,
}

impl AnimationEngine<StdRng> {
    /// Seeded from the config when a seed is set, otherwise from OS entropy
    pub fn from_config(animation: &AnimationConfig, display: &DisplayConfig) -> Self {
        let rng = match animation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(rng, animation.settings_trigger, display.width, display.height)
    }
}

impl<R: Rng> AnimationEngine<R> {
    pub fn with_rng(mut rng: R, trigger: SettingsTrigger, width: usize, height: usize) -> Self {
        let settings = ColorSettings::random(&mut rng);
        AnimationEngine {
            position: BarPosition::start(),
            settings,
            trigger,
            width,
            height,
            sweeps: 0,
            rng,
        }
    }

    pub fn position(&self) -> BarPosition {
        self.position
    }

    pub fn settings(&self) -> &ColorSettings {
        &self.settings
    }

    /// Number of direction reversals so far
    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// Frame for the current bar position
    pub fn frame(&self) -> Frame {
        frame::encode_sized(self.position.x, self.width, self.height)
    }

    /// Advance one tick. Returns fresh settings when a sweep just completed
    /// and the trigger policy is [`SettingsTrigger::OnSweepComplete`].
    pub fn advance(&mut self) -> Option<ColorSettings> {
        if !self.position.step(self.width) {
            return None;
        }
        self.sweeps += 1;
        log::debug!("Sweep {} complete at x={}", self.sweeps, self.position.x);

        match self.trigger {
            SettingsTrigger::OnSweepComplete => Some(self.regenerate()),
            SettingsTrigger::OnDemand => None,
        }
    }

    /// Handle a "change settings" request from the user
    pub fn request_change(&mut self) -> Option<ColorSettings> {
        match self.trigger {
            SettingsTrigger::OnDemand => Some(self.regenerate()),
            SettingsTrigger::OnSweepComplete => {
                log::debug!("Ignoring settings change request, settings follow the sweep");
                None
            }
        }
    }

    fn regenerate(&mut self) -> ColorSettings {
        self.settings = ColorSettings::random(&mut self.rng);
        self.settings
    }
}
