use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::frame::{DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_DIMENSION};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub display: DisplayConfig,
    pub animation: AnimationConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: "/dev/cu.usbmodem11201".to_string(),
            baud_rate: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// When new colors and brightness are generated and sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SettingsTrigger {
    /// On the "change settings" key
    #[default]
    OnDemand,
    /// Every time the bar reverses direction
    OnSweepComplete,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub tick_interval_ms: u64,
    pub settings_trigger: SettingsTrigger,
    /// Fixed RNG seed for reproducible color sequences
    pub seed: Option<u64>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        AnimationConfig {
            tick_interval_ms: 50,
            settings_trigger: SettingsTrigger::OnDemand,
            seed: None,
        }
    }
}

impl AnimationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// How inbound telemetry is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryFormat {
    /// UTF-8 with replacement characters
    #[default]
    Text,
    /// Space separated hex bytes
    Hex,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Sleep between reads when nothing is waiting
    pub idle_interval_ms: u64,
    pub format: TelemetryFormat,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            idle_interval_ms: 10,
            format: TelemetryFormat::Text,
        }
    }
}

impl MonitorConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_interval_ms)
    }
}

impl Config {
    /// Reject settings the animation or the port cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            bail!("serial.port must not be empty");
        }
        if self.serial.baud_rate == 0 {
            bail!("serial.baud_rate must be greater than 0");
        }
        if self.display.width < 2 {
            bail!("display.width must be at least 2 (got {})", self.display.width);
        }
        if self.display.height == 0 {
            bail!("display.height must be at least 1");
        }
        if self.display.width > MAX_DIMENSION || self.display.height > MAX_DIMENSION {
            bail!(
                "display size {}x{} exceeds the {}x{} maximum",
                self.display.width,
                self.display.height,
                MAX_DIMENSION,
                MAX_DIMENSION
            );
        }
        if self.animation.tick_interval_ms == 0 {
            bail!("animation.tick_interval_ms must be greater than 0");
        }
        if self.monitor.idle_interval_ms == 0 {
            bail!("monitor.idle_interval_ms must be greater than 0");
        }
        Ok(())
    }
}
