use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::Write;

#[macro_use]
mod console;
mod animation;
mod channel;
mod config;
mod controller;
mod error;
mod frame;
mod input;
mod monitor;
mod output;
mod protocol;
mod settings;

use channel::SerialLink;
use config::{Config, SettingsTrigger, TelemetryFormat};
use controller::Controller;
use input::{InputSource, Keyboard, NoInput};
use monitor::Telemetry;

#[derive(Parser)]
#[command(name = "bar_stream")]
#[command(about = "Streams a sweeping bar animation to a serial LED matrix\n\nPress SPACE to change colors and brightness, q or Ctrl-C to exit.", long_about = None)]
struct Cli {
    /// Path to configuration file (JSON)
    config: Option<String>,

    /// Serial port, overrides the config file
    #[arg(long)]
    port: Option<String>,

    /// Baud rate, overrides the config file
    #[arg(long)]
    baud: Option<u32>,

    /// Milliseconds per animation frame
    #[arg(long)]
    tick_ms: Option<u64>,

    /// When new colors and brightness are sent
    #[arg(long, value_enum)]
    trigger: Option<SettingsTrigger>,

    /// Seed for reproducible colors
    #[arg(long)]
    seed: Option<u64>,

    /// Print inbound serial data as hex instead of text
    #[arg(long)]
    hex: bool,

    /// Enable debug output (statistics, sweeps)
    #[arg(long)]
    debug: bool,

    /// Enable detailed debug (hex dumps every frame)
    #[arg(long)]
    ddebug: bool,
}

impl Cli {
    fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let config_data = fs::read_to_string(path)
                    .context(format!("Failed to read config file {}", path))?;
                serde_json::from_str(&config_data)
                    .context(format!("Failed to parse config file {}", path))?
            }
            None => Config::default(),
        };

        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.animation.tick_interval_ms = tick_ms;
        }
        if let Some(trigger) = self.trigger {
            config.animation.settings_trigger = trigger;
        }
        if self.seed.is_some() {
            config.animation.seed = self.seed;
        }
        if self.hex {
            config.monitor.format = TelemetryFormat::Hex;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(debug: bool, ddebug: bool) {
    let level = if ddebug {
        log::LevelFilter::Trace
    } else if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            write!(
                buf,
                "[{:<5} {}] {}{}",
                record.level(),
                record.target(),
                record.args(),
                console::newline()
            )
        })
        .init();
}

fn print_telemetry(telemetry: Telemetry) {
    console::print_raw(&telemetry.to_string());
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ddebug implies debug
    let debug = cli.debug || cli.ddebug;
    init_logging(debug, cli.ddebug);

    let config = cli.load_config()?;

    let link = SerialLink::open(&config.serial)?;
    outln!("✓ Opened serial port {} at {} baud.", config.serial.port, config.serial.baud_rate);
    log::debug!(
        "{}x{} frames every {} ms, settings {:?}",
        config.display.width,
        config.display.height,
        config.animation.tick_interval_ms,
        config.animation.settings_trigger
    );

    let mut controller = Controller::new(
        config,
        Box::new(link.writer),
        Box::new(link.reader),
        Box::new(print_telemetry),
        debug,
    );
    outln!("Serial monitor started - all incoming data will be printed.");

    // Set up Ctrl-C handler with graceful shutdown
    let running = controller.get_running_flag();
    let result = ctrlc::set_handler(move || {
        outln!("\nExiting...");
        running.store(false, std::sync::atomic::Ordering::Relaxed);
    });

    if let Err(e) = result {
        errln!("Warning: Could not set Ctrl-C handler: {}", e);
    }

    // Raw mode is restored when `input` drops, on every exit path
    let mut input: Box<dyn InputSource> = match Keyboard::new() {
        Ok(keyboard) => Box::new(keyboard),
        Err(e) => {
            log::warn!("{:#}; keyboard commands disabled", e);
            Box::new(NoInput)
        }
    };

    // Run the animation (blocks until shutdown)
    let run_result = controller.run(input.as_mut());
    drop(input);

    let shutdown_result = controller.shutdown();
    outln!("Serial port closed.");

    run_result.and(shutdown_result)
}
