use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::channel::ChannelReader;
use crate::config::{MonitorConfig, TelemetryFormat};
use crate::error::LinkError;

/// One decoded chunk of inbound telemetry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Telemetry {
    Text(String),
    Hex(String),
}

impl Telemetry {
    /// Decode raw bytes. Invalid UTF-8 is replaced, never rejected.
    pub fn decode(data: &[u8], format: TelemetryFormat) -> Self {
        match format {
            TelemetryFormat::Text => Telemetry::Text(String::from_utf8_lossy(data).into_owned()),
            TelemetryFormat::Hex => Telemetry::Hex(
                data.iter()
                    .map(|b| format!("{:02X}", b))
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Text is passed through as-is; the device supplies its own line breaks
            Telemetry::Text(text) => write!(f, "[Serial In] {}", text),
            Telemetry::Hex(hex) => writeln!(f, "[Serial In] HEX: {}", hex),
        }
    }
}

/// Destination for decoded telemetry
pub type TelemetrySink = Box<dyn FnMut(Telemetry) + Send>;

/// Background reader draining the inbound half of the link
pub struct InboundMonitor {
    bytes_received: Arc<AtomicU64>,
    handle: Option<thread::JoinHandle<Result<(), LinkError>>>,
}

impl InboundMonitor {
    /// Start polling `reader` until `running` is cleared.
    ///
    /// A read error ends the monitor and clears `running` so the rest of
    /// the program shuts down too.
    pub fn spawn(
        port: String,
        reader: Box<dyn ChannelReader>,
        config: &MonitorConfig,
        running: Arc<AtomicBool>,
        sink: TelemetrySink,
    ) -> Self {
        let bytes_received = Arc::new(AtomicU64::new(0));
        let worker_bytes = Arc::clone(&bytes_received);
        let idle = config.idle_interval();
        let format = config.format;

        let handle = thread::spawn(move || {
            let result = monitor_loop(reader, &port, idle, format, &running, &worker_bytes, sink);
            if let Err(e) = &result {
                errln!("✗ Error in serial monitor: {}", e);
                running.store(false, Ordering::Relaxed);
            }
            result
        });

        InboundMonitor {
            bytes_received,
            handle: Some(handle),
        }
    }

    /// Get a clone of the received byte counter (for statistics)
    pub fn bytes_received_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.bytes_received)
    }

    /// Wait for the monitor to finish. The caller clears the running flag first.
    pub fn join(&mut self) -> Result<(), LinkError> {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                log::error!("Serial monitor thread panicked");
                Ok(())
            }),
            None => Ok(()),
        }
    }
}

fn monitor_loop(
    mut reader: Box<dyn ChannelReader>,
    port: &str,
    idle: Duration,
    format: TelemetryFormat,
    running: &AtomicBool,
    bytes_received: &AtomicU64,
    mut sink: TelemetrySink,
) -> Result<(), LinkError> {
    while running.load(Ordering::Relaxed) {
        let data = reader.read_available().map_err(|source| LinkError::Read {
            port: port.to_string(),
            source,
        })?;

        if data.is_empty() {
            thread::sleep(idle);
            continue;
        }

        bytes_received.fetch_add(data.len() as u64, Ordering::Relaxed);
        sink(Telemetry::decode(&data, format));
    }

    Ok(())
}
