use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::animation::AnimationEngine;
use crate::channel::{ChannelReader, ChannelWriter};
use crate::config::Config;
use crate::input::{InputEvent, InputSource};
use crate::monitor::{InboundMonitor, TelemetrySink};
use crate::output::Output;
use crate::protocol::{checksum, frame_packet, settings_packet};
use crate::settings::ColorSettings;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Drives the animation onto the link while the monitor drains telemetry
pub struct Controller {
    config: Config,
    engine: AnimationEngine,
    output: Output,
    monitor: InboundMonitor,
    running: Arc<AtomicBool>,
    debug: bool,
    stopped: bool,
}

impl Controller {
    /// Start the writer and monitor threads on the given link halves
    pub fn new(
        config: Config,
        writer: Box<dyn ChannelWriter>,
        reader: Box<dyn ChannelReader>,
        sink: TelemetrySink,
        debug: bool,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let engine = AnimationEngine::from_config(&config.animation, &config.display);
        let output = Output::new(config.serial.port.clone(), writer);
        let monitor = InboundMonitor::spawn(
            config.serial.port.clone(),
            reader,
            &config.monitor,
            Arc::clone(&running),
            sink,
        );

        Controller {
            config,
            engine,
            output,
            monitor,
            running,
            debug,
            stopped: false,
        }
    }

    /// Get a clone of the running flag for signal handlers
    pub fn get_running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run the animation until cancelled or until the link fails
    pub fn run(&mut self, input: &mut dyn InputSource) -> Result<()> {
        let tick = self.config.animation.tick_interval();

        if self.debug {
            self.spawn_stats_thread();
        }

        let mut next_tick = Instant::now();

        while self.running.load(Ordering::Relaxed) {
            let frame = self.engine.frame();
            if log::log_enabled!(log::Level::Trace) {
                log::trace!("Frame at x={}:", self.engine.position().x);
                for row in frame.hex_rows() {
                    log::trace!("{}", row);
                }
            }

            let packet = frame_packet(frame.as_bytes());
            log::trace!(
                "Position x={}, checksum: {:02X}, total bytes: {}",
                self.engine.position().x,
                packet[packet.len() - 1],
                packet.len()
            );
            if !self.output.send_frame(packet) {
                break;
            }

            if let Some(settings) = self.engine.advance() {
                if !self.send_settings(&settings) {
                    break;
                }
            }

            match input.poll()? {
                Some(InputEvent::ChangeSettings) => {
                    if let Some(settings) = self.engine.request_change() {
                        if !self.send_settings(&settings) {
                            break;
                        }
                    }
                }
                Some(InputEvent::Terminate) => {
                    outln!("Exiting...");
                    self.running.store(false, Ordering::Relaxed);
                    break;
                }
                None => {}
            }

            next_tick += tick;
            let now = Instant::now();
            if next_tick > now {
                thread::sleep(next_tick - now);
            } else {
                // Running late; start counting again from now
                next_tick = now;
            }
        }

        Ok(())
    }

    /// Stop the writer and monitor, releasing both halves of the port.
    /// Returns the first transport error either of them hit. Only the
    /// first call does any work.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        self.running.store(false, Ordering::Relaxed);

        let output_result = self.output.stop();
        let monitor_result = self.monitor.join();
        log::debug!("Stopped after {} sweeps", self.engine.sweeps());

        output_result?;
        monitor_result?;
        Ok(())
    }

    fn send_settings(&self, settings: &ColorSettings) -> bool {
        let packet = settings_packet(settings);
        outln!(
            "Sending settings packet: color0={}, color1={}, brightness={}, checksum={:02X}",
            settings.base,
            settings.accent,
            settings.brightness,
            checksum(&settings.payload())
        );
        self.output.send_settings(packet)
    }

    /// Spawn statistics thread
    fn spawn_stats_thread(&self) {
        let frames_sent = self.output.frames_sent_counter();
        let bytes_received = self.monitor.bytes_received_counter();
        let running = Arc::clone(&self.running);
        let port = self.config.serial.port.clone();

        thread::spawn(move || {
            let mut last_sent = 0u64;
            let mut last_received = 0u64;
            let seconds = STATS_INTERVAL.as_secs_f64();

            while running.load(Ordering::Relaxed) {
                thread::sleep(STATS_INTERVAL);

                let sent = frames_sent.load(Ordering::Relaxed);
                let received = bytes_received.load(Ordering::Relaxed);
                log::debug!(
                    "[Stats] {}: sent {:.1} fps, received {:.1} B/s",
                    port,
                    (sent - last_sent) as f64 / seconds,
                    (received - last_received) as f64 / seconds
                );
                last_sent = sent;
                last_received = received;
            }
        });
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::testing::{MemoryWriter, ScriptedReader};
    use crate::config::SettingsTrigger;
    use crate::input::testing::ScriptedInput;
    use crate::input::NoInput;
    use crate::monitor::Telemetry;
    use crate::protocol::{self, SETTINGS_HEADER, VIDEO_HEADER};
    use std::io::{self, ErrorKind};
    use std::sync::mpsc;

    fn test_config(trigger: SettingsTrigger) -> Config {
        let mut config = Config::default();
        config.serial.port = "mem".to_string();
        config.animation.tick_interval_ms = 2;
        config.animation.settings_trigger = trigger;
        config.animation.seed = Some(3);
        config.monitor.idle_interval_ms = 1;
        config
    }

    fn split_packets(bytes: &[u8]) -> Vec<([u8; 3], Vec<u8>)> {
        protocol::testing::split_packets(bytes, 792)
    }

    #[test]
    fn test_frames_and_settings_on_demand() {
        let writer = MemoryWriter::default();
        let mut controller = Controller::new(
            test_config(SettingsTrigger::OnDemand),
            Box::new(writer.clone()),
            Box::new(ScriptedReader::default()),
            Box::new(|_| {}),
            false,
        );

        let mut input = ScriptedInput::new(vec![
            None,
            None,
            Some(InputEvent::ChangeSettings),
            None,
            Some(InputEvent::Terminate),
        ]);
        controller.run(&mut input).unwrap();
        controller.shutdown().unwrap();

        let packets = split_packets(&writer.bytes());
        let settings: Vec<_> = packets.iter().filter(|(h, _)| *h == SETTINGS_HEADER).collect();
        let frames: Vec<_> = packets.iter().filter(|(h, _)| *h == VIDEO_HEADER).collect();

        assert_eq!(settings.len(), 1);
        assert!(!frames.is_empty() && frames.len() <= 5);
        // Frames are whole and the first one shows the bar at column 0
        assert_eq!(frames[0].1[0], 0xFF);
        assert_eq!(frames[0].1.len(), 792);
        assert_eq!(settings[0].1, controller.engine.settings().payload().to_vec());
    }

    #[test]
    fn test_settings_follow_sweep() {
        let writer = MemoryWriter::default();
        let mut controller = Controller::new(
            test_config(SettingsTrigger::OnSweepComplete),
            Box::new(writer.clone()),
            Box::new(ScriptedReader::default()),
            Box::new(|_| {}),
            false,
        );

        // 46 ticks is one round trip: two reversals
        let mut polls = vec![None; 45];
        polls.push(Some(InputEvent::Terminate));
        let mut input = ScriptedInput::new(polls);
        controller.run(&mut input).unwrap();
        controller.shutdown().unwrap();

        let packets = split_packets(&writer.bytes());
        let settings: Vec<_> = packets.iter().filter(|(h, _)| *h == SETTINGS_HEADER).collect();
        assert_eq!(settings.len(), 2);
        assert_eq!(settings[1].1, controller.engine.settings().payload().to_vec());
        assert_eq!(controller.engine.sweeps(), 2);
    }

    /// Ten ticks end on a terminate, so the loop sleeps nine times
    fn run_ten_ticks(input: &mut dyn InputSource, tick_ms: u64) -> Duration {
        let mut config = test_config(SettingsTrigger::OnDemand);
        config.animation.tick_interval_ms = tick_ms;
        let mut controller = Controller::new(
            config,
            Box::new(MemoryWriter::default()),
            Box::new(ScriptedReader::default()),
            Box::new(|_| {}),
            false,
        );

        let started = Instant::now();
        controller.run(input).unwrap();
        let elapsed = started.elapsed();
        controller.shutdown().unwrap();
        elapsed
    }

    #[test]
    fn test_fixed_cadence() {
        let mut polls = vec![None; 9];
        polls.push(Some(InputEvent::Terminate));
        let elapsed = run_ten_ticks(&mut ScriptedInput::new(polls), 10);

        assert!(elapsed >= Duration::from_millis(90), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(500), "{:?}", elapsed);
    }

    /// Stalls once on the first poll, then terminates on the tenth
    struct StallingInput {
        polls: u32,
        stall: Duration,
    }

    impl InputSource for StallingInput {
        fn poll(&mut self) -> Result<Option<InputEvent>> {
            self.polls += 1;
            if self.polls == 1 {
                thread::sleep(self.stall);
            }
            if self.polls == 10 {
                return Ok(Some(InputEvent::Terminate));
            }
            Ok(None)
        }
    }

    #[test]
    fn test_late_tick_does_not_bunch_later_ticks() {
        let mut input = StallingInput {
            polls: 0,
            stall: Duration::from_millis(50),
        };
        let elapsed = run_ten_ticks(&mut input, 10);

        // The stall ends tick 0; ticks 1 to 8 still get a full interval each.
        // Catching up on missed deadlines would finish near 90 ms instead.
        assert!(elapsed >= Duration::from_millis(130), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(600), "{:?}", elapsed);
    }

    #[test]
    fn test_running_flag_stops_loop() {
        let writer = MemoryWriter::default();
        let mut controller = Controller::new(
            test_config(SettingsTrigger::OnDemand),
            Box::new(writer),
            Box::new(ScriptedReader::default()),
            Box::new(|_| {}),
            false,
        );

        let running = controller.get_running_flag();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            running.store(false, Ordering::Relaxed);
        });

        controller.run(&mut NoInput).unwrap();
        stopper.join().unwrap();
        assert!(controller.shutdown().is_ok());
        // Second shutdown does nothing
        assert!(controller.shutdown().is_ok());
    }

    #[test]
    fn test_telemetry_reaches_sink() {
        let (tx, rx) = mpsc::channel();
        let mut controller = Controller::new(
            test_config(SettingsTrigger::OnDemand),
            Box::new(MemoryWriter::default()),
            Box::new(ScriptedReader::new(vec![Ok(b"Distance: 340\n".to_vec())])),
            Box::new(move |t: Telemetry| {
                let _ = tx.send(t);
            }),
            false,
        );

        let telemetry = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(telemetry, Telemetry::Text("Distance: 340\n".to_string()));
        controller.shutdown().unwrap();
    }

    #[test]
    fn test_write_failure_is_reported() {
        let writer = MemoryWriter::default();
        *writer.fail.lock().unwrap() = true;
        let mut controller = Controller::new(
            test_config(SettingsTrigger::OnDemand),
            Box::new(writer),
            Box::new(ScriptedReader::default()),
            Box::new(|_| {}),
            false,
        );

        // The loop ends on its own once the writer gives up
        controller.run(&mut NoInput).unwrap();
        let err = controller.shutdown().unwrap_err();
        assert!(err.to_string().contains("write to mem failed"), "{}", err);
    }

    #[test]
    fn test_read_failure_stops_loop() {
        let mut controller = Controller::new(
            test_config(SettingsTrigger::OnDemand),
            Box::new(MemoryWriter::default()),
            Box::new(ScriptedReader::new(vec![Err(io::Error::new(
                ErrorKind::BrokenPipe,
                "unplugged",
            ))])),
            Box::new(|_| {}),
            false,
        );

        controller.run(&mut NoInput).unwrap();
        let err = controller.shutdown().unwrap_err();
        assert!(err.to_string().contains("read from mem failed"), "{}", err);
    }
}
