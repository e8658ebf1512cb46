use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;

use crate::channel::ChannelWriter;
use crate::error::LinkError;

/// Packets that may be queued ahead of the writer
const QUEUE_DEPTH: usize = 2;

/// Kind of packet handed to the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PacketKind {
    Video,
    Settings,
}

/// Outbound side of the link, served by a dedicated writer thread.
///
/// Packets are written whole by a single thread, so video frames and
/// settings updates never interleave on the wire.
pub struct Output {
    port: String,
    sender: Option<SyncSender<(PacketKind, Vec<u8>)>>,
    frames_sent: Arc<AtomicU64>,
    worker_handle: Option<thread::JoinHandle<Result<(), LinkError>>>,
}

impl Output {
    /// Take ownership of the writer half and start the writer thread
    pub fn new(port: String, writer: Box<dyn ChannelWriter>) -> Self {
        let (sender, receiver) = mpsc::sync_channel(QUEUE_DEPTH);

        let frames_sent = Arc::new(AtomicU64::new(0));

        let worker_port = port.clone();
        let worker_frames_sent = Arc::clone(&frames_sent);

        let worker_handle = thread::spawn(move || {
            worker_thread(writer, receiver, worker_port, worker_frames_sent)
        });

        Output {
            port,
            sender: Some(sender),
            frames_sent,
            worker_handle: Some(worker_handle),
        }
    }

    /// Queue a video packet without waiting. If the writer is still busy
    /// with earlier packets this frame is skipped; the next tick brings a
    /// fresh one. Returns false once the writer has stopped.
    pub fn send_frame(&self, packet: Vec<u8>) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        match sender.try_send((PacketKind::Video, packet)) {
            Ok(_) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("Writer busy on {}, frame skipped", self.port);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Queue a settings packet. Settings are never skipped, so this waits
    /// for queue space. Returns false once the writer has stopped.
    pub fn send_settings(&self, packet: Vec<u8>) -> bool {
        match &self.sender {
            Some(sender) => sender.send((PacketKind::Settings, packet)).is_ok(),
            None => false,
        }
    }

    /// Get a clone of the frames sent counter (for statistics)
    pub fn frames_sent_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.frames_sent)
    }

    /// Stop the writer and wait for it. Packets already queued are still
    /// written. Returns the error that stopped the writer, if any; later
    /// calls return Ok.
    pub fn stop(&mut self) -> Result<(), LinkError> {
        // Closing the queue ends the writer once it is drained
        self.sender.take();

        match self.worker_handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                log::error!("Writer thread for {} panicked", self.port);
                Ok(())
            }),
            None => Ok(()),
        }
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Worker thread function - blocks on the queue waiting for packets, writes them to the port
fn worker_thread(
    mut writer: Box<dyn ChannelWriter>,
    receiver: Receiver<(PacketKind, Vec<u8>)>,
    port: String,
    frames_sent: Arc<AtomicU64>,
) -> Result<(), LinkError> {
    // Ends when every sender is gone and the queue is empty
    while let Ok((kind, packet)) = receiver.recv() {
        if log::log_enabled!(log::Level::Trace) {
            let hex: String = packet
                .iter()
                .take(16)
                .map(|b| format!("{:02x}", b))
                .collect::<Vec<_>>()
                .join(" ");
            log::trace!("[{}] Sending {:?} packet: {} bytes, starts {}", port, kind, packet.len(), hex);
        }

        if let Err(source) = writer.write_packet(&packet) {
            errln!("✗ Serial error on {}: {}", port, source);
            errln!("✗ Output {} is now disconnected", port);
            return Err(LinkError::Write { port, source });
        }

        if kind == PacketKind::Video {
            frames_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    Ok(())
}
