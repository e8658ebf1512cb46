use serialport::SerialPort;
use std::io::{self, ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;

use crate::config::SerialConfig;
use crate::error::LinkError;

/// Outbound half of the link
pub trait ChannelWriter: Send {
    /// Write one complete packet
    fn write_packet(&mut self, packet: &[u8]) -> io::Result<()>;
}

impl<W: Write + Send> ChannelWriter for W {
    fn write_packet(&mut self, packet: &[u8]) -> io::Result<()> {
        self.write_all(packet)?;
        self.flush()
    }
}

/// Inbound half of the link
pub trait ChannelReader: Send {
    /// Return whatever bytes are waiting right now, possibly none. Never waits for data.
    fn read_available(&mut self) -> io::Result<Vec<u8>>;
}

impl ChannelReader for Box<dyn SerialPort> {
    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let waiting = self.bytes_to_read().map_err(io::Error::from)? as usize;
        if waiting == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![0u8; waiting];
        match self.read(&mut buffer) {
            Ok(n) => {
                buffer.truncate(n);
                Ok(buffer)
            }
            Err(e)
                if e.kind() == ErrorKind::TimedOut
                    || e.kind() == ErrorKind::WouldBlock
                    || e.kind() == ErrorKind::Interrupted =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

/// Serial port split into independently owned writer and reader halves
pub struct SerialLink {
    pub writer: Box<dyn SerialPort>,
    pub reader: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Open the port 8N1 without flow control and clone a handle for reading
    pub fn open(config: &SerialConfig) -> Result<Self, LinkError> {
        let open_err = |source| LinkError::Open {
            port: config.port.clone(),
            source,
        };

        let mut port = serialport::new(&config.port, config.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(open_err)?;

        // Bound blocking writes so a stalled device surfaces as an error
        port.set_timeout(Duration::from_millis(1000)).map_err(open_err)?;

        if let Err(e) = port.write_data_terminal_ready(true) {
            log::warn!("Failed to set DTR on {}: {}", config.port, e);
        }

        // Allow device to initialize
        thread::sleep(Duration::from_millis(100));

        let reader = port.try_clone().map_err(|source| LinkError::Clone {
            port: config.port.clone(),
            source,
        })?;

        Ok(SerialLink {
            writer: port,
            reader,
        })
    }
}
