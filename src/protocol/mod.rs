mod settings;
mod video;

pub use settings::{settings_packet, SETTINGS_HEADER};
pub use video::{frame_packet, VIDEO_HEADER};

/// Every packet starts with a 3-byte header
pub const HEADER_LEN: usize = 3;

/// Every packet ends with a 1-byte checksum
pub const CHECKSUM_LEN: usize = 1;

/// Sum of payload bytes mod 256. The header is never included.
pub fn checksum(payload: &[u8]) -> u8 {
    payload.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Assemble header + payload + checksum
fn build_packet(header: &[u8; HEADER_LEN], payload: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    packet.extend_from_slice(header);
    packet.extend_from_slice(payload);
    packet.push(checksum(payload));
    packet
}
