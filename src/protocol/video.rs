use super::build_packet;

/// Video frame header
pub const VIDEO_HEADER: [u8; 3] = [0xFE, 0xFE, 0xFD];

/// Build a video packet from row-major encoded pixels
pub fn frame_packet(payload: &[u8]) -> Vec<u8> {
    build_packet(&VIDEO_HEADER, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame;
    use crate::protocol::checksum;

    #[test]
    fn test_zero_frame_packet() {
        let packet = frame_packet(&[0u8; 792]);
        assert_eq!(packet.len(), 796);
        assert_eq!(&packet[..3], &[0xFE, 0xFE, 0xFD]);
        assert!(packet[3..795].iter().all(|&b| b == 0));
        assert_eq!(packet[795], 0x00);
    }

    #[test]
    fn test_encoded_frame_packet() {
        let frame = frame::encode(5);
        let packet = frame_packet(frame.as_bytes());
        assert_eq!(packet.len(), 3 + 792 + 1);
        assert_eq!(&packet[3..795], frame.as_bytes());
        assert_eq!(packet[795], checksum(frame.as_bytes()));
    }
}
