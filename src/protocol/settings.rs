use super::build_packet;
use crate::settings::ColorSettings;

/// Settings packet header
pub const SETTINGS_HEADER: [u8; 3] = [0xFE, 0xFE, 0xFC];

/// Build a settings packet: colors and brightness
pub fn settings_packet(settings: &ColorSettings) -> Vec<u8> {
    build_packet(&SETTINGS_HEADER, &settings.payload())
}
