use rand::Rng;
use std::fmt;

/// Lowest brightness the device accepts (0 would blank the display)
pub const MIN_BRIGHTNESS: u8 = 1;

/// Highest brightness, limited by the 7-bit field
pub const MAX_BRIGHTNESS: u8 = 127;

/// Size of the settings payload: two RGB triples plus brightness
pub const SETTINGS_PAYLOAD_LEN: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[allow(dead_code)]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Rgb {
            r: rng.gen(),
            g: rng.gen(),
            b: rng.gen(),
        }
    }

    pub fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.r, self.g, self.b)
    }
}

/// Palette colors and global brightness sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSettings {
    /// Color for pixels with the palette bit clear
    pub base: Rgb,
    /// Color for pixels with the palette bit set
    pub accent: Rgb,
    pub brightness: u8,
}

impl ColorSettings {
    /// Pick both colors and a brightness in `[1, 127]` at random
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        ColorSettings {
            base: Rgb::random(rng),
            accent: Rgb::random(rng),
            brightness: rng.gen_range(MIN_BRIGHTNESS..=MAX_BRIGHTNESS),
        }
    }

    /// Wire layout: R0 G0 B0 R1 G1 B1 brightness
    pub fn payload(&self) -> [u8; SETTINGS_PAYLOAD_LEN] {
        let [r0, g0, b0] = self.base.to_bytes();
        let [r1, g1, b1] = self.accent.to_bytes();
        [r0, g0, b0, r1, g1, b1, self.brightness]
    }
}
