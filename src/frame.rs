/// Default display width in columns
pub const DEFAULT_WIDTH: usize = 24;

/// Default display height in rows
pub const DEFAULT_HEIGHT: usize = 33;

/// Largest width or height accepted from configuration
pub const MAX_DIMENSION: usize = 255;

/// Maximum value of the 7-bit brightness field
pub const MAX_BRIGHTNESS: u8 = 0x7F;

/// Palette bit (bit 7) of an encoded pixel
pub const PALETTE_BIT: u8 = 0x80;

/// Brightness per distance from the bar center: 127, 127*0.75, 127*0.5, 127*0.25, then off.
/// Values are truncated, not rounded.
pub const BAR_BRIGHTNESS: [u8; 6] = [127, 95, 63, 31, 0, 0];

/// Which of the two configured colors a pixel uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Palette {
    Base,
    Accent,
}

/// Encode palette + brightness into a single pixel byte
pub fn encode_pixel(palette: Palette, brightness: u8) -> u8 {
    let palette_bit = match palette {
        Palette::Base => 0,
        Palette::Accent => PALETTE_BIT,
    };
    palette_bit | (brightness & MAX_BRIGHTNESS)
}

/// One encoded video frame, flattened row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl Frame {
    #[allow(dead_code)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[allow(dead_code)]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixel bytes, ready to be used as a packet payload
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    #[allow(dead_code)]
    pub fn pixel(&self, row: usize, col: usize) -> u8 {
        self.pixels[row * self.width + col]
    }

    /// Top-to-bottom values of one column
    #[allow(dead_code)]
    pub fn column(&self, col: usize) -> Vec<u8> {
        (0..self.height).map(|row| self.pixel(row, col)).collect()
    }

    /// Hex dump, one line per row (used for trace output)
    pub fn hex_rows(&self) -> Vec<String> {
        self.pixels
            .chunks(self.width)
            .map(|row| row.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>().join(" "))
            .collect()
    }

    fn fill_column(&mut self, col: usize, value: u8) {
        for row in 0..self.height {
            self.pixels[row * self.width + col] = value;
        }
    }
}

/// Build the bar frame for the default 24x33 display
#[allow(dead_code)]
pub fn encode(position: i32) -> Frame {
    encode_sized(position, DEFAULT_WIDTH, DEFAULT_HEIGHT)
}

/// Build a frame with a vertical accent bar centered on `position`.
///
/// Every pixel starts as base color at full brightness. Columns near the
/// bar switch to the accent color with brightness falling off per
/// [`BAR_BRIGHTNESS`]; the center column is always accent at full
/// brightness. Columns that fall outside the grid are skipped.
pub fn encode_sized(position: i32, width: usize, height: usize) -> Frame {
    let mut frame = Frame {
        width,
        height,
        pixels: vec![encode_pixel(Palette::Base, MAX_BRIGHTNESS); width * height],
    };

    for (offset, &brightness) in BAR_BRIGHTNESS.iter().enumerate() {
        if brightness == 0 {
            continue;
        }
        for sign in [-1i64, 1] {
            let col = position as i64 + sign * offset as i64;
            if let Some(col) = column_index(col, width) {
                frame.fill_column(col, encode_pixel(Palette::Accent, brightness));
            }
        }
    }

    if let Some(center) = column_index(position as i64, width) {
        frame.fill_column(center, encode_pixel(Palette::Accent, MAX_BRIGHTNESS));
    }

    frame
}

fn column_index(col: i64, width: usize) -> Option<usize> {
    if col >= 0 && (col as u64) < width as u64 {
        Some(col as usize)
    } else {
        None
    }
}
