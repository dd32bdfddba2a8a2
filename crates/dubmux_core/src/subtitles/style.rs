//! Caption style shared by every dialogue event.

use serde::{Deserialize, Serialize};

/// Font size as a fraction of frame width.
pub const FONT_SIZE_RATIO: f64 = 0.115;
/// Smallest font size ever emitted.
pub const MIN_FONT_SIZE: u32 = 50;

/// ASS color (stored as RGBA, serialized as &HAABBGGRR).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssColor {
    /// Red component (0-255).
    pub r: u8,
    /// Green component (0-255).
    pub g: u8,
    /// Blue component (0-255).
    pub b: u8,
    /// Alpha component (0-255, 0 = opaque, 255 = transparent).
    pub a: u8,
}

impl AssColor {
    pub const WHITE: AssColor = AssColor::from_rgba(255, 255, 255, 0);
    pub const BLACK: AssColor = AssColor::from_rgba(0, 0, 0, 0);

    pub const fn from_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse from ASS color string (&HAABBGGRR or &HBBGGRR).
    pub fn from_ass_string(s: &str) -> Option<Self> {
        let s = s.trim().trim_start_matches('&').trim_start_matches(['H', 'h']);
        let s = s.trim_end_matches('&');
        if s.is_empty() || s.len() > 8 {
            return None;
        }
        let value = u32::from_str_radix(s, 16).ok()?;

        Some(Self {
            r: (value & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: ((value >> 16) & 0xFF) as u8,
            a: if s.len() > 6 {
                ((value >> 24) & 0xFF) as u8
            } else {
                0
            },
        })
    }

    /// Convert to ASS color string (&HAABBGGRR).
    pub fn to_ass_string(&self) -> String {
        format!("&H{:02X}{:02X}{:02X}{:02X}", self.a, self.b, self.g, self.r)
    }
}

/// The single visual style of every caption.
///
/// Derived from the frame width; nothing here is configurable per caption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderStyle {
    pub name: String,
    pub font_name: String,
    pub font_size: u32,
    pub primary_color: AssColor,
    pub secondary_color: AssColor,
    pub outline_color: AssColor,
    /// Backing box / shadow color (semi-transparent black).
    pub back_color: AssColor,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikeout: bool,
    pub scale_x: u32,
    pub scale_y: u32,
    pub spacing: u32,
    pub angle: u32,
    /// 1 = outline + shadow.
    pub border_style: u32,
    pub outline: u32,
    pub shadow: u32,
    /// Numpad alignment; 2 = bottom center.
    pub alignment: u32,
    pub margin_l: u32,
    pub margin_r: u32,
    pub margin_v: u32,
    pub encoding: u32,
}

impl RenderStyle {
    pub const NAME: &'static str = "Default";

    /// Style for a frame `width` pixels wide.
    pub fn for_width(width: u32, font_name: &str) -> Self {
        Self {
            name: Self::NAME.to_string(),
            font_name: font_name.to_string(),
            font_size: font_size_for_width(width),
            primary_color: AssColor::WHITE,
            secondary_color: AssColor::BLACK,
            outline_color: AssColor::BLACK,
            back_color: AssColor::from_rgba(0, 0, 0, 0x80),
            bold: true,
            italic: false,
            underline: false,
            strikeout: false,
            scale_x: 100,
            scale_y: 100,
            spacing: 0,
            angle: 0,
            border_style: 1,
            outline: 10,
            shadow: 0,
            alignment: 2,
            margin_l: 10,
            margin_r: 10,
            margin_v: 250,
            encoding: 1,
        }
    }

    /// The `Style:` line of the `[V4+ Styles]` section.
    pub fn to_ass_line(&self) -> String {
        format!(
            "Style: {},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            self.name,
            self.font_name,
            self.font_size,
            self.primary_color.to_ass_string(),
            self.secondary_color.to_ass_string(),
            self.outline_color.to_ass_string(),
            self.back_color.to_ass_string(),
            ass_bool(self.bold),
            ass_bool(self.italic),
            ass_bool(self.underline),
            ass_bool(self.strikeout),
            self.scale_x,
            self.scale_y,
            self.spacing,
            self.angle,
            self.border_style,
            self.outline,
            self.shadow,
            self.alignment,
            self.margin_l,
            self.margin_r,
            self.margin_v,
            self.encoding,
        )
    }
}

/// `round(width * 0.115)`, never below 50.
pub fn font_size_for_width(width: u32) -> u32 {
    let size = (width as f64 * FONT_SIZE_RATIO).round() as u32;
    size.max(MIN_FONT_SIZE)
}

fn ass_bool(value: bool) -> i32 {
    if value {
        -1
    } else {
        0
    }
}

/// Rounding mode for time values when writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    /// Round down (floor).
    Floor,
    /// Round to nearest.
    #[default]
    Round,
    /// Round up (ceil).
    Ceil,
}

impl RoundingMode {
    /// Round a millisecond value to centiseconds (ASS precision).
    pub fn apply_cs(&self, ms: f64) -> u64 {
        self.apply(ms / 10.0) as u64
    }

    /// Round a millisecond value to whole milliseconds (SRT precision).
    pub fn apply_ms(&self, ms: f64) -> u64 {
        self.apply(ms) as u64
    }

    fn apply(&self, value: f64) -> f64 {
        let value = value.max(0.0);
        match self {
            Self::Floor => value.floor(),
            Self::Round => value.round(),
            Self::Ceil => value.ceil(),
        }
    }
}
