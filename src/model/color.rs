//! Byte-based colors and color space helpers

/// An RGB color with 0..=255 components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RGBColor {
    /// Red component
    pub r: u8,
    /// Green component
    pub g: u8,
    /// Blue component
    pub b: u8,
}

impl RGBColor {
    /// Create a new color
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from float components in `0.0..=1.0`
    pub fn from_float_components(r: f64, g: f64, b: f64) -> Self {
        Self::new(
            color_component_from_float(r),
            color_component_from_float(g),
            color_component_from_float(b),
        )
    }

    /// Lowercase `rrggbb` representation
    pub fn to_hex_string(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Parse a six digit `rrggbb` string
    pub fn from_hex_string(hex: &str) -> Option<Self> {
        if hex.len() != 6 {
            return None;
        }
        Some(Self::new(
            hex_component(hex, 0)?,
            hex_component(hex, 2)?,
            hex_component(hex, 4)?,
        ))
    }
}

/// An RGBA color with 0..=255 components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RGBAColor {
    /// Red component
    pub r: u8,
    /// Green component
    pub g: u8,
    /// Blue component
    pub b: u8,
    /// Alpha component
    pub a: u8,
}

impl RGBAColor {
    /// Create a new color
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// The color without its alpha channel
    pub fn rgb(&self) -> RGBColor {
        RGBColor::new(self.r, self.g, self.b)
    }

    /// Lowercase `rrggbbaa` representation
    pub fn to_hex_string(&self) -> String {
        format!(
            "{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }

    /// Parse `rrggbb` (alpha 255) or `rrggbbaa`
    pub fn from_hex_string(hex: &str) -> Option<Self> {
        let a = match hex.len() {
            6 => 255,
            8 => hex_component(hex, 6)?,
            _ => return None,
        };
        Some(Self::new(
            hex_component(hex, 0)?,
            hex_component(hex, 2)?,
            hex_component(hex, 4)?,
            a,
        ))
    }
}

fn hex_component(hex: &str, start: usize) -> Option<u8> {
    u8::from_str_radix(hex.get(start..start + 2)?, 16).ok()
}

/// `round(component * 255)`, clamped to the byte range
pub fn color_component_from_float(component: f64) -> u8 {
    (component * 255.0).round().clamp(0.0, 255.0) as u8
}

/// `component / 255`
pub fn color_component_to_float(component: u8) -> f64 {
    component as f64 / 255.0
}

/// Convert an sRGB encoded component (0..1) to linear space
pub fn srgb_to_linear(component: f64) -> f64 {
    if component < 0.04045 {
        component * 0.077_399_380_8
    } else {
        (component * 0.947_867_298_6 + 0.052_132_701_4).powf(2.4)
    }
}

/// Convert a linear component (0..1) to sRGB encoding
pub fn linear_to_srgb(component: f64) -> f64 {
    if component < 0.003_130_8 {
        component * 12.92
    } else {
        1.055 * component.powf(0.41666) - 0.055
    }
}
