//! Presentation hints carried alongside cell values.

use serde::{Deserialize, Serialize};

/// Accent colour used when a fill refers to a theme colour.
pub const DEFAULT_ACCENT_RGB: &str = "3B4E87";

/// Fill information for a cell, when the reader provides it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleHints {
    /// Pattern type (`solid`, `gray125`, ...).
    pub fill_type: Option<String>,
    /// Foreground colour as `RRGGBB` or `AARRGGBB`.
    pub foreground_color: Option<String>,
    /// The foreground colour refers to a theme slot.
    pub is_theme_color: bool,
    /// Tint in -1.0..=1.0.
    pub tint: f64,
}

impl StyleHints {
    /// Solid fill with an RGB colour.
    pub fn solid(rgb: impl Into<String>) -> Self {
        Self {
            fill_type: Some("solid".to_string()),
            foreground_color: Some(rgb.into()),
            is_theme_color: false,
            tint: 0.0,
        }
    }

    /// Solid fill with a tinted theme colour.
    pub fn theme(tint: f64) -> Self {
        Self {
            fill_type: Some("solid".to_string()),
            foreground_color: None,
            is_theme_color: true,
            tint,
        }
    }

    /// Resolve the background colour as `(r, g, b)`. Returns `None` when
    /// there is no visible fill or the fill is white.
    pub fn effective_color(&self) -> Option<(u8, u8, u8)> {
        let filled = matches!(
            self.fill_type.as_deref(),
            Some("solid" | "gray125" | "darkGrid" | "lightGrid")
        );
        if !filled {
            return None;
        }

        let color = if self.is_theme_color {
            apply_tint(DEFAULT_ACCENT_RGB, self.tint)?
        } else {
            let rgb = self.foreground_color.as_deref()?;
            parse_rgb(rgb)?
        };

        (color != (255, 255, 255)).then_some(color)
    }
}

/// Apply an Excel tint to an `RRGGBB` colour. Positive tints lighten
/// towards white, negative tints darken towards black.
pub fn apply_tint(hex_rgb: &str, tint: f64) -> Option<(u8, u8, u8)> {
    let (r, g, b) = parse_rgb(hex_rgb)?;
    let adjust = |c: u8| -> u8 {
        let c = f64::from(c);
        let shifted = if tint < 0.0 {
            c * (1.0 + tint)
        } else {
            c * (1.0 - tint) + 255.0 * tint
        };
        shifted.round().clamp(0.0, 255.0) as u8
    };
    Some((adjust(r), adjust(g), adjust(b)))
}

fn parse_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    // ARGB as written by Excel
    let hex = if hex.len() == 8 { &hex[2..] } else { hex };
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
