//! Color-string grammar and renderer color expressions.
//!
//! Accepted inputs: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
//! `rgba(r, g, b, a)`, a few CSS names, and the renderer form
//! `color("<css>", alpha)`. Anything else falls back to [`DEFAULT_COLOR`].

use std::sync::LazyLock;

use mapstyle_model::{expression_leaf, leaf_table};
use regex::Regex;
use serde_json::Value;

/// Fallback for unparseable colors: opaque white.
pub const DEFAULT_COLOR: Rgba = Rgba {
    r: 255,
    g: 255,
    b: 255,
    a: 1.0,
};

static RGB_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*(\d*\.?\d+)\s*)?\)$")
        .expect("Invalid rgb() regex")
});

static COLOR_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"color\(\s*["']([^"']*)["']\s*(?:,\s*(\d*\.?\d+)\s*)?\)"#)
        .expect("Invalid color() regex")
});

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("white", [255, 255, 255]),
    ("black", [0, 0, 0]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("cyan", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Alpha in `0.0..=1.0`.
    pub a: f64,
}

impl Rgba {
    #[must_use]
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse a color string, returning `None` when malformed.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let text = input.trim();
        if let Some(hex) = text.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(caps) = RGB_FUNCTION.captures(text) {
            let channel = |i: usize| caps.get(i)?.as_str().parse::<u8>().ok();
            let alpha = match caps.get(4) {
                Some(a) => a.as_str().parse::<f64>().ok()?.clamp(0.0, 1.0),
                None => 1.0,
            };
            return Some(Self {
                r: channel(1)?,
                g: channel(2)?,
                b: channel(3)?,
                a: alpha,
            });
        }
        if let Some(caps) = COLOR_CALL.captures(text) {
            if caps.get(0).map(|m| m.as_str().len()) != Some(text.len()) {
                return None;
            }
            let base = Self::parse(caps.get(1)?.as_str())?;
            return Some(match caps.get(2) {
                Some(a) => base.with_alpha(a.as_str().parse::<f64>().ok()?),
                None => base,
            });
        }
        let lower = text.to_ascii_lowercase();
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, [r, g, b])| Self::rgb(*r, *g, *b))
    }

    /// Parse a color string, falling back to [`DEFAULT_COLOR`].
    #[must_use]
    pub fn parse_or_default(input: &str) -> Self {
        Self::parse(input).unwrap_or_else(|| {
            tracing::debug!(color = %input, "Unparseable color, using default");
            DEFAULT_COLOR
        })
    }

    #[must_use]
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            a: alpha.clamp(0.0, 1.0),
            ..self
        }
    }

    /// `#rrggbb`, lowercase, alpha dropped.
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Renderer form `color("#rrggbb", alpha)`.
    #[must_use]
    pub fn to_expression(&self) -> String {
        format!("color(\"{}\", {})", self.to_hex(), self.a)
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?).with_alpha(f64::from(nibble(3)?) / 255.0)),
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?).with_alpha(f64::from(byte(6)?) / 255.0)),
        _ => None,
    }
}

/// Alpha for an opacity percentage.
#[must_use]
pub fn transparency_alpha(transparency: u8) -> f64 {
    f64::from(transparency.min(100)) / 100.0
}

/// Rewrite the alpha of every `color(...)` call in `expr`.
///
/// A bare color string is converted to the renderer form. Unparseable input
/// becomes the default color at the requested alpha.
#[must_use]
pub fn rewrite_alpha(expr: &str, alpha: f64) -> String {
    if COLOR_CALL.is_match(expr) {
        return COLOR_CALL
            .replace_all(expr, |caps: &regex::Captures<'_>| {
                let base = caps
                    .get(1)
                    .and_then(|m| Rgba::parse(m.as_str()))
                    .unwrap_or(DEFAULT_COLOR);
                base.with_alpha(alpha).to_expression()
            })
            .into_owned();
    }
    Rgba::parse_or_default(expr).with_alpha(alpha).to_expression()
}

/// Apply an opacity percentage to a color leaf.
///
/// Literal strings are rewritten directly; expression leaves have every
/// result rewritten with row order preserved. Missing or `null` colors start
/// from the default color.
#[must_use]
pub fn apply_transparency(value: &Value, transparency: u8) -> Value {
    let alpha = transparency_alpha(transparency);
    match value {
        Value::String(expr) => Value::String(rewrite_alpha(expr, alpha)),
        Value::Null => Value::String(DEFAULT_COLOR.with_alpha(alpha).to_expression()),
        Value::Object(_) => match leaf_table(value) {
            Some(table) => expression_leaf(&table.map_results(|result| rewrite_alpha(result, alpha))),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}
