use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Ordered color stops with optional fixed value limits. Identical scales
/// (stops and limits) are what lets composite figures share one legend.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    stops: Vec<Rgb>,
    limits: Option<(f32, f32)>,
}

impl ColorScale {
    pub fn new(stops: Vec<Rgb>, limits: Option<(f32, f32)>) -> Result<Self, String> {
        if stops.len() < 2 {
            return Err("A color scale needs at least two color stops".to_string());
        }

        if let Some((lo, hi)) = limits
            && lo >= hi
        {
            return Err("Color scale limits must be ordered low, high".to_string());
        }

        Ok(Self { stops, limits })
    }

    pub fn stops(&self) -> &[Rgb] {
        &self.stops
    }

    pub fn limits(&self) -> Option<(f32, f32)> {
        self.limits
    }

    /// Fixed limits when configured, otherwise the fallback computed from
    /// the data being drawn.
    pub fn resolve_limits(&self, fallback: Option<(f32, f32)>) -> (f32, f32) {
        self.limits.or(fallback).unwrap_or((0.0, 1.0))
    }

    /// Linear interpolation across the stops; values are clamped to the
    /// limits so out-of-range cells take the end colors.
    pub fn color_for(&self, value: f32, limits: (f32, f32)) -> Rgb {
        let (lo, hi) = limits;

        let t = if hi > lo {
            ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
        } else {
            0.5
        };

        let segments = (self.stops.len() - 1) as f32;
        let position = t * segments;
        let index = (position.floor() as usize).min(self.stops.len() - 2);
        let frac = position - index as f32;

        let a = self.stops[index];
        let b = self.stops[index + 1];

        Rgb {
            r: lerp(a.r, b.r, frac),
            g: lerp(a.g, b.g, frac),
            b: lerp(a.b, b.b, frac),
        }
    }
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

pub fn parse_hex(color: &str) -> Result<Rgb, String> {
    let hex = color
        .strip_prefix('#')
        .ok_or_else(|| format!("Color '{}' must start with '#'", color))?;

    if hex.len() != 6 {
        return Err(format!("Color '{}' must be #rrggbb", color));
    }

    let channel = |range| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| format!("Color '{}' must be #rrggbb", color))
    };

    Ok(Rgb {
        r: channel(0..2)?,
        g: channel(2..4)?,
        b: channel(4..6)?,
    })
}

impl<'de> Deserialize<'de> for ColorScale {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ColorScaleHelper {
            colors: Vec<String>,
            limits: Option<(f32, f32)>,
        }

        let helper = ColorScaleHelper::deserialize(deserializer)?;

        let stops = helper
            .colors
            .iter()
            .map(|c| parse_hex(c).map_err(D::Error::custom))
            .collect::<Result<Vec<_>, _>>()?;

        ColorScale::new(stops, helper.limits).map_err(D::Error::custom)
    }
}
