use crate::config::ScaleMode;
use crate::error::PipelineError;
use anyhow::{Result, anyhow};

/// Light yellow to red, one color per stop.
pub const PALETTE: [&str; 49] = [
    "#FFFFCC", "#FFFFB2", "#FFFF99", "#FFFF7F", "#FFFF66", "#FFFF4C", "#FFFF33", "#FFFF1A",
    "#FFFF00", "#FFEC00", "#FFE600", "#FFE000", "#FFDA00", "#FFD400", "#FFCE00", "#FFC800",
    "#FFC200", "#FFBC00", "#FFB600", "#FFB000", "#FFAA00", "#FFA400", "#FF9E00", "#FF9800",
    "#FF9200", "#FF8C00", "#FF8600", "#FF8000", "#FF7A00", "#FF7400", "#FF6E00", "#FF6800",
    "#FF6200", "#FF5C00", "#FF5600", "#FF5000", "#FF4A00", "#FF4400", "#FF3E00", "#FF3800",
    "#FF3200", "#FF2C00", "#FF2600", "#FF2000", "#FF1A00", "#FF1400", "#FF0E00", "#FF0800",
    "#FF0000",
];

/// Percentiles 0, 2, ..., 100.
pub const PERCENTILE_STEPS: usize = 51;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

pub fn parse_hex(hex: &str) -> Result<Rgb> {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(anyhow!("Invalid hex color: {}", hex));
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16)
        .map_err(|_| anyhow!("Invalid hex color: {}", hex));
    Ok(Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Value at percentile `p` (0..=100) of sorted data, interpolating linearly
/// between the closest ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = p.clamp(0.0, 100.0) / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

pub fn percentiles(values: &[u64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    sorted.sort_by(f64::total_cmp);
    (0..PERCENTILE_STEPS)
        .map(|i| percentile(&sorted, (i * 2) as f64))
        .collect()
}

/// Piecewise-linear value -> color mapping over [`PALETTE`].
#[derive(Debug, Clone)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
    pub percentiles: Vec<f64>,
    stops: Vec<f64>,
    colors: Vec<Rgb>,
}

impl ColorScale {
    pub fn new(values: &[u64], mode: ScaleMode) -> Result<Self> {
        if values.is_empty() {
            return Err(PipelineError::EmptyTable.into());
        }
        let colors = PALETTE.iter().map(|h| parse_hex(h)).collect::<Result<Vec<_>>>()?;
        let percentiles = percentiles(values);
        let min = percentiles[0];
        let max = percentiles[PERCENTILE_STEPS - 1];
        let last = (colors.len() - 1) as f64;

        let stops = (0..colors.len())
            .map(|i| {
                let fraction = i as f64 / last;
                match mode {
                    ScaleMode::Linear => min + (max - min) * fraction,
                    ScaleMode::Percentile => {
                        let x = fraction * (PERCENTILE_STEPS - 1) as f64;
                        let j = (x.floor() as usize).min(PERCENTILE_STEPS - 2);
                        let t = x - j as f64;
                        percentiles[j] + (percentiles[j + 1] - percentiles[j]) * t
                    }
                }
            })
            .collect();

        Ok(Self { min, max, percentiles, stops, colors })
    }

    pub fn stops(&self) -> &[f64] {
        &self.stops
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Fractional palette index of `value`, in `0..=48`.
    pub fn position(&self, value: f64) -> f64 {
        let last = self.stops.len() - 1;
        if value.is_nan() || value <= self.stops[0] {
            return 0.0;
        }
        if value >= self.stops[last] {
            return last as f64;
        }
        // Largest k with stops[k] <= value; stops[k + 1] > value here.
        let k = self.stops.partition_point(|&s| s <= value) - 1;
        let width = self.stops[k + 1] - self.stops[k];
        k as f64 + (value - self.stops[k]) / width
    }

    pub fn color(&self, value: f64) -> Rgb {
        let p = self.position(value);
        let i = (p.floor() as usize).min(self.colors.len() - 2);
        self.colors[i].lerp(self.colors[i + 1], p - i as f64)
    }

    pub fn hex(&self, value: f64) -> String {
        self.color(value).to_hex()
    }
}
