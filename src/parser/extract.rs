//! Parameter extraction from the text window around a matched phrase
//!
//! Pure functions: each extractor reads numeric and qualitative modifiers from a
//! `Window` and falls back to fixed defaults.

use crate::transform::Parameters;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(-?\d+(?:\.\d+)?)\s*(%|percent\b|degrees?\b|deg\b|°|px\b|pixels?\b)?")
        .expect("Invalid regex pattern")
});
static DIMENSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+)\s*[x×]\s*(\d+)\b").expect("Invalid regex pattern"));
static COUNTER_CLOCKWISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:counter[\s-]?clockwise|anti[\s-]?clockwise|ccw|left)\b")
        .expect("Invalid regex pattern")
});
static PROBABILITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:with\s+)?(?:a\s+)?probability\s*(?:of\s+|=\s*|:\s*)?(\d+(?:\.\d+)?)\s*(%)?")
        .expect("Invalid regex pattern")
});
static PERCENT_CHANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b(?:with\s+)?(?:a\s+)?)?(\d+(?:\.\d+)?)\s*%\s*(?:of\s+the\s+time\b|chance\b|probability\b)")
        .expect("Invalid regex pattern")
});
static HALF_THE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bhalf\s+(?:of\s+)?the\s+time\b").expect("Invalid regex pattern"));
pub(crate) static SEED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bseed\s*(?:=|:|of\b|is\b)?\s*(\d+)").expect("Invalid regex pattern")
});

const LOW_WORDS: &[&str] = &[
    "slight", "slightly", "subtle", "subtly", "light", "lightly", "little", "bit", "mild",
    "mildly", "gentle", "small",
];
const HIGH_WORDS: &[&str] = &[
    "strong", "strongly", "heavy", "heavily", "intense", "very", "extreme", "extremely",
    "lots", "significant", "much",
];

/// Qualitative strength modifier found near a phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Low,
    Default,
    High,
}

impl Intensity {
    fn pick<T>(self, low: T, default: T, high: T) -> T {
        match self {
            Intensity::Low => low,
            Intensity::Default => default,
            Intensity::High => high,
        }
    }
}

/// A number found in a window, with its unit suffix if any
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub percent: bool,
    pub degrees: bool,
}

/// The clause text owned by one match with seed and probability phrases blanked out
#[derive(Debug, Clone)]
pub struct Window {
    text: String,
    probability: Option<f64>,
    /// Set when the stated probability was outside [0, 1]
    requested_probability: Option<f64>,
}

impl Window {
    pub fn new(raw: &str) -> Self {
        let requested = find_probability(raw);
        let probability = requested.map(|p| p.clamp(0.0, 1.0));
        let mut text = raw.to_string();
        for re in [&*SEED, &*PROBABILITY, &*PERCENT_CHANCE, &*HALF_THE_TIME] {
            text = blank_matches(re, &text);
        }
        Self {
            text,
            probability,
            requested_probability: requested.filter(|p| !(0.0..=1.0).contains(p)),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Stated probability, clamped into [0, 1]
    pub fn probability(&self) -> Option<f64> {
        self.probability
    }

    /// The stated probability when it had to be clamped
    pub fn requested_probability(&self) -> Option<f64> {
        self.requested_probability
    }

    pub fn intensity(&self) -> Intensity {
        let words = self.words();
        if words.iter().any(|w| HIGH_WORDS.contains(w)) {
            Intensity::High
        } else if words.iter().any(|w| LOW_WORDS.contains(w)) {
            Intensity::Low
        } else {
            Intensity::Default
        }
    }

    /// First number that is not an angle. Degrees belong to rotations only.
    pub fn first_quantity(&self) -> Option<Quantity> {
        self.quantities().find(|q| !q.degrees)
    }

    /// First unitless or degree-valued number
    pub fn angle(&self) -> Option<f64> {
        self.quantities().find(|q| !q.percent).map(|q| q.value)
    }

    fn quantities(&self) -> impl Iterator<Item = Quantity> + '_ {
        let dimensions = DIMENSIONS.is_match(&self.text);
        NUMBER
            .captures_iter(&self.text)
            .filter(move |_| !dimensions)
            .filter_map(|caps| {
                let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
                let unit = caps.get(2).map(|u| u.as_str());
                Some(Quantity {
                    value,
                    percent: matches!(unit, Some("%" | "percent")),
                    degrees: unit.is_some_and(|u| u.starts_with("deg") || u == "°"),
                })
            })
    }

    pub fn dimensions(&self) -> Option<(u64, u64)> {
        let caps = DIMENSIONS.captures(&self.text)?;
        let width = caps.get(1)?.as_str().parse().ok()?;
        let height = caps.get(2)?.as_str().parse().ok()?;
        Some((width, height))
    }

    pub fn counter_clockwise(&self) -> bool {
        COUNTER_CLOCKWISE.is_match(&self.text)
    }

    fn words(&self) -> Vec<&str> {
        self.text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect()
    }
}

fn blank_matches(re: &Regex, text: &str) -> String {
    re.replace_all(text, |caps: &regex::Captures| " ".repeat(caps[0].len()))
        .into_owned()
}

fn find_probability(text: &str) -> Option<f64> {
    if let Some(caps) = PERCENT_CHANCE.captures(text) {
        return caps[1].parse::<f64>().ok().map(|v| v / 100.0);
    }
    if let Some(caps) = PROBABILITY.captures(text) {
        let value = caps[1].parse::<f64>().ok()?;
        let percent = caps.get(2).is_some();
        return Some(if percent || value > 1.0 {
            value / 100.0
        } else {
            value
        });
    }
    if HALF_THE_TIME.is_match(text) {
        return Some(0.5);
    }
    None
}

/// Interpret a quantity as a fraction: `20%` and bare `20` both mean 0.2
fn as_fraction(q: Quantity) -> f64 {
    if q.percent || q.value.abs() > 1.0 {
        q.value.abs() / 100.0
    } else {
        q.value.abs()
    }
}

pub fn no_params(_window: &Window) -> Parameters {
    Parameters::new()
}

pub fn blur_params(window: &Window) -> Parameters {
    let limit = match window.first_quantity() {
        Some(q) if !q.percent => q.value.abs().round() as i64,
        _ => window.intensity().pick(3, 7, 15),
    };
    Parameters::from([("blur_limit".to_string(), json!(limit))])
}

pub fn rotate_params(window: &Window) -> Parameters {
    let magnitude = window
        .angle()
        .unwrap_or_else(|| window.intensity().pick(10.0, 30.0, 45.0));
    let angle = if window.counter_clockwise() {
        -magnitude.abs()
    } else {
        magnitude
    };
    Parameters::from([("angle".to_string(), json!(angle))])
}

pub fn brightness_params(window: &Window) -> Parameters {
    let limit = window
        .first_quantity()
        .map(as_fraction)
        .unwrap_or_else(|| window.intensity().pick(0.1, 0.2, 0.4));
    Parameters::from([("brightness_limit".to_string(), json!(limit))])
}

pub fn contrast_params(window: &Window) -> Parameters {
    let limit = window
        .first_quantity()
        .map(as_fraction)
        .unwrap_or_else(|| window.intensity().pick(0.1, 0.2, 0.4));
    Parameters::from([("contrast_limit".to_string(), json!(limit))])
}

pub fn hsv_params(window: &Window) -> Parameters {
    let scale = window.intensity().pick(0.5, 1.0, 2.0);
    let shift = |base: f64| json!((base * scale).round() as i64);
    Parameters::from([
        ("hue_shift_limit".to_string(), shift(20.0)),
        ("sat_shift_limit".to_string(), shift(30.0)),
        ("val_shift_limit".to_string(), shift(20.0)),
    ])
}

pub fn noise_params(window: &Window) -> Parameters {
    let (low, high) = match window.first_quantity() {
        Some(q) if !q.percent => (q.value.abs() / 2.0, q.value.abs()),
        _ => window.intensity().pick((5.0, 15.0), (10.0, 50.0), (50.0, 100.0)),
    };
    Parameters::from([("var_limit".to_string(), json!([low, high]))])
}

pub fn crop_params(window: &Window) -> Parameters {
    let (width, height) = window.dimensions().unwrap_or_else(|| {
        let side = window
            .first_quantity()
            .filter(|q| !q.percent && q.value >= 1.0)
            .map(|q| q.value.round() as u64)
            .unwrap_or(224);
        (side, side)
    });
    Parameters::from([
        ("height".to_string(), json!(height)),
        ("width".to_string(), json!(width)),
    ])
}

pub fn clahe_params(window: &Window) -> Parameters {
    let clip = match window.first_quantity() {
        Some(q) if !q.percent => q.value.abs(),
        _ => window.intensity().pick(2.0, 4.0, 8.0),
    };
    Parameters::from([("clip_limit".to_string(), json!(clip))])
}
