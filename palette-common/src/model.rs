use std::{fmt, str::FromStr};

use crate::episode::EpisodeId;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct Rgb(pub [u8; 3]);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("not a color triple: {0:?}")]
pub struct RgbParseError(pub String);

impl Rgb {
    pub fn new(red: u8, green: u8, blue: u8) -> Self {
        Self([red, green, blue])
    }
}

/// Written as `[r, g, b]`, which is also how the legacy tables store it.
impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "[{r}, {g}, {b}]")
    }
}

/// Accepts `[r, g, b]`, `(r, g, b)` and whitespace separated components.
impl FromStr for Rgb {
    type Err = RgbParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || RgbParseError(s.to_string());
        let inner = s.trim();
        let inner = inner
            .strip_prefix('[')
            .and_then(|i| i.strip_suffix(']'))
            .or_else(|| inner.strip_prefix('(').and_then(|i| i.strip_suffix(')')))
            .ok_or_else(err)?;

        let mut parts = inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<u8>().map_err(|_| err()));

        let mut next = || parts.next().unwrap_or_else(|| Err(err()));
        let rgb = [next()?, next()?, next()?];
        if parts.next().is_some() {
            return Err(err());
        }
        Ok(Self(rgb))
    }
}

/// One dominant color of a frame and the share of the frame's pixels that belong to it.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ColorCluster {
    pub rgb: Rgb,
    pub proportion: f64,
}

/// The dominant colors of one frame, most common first. At most as many clusters as the
/// extractor was asked for, possibly fewer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameColorRecord {
    pub episode: EpisodeId,
    pub frame_name: String,
    pub clusters: Vec<ColorCluster>,
}

impl FrameColorRecord {
    pub fn proportion_sum(&self) -> f64 {
        self.clusters.iter().map(|c| c.proportion).sum()
    }
}
