use std::collections::BTreeMap;

use palette_common::{
    episode::EpisodeId,
    model::{FrameColorRecord, Rgb},
    utils::math::Variance,
};

/// Float error allowed below an integer before truncation takes it down by one.
const TRUNCATION_SLACK: f64 = 1e-9;

/// The proportion weighted mean of the clusters of a frame, truncated. None if there is
/// nothing to weigh. Every channel stays between the smallest and largest value of that
/// channel among the clusters.
pub fn weighted_average(record: &FrameColorRecord) -> Option<Rgb> {
    let total = record.proportion_sum();
    if record.clusters.is_empty() || total <= 0.0 || !total.is_finite() {
        return None;
    }

    let mut sums = [0.0_f64; 3];
    let mut lows = [u8::MAX; 3];
    let mut highs = [u8::MIN; 3];
    for cluster in &record.clusters {
        for (i, c) in cluster.rgb.0.into_iter().enumerate() {
            sums[i] += f64::from(c) * cluster.proportion;
            lows[i] = lows[i].min(c);
            highs[i] = highs[i].max(c);
        }
    }

    let channel = |i: usize| {
        let mean = (sums[i] / total + TRUNCATION_SLACK).floor();
        mean.clamp(f64::from(lows[i]), f64::from(highs[i])) as u8
    };
    Some(Rgb::new(channel(0), channel(1), channel(2)))
}

/// Perceived brightness in [0, 1].
pub fn luminosity(rgb: Rgb) -> f64 {
    let [r, g, b] = rgb.0.map(f64::from);
    (0.299 * r + 0.587 * g + 0.114 * b) / 255.0
}

pub fn frame_luminosity(record: &FrameColorRecord) -> Option<f64> {
    weighted_average(record).map(luminosity)
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    pub episode: EpisodeId,
    /// Frames with a luminosity
    pub frames: usize,
    /// Frames without any colors, left out of the statistics
    pub undefined_frames: usize,
    /// None if no frame had a luminosity
    pub mean_luminosity: Option<f64>,
    pub luminosity_std_dev: f64,
}

/// Luminosity statistics per episode, ordered by season and then episode.
pub fn summarize<'a>(
    records: impl IntoIterator<Item = &'a FrameColorRecord>,
) -> Vec<EpisodeSummary> {
    let mut groups: BTreeMap<EpisodeId, (Variance, usize)> = BTreeMap::new();
    for record in records {
        let (stats, undefined) = groups.entry(record.episode).or_default();
        match frame_luminosity(record) {
            Some(lum) => stats.add(lum),
            None => *undefined += 1,
        }
    }

    groups
        .into_iter()
        .map(|(episode, (stats, undefined_frames))| EpisodeSummary {
            episode,
            frames: stats.count(),
            undefined_frames,
            mean_luminosity: stats.average(),
            luminosity_std_dev: stats.std_dev(),
        })
        .collect()
}
