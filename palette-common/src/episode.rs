use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use regex::Regex;

#[derive(thiserror::Error, Debug)]
pub enum EpisodeError {
    #[error("not a season label: {0:?}")]
    BadSeason(String),
    #[error("not an episode label: {0:?}")]
    BadEpisode(String),
    #[error("invalid series name: {0}")]
    BadSeries(#[from] regex::Error),
}

/// Season and episode of a series. Orders by season first.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct EpisodeId {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeId {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }

    pub fn season_label(&self) -> String {
        format!("s{:02}", self.season)
    }

    pub fn episode_label(&self) -> String {
        format!("e{:02}", self.episode)
    }

    /// `<root>/sNN/eNN`
    pub fn dir_in(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref()
            .join(self.season_label())
            .join(self.episode_label())
    }

    /// Parses labels like `s03` and `e05`. Anything before the last `s` (or `e`) is
    /// ignored, so labels like `supernatural.s03` work too.
    pub fn from_labels(season: &str, episode: &str) -> Result<Self, EpisodeError> {
        let season_num = trailing_number(season, 's')
            .ok_or_else(|| EpisodeError::BadSeason(season.to_string()))?;
        let episode_num = trailing_number(episode, 'e')
            .ok_or_else(|| EpisodeError::BadEpisode(episode.to_string()))?;
        Ok(Self::new(season_num, episode_num))
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.season_label(), self.episode_label())
    }
}

/// Parses the [Display](fmt::Display) form, like `s03e05`.
impl FromStr for EpisodeId {
    type Err = EpisodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .to_ascii_lowercase()
            .rfind('e')
            .ok_or_else(|| EpisodeError::BadEpisode(s.to_string()))?;
        let (season, episode) = s.split_at(split);
        Self::from_labels(season, episode)
    }
}

fn trailing_number(label: &str, marker: char) -> Option<u32> {
    let label = label.trim().to_ascii_lowercase();
    let (_, digits) = label.rsplit_once(marker)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Finds the episode in video file names like `Supernatural.S03E05.720p.mkv`.
#[derive(Debug, Clone)]
pub struct EpisodeMatcher {
    regex: Regex,
}

impl EpisodeMatcher {
    /// The separator between the series name and the season can be any character.
    pub fn new(series: &str) -> Result<Self, EpisodeError> {
        let pattern = format!(r"(?i){}.S(\d{{1,2}})E(\d{{1,2}})", regex::escape(series));
        Ok(Self {
            regex: Regex::new(&pattern)?,
        })
    }

    pub fn parse(&self, file_name: &str) -> Option<EpisodeId> {
        let caps = self.regex.captures(file_name)?;
        let season = caps.get(1)?.as_str().parse().ok()?;
        let episode = caps.get(2)?.as_str().parse().ok()?;
        Some(EpisodeId::new(season, episode))
    }

    pub fn parse_path(&self, path: impl AsRef<Path>) -> Option<EpisodeId> {
        path.as_ref()
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.parse(name))
    }
}
