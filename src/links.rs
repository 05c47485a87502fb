//! Derived display values: timestamps and deep links.
//!
//! Everything here is a stateless function of a card plus the static
//! configuration (frame rate, per-episode offsets, URL templates).

use crate::catalog::Card;
use crate::constants::Constants;

/// Minutes/seconds breakdown of a frame position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeParts {
  pub minutes: u64,
  pub seconds: u64,
  pub total_seconds: u64,
}

pub fn time_from_frames(frame: u32, frame_rate: f64) -> TimeParts {
  let total = frame as f64 / frame_rate;
  TimeParts {
    minutes: (total / 60.0).floor() as u64,
    seconds: (total % 60.0).floor() as u64,
    total_seconds: total.round() as u64,
  }
}

pub fn format_timestamp(t: TimeParts) -> String {
  format!("{}:{:02}", t.minutes, t.seconds)
}

/// `m:ss` label for a card's representative frame.
pub fn timestamp_label(card: &Card, cfg: &Constants) -> String {
  format_timestamp(time_from_frames(card.frame_prefer, cfg.frame_rate))
}

/// Seconds into the source video, corrected by the episode's frame offset
/// where one is configured.
pub fn video_timestamp(card: &Card, cfg: &Constants) -> u64 {
  let offset = cfg
    .season(card.season)
    .and_then(|s| s.frame_offsets.get(&card.episode))
    .copied()
    .unwrap_or(0);
  time_from_frames(card.frame_prefer.saturating_add(offset), cfg.frame_rate).total_seconds
}

/// Still-frame image for the card's representative frame.
pub fn image_url(card: &Card, cfg: &Constants) -> String {
  format!("{}{}/{}/{}.webp", cfg.image_base_url, card.season, card.episode, card.frame_prefer)
}

/// Watch-page deep link, timestamped at the card. `None` for a season the
/// configuration doesn't know.
pub fn video_url(card: &Card, cfg: &Constants) -> Option<String> {
  let season = cfg.season(card.season)?;
  let base = season.video_url_template.replace("{episode}", &card.episode.to_string());
  let sep = if base.contains('?') { '&' } else { '?' };
  Some(format!("{base}{sep}t={}s", video_timestamp(card, cfg)))
}

/// Human-readable source label, e.g. `MyGO 第3話`.
pub fn episode_label(card: &Card, cfg: &Constants) -> String {
  match cfg.season(card.season) {
    Some(season) => format!("{} 第{}話", season.name, card.episode),
    None => format!("S{} 第{}話", card.season, card.episode),
  }
}
