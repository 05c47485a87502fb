//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so it's always available —
//! no runtime file I/O. Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// One season of the source material. Everything the filter, URL codec and
/// link builders need to know about a season lives here — adding a season
/// is a data change, not a code change.
#[derive(Debug, Deserialize)]
pub struct SeasonSpec {
  pub id: u32,
  pub name: String,
  pub episode_count: u32,
  /// Per-episode frame corrections (broadcast vs. source cut differences),
  /// keyed by episode number. Episodes without an entry need none.
  pub frame_offsets: HashMap<u32, u32>,
  /// Watch-page template; `{episode}` is replaced with the episode number.
  pub video_url_template: String,
}

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  pub catalog_url: String,
  pub image_base_url: String,
  pub share_base_url: String,

  // Timestamp math
  pub frame_rate: f64,

  // Query pipeline
  pub cache_capacity: usize,
  pub search_debounce_ms: u64,

  pub seasons: Vec<SeasonSpec>,
}

impl Constants {
  pub fn season(&self, id: u32) -> Option<&SeasonSpec> {
    self.seasons.iter().find(|s| s.id == id)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}
