//! Shareable query-string state: the `ep` episode bitmask and the `q` text
//! query.
//!
//! The bitmask packs every season's episodes into one integer: a season's
//! bit offset is the sum of the episode counts of the seasons configured
//! before it, and episode `i` occupies bit `offset + i - 1`. Parameters are
//! only present when non-default, and a rewrite that changes nothing is
//! reported as such so the caller never records a redundant history entry.

use std::collections::BTreeSet;

use crate::constants::SeasonSpec;
use crate::filter::FilterState;

// --- Episode bitmask ---

pub fn encode_episode_mask(filter: &FilterState, seasons: &[SeasonSpec]) -> u64 {
  let mut mask = 0u64;
  let mut offset = 0u32;
  for spec in seasons {
    if let Some(set) = filter.episodes(spec.id) {
      for &episode in set {
        if (1..=spec.episode_count).contains(&episode) {
          mask |= 1 << (offset + episode - 1);
        }
      }
    }
    offset += spec.episode_count;
  }
  mask
}

pub fn decode_episode_mask(mask: u64, seasons: &[SeasonSpec]) -> FilterState {
  let mut filter = FilterState::for_seasons(seasons);
  let mut offset = 0u32;
  for spec in seasons {
    let mut set = BTreeSet::new();
    for episode in 1..=spec.episode_count {
      if mask & (1 << (offset + episode - 1)) != 0 {
        set.insert(episode);
      }
    }
    filter.set_episodes(spec.id, set);
    offset += spec.episode_count;
  }
  filter
}

// --- Query string ---

/// Read `ep` and `q` out of a raw query string (no leading `?`). Absent or
/// unparsable parameters read as absent.
pub fn read_query(query: &str) -> (Option<u64>, Option<String>) {
  let mut ep = None;
  let mut q = None;
  for pair in query.split('&').filter(|p| !p.is_empty()) {
    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
    match key {
      "ep" => ep = value.parse().ok(),
      "q" => q = urlencoding::decode(value).ok().map(|s| s.into_owned()),
      _ => {}
    }
  }
  (ep, q)
}

/// Rewrite `current` with `ep`/`q` derived from the given state. Unrelated
/// parameters keep their positions; `ep`/`q` are updated in place, dropped
/// when default, or appended when newly needed. Returns `None` when the
/// result is byte-identical to `current` — nothing to write, no history
/// entry.
pub fn apply_state(
  current: &str,
  filter: &FilterState,
  search_raw: &str,
  seasons: &[SeasonSpec],
) -> Option<String> {
  let mask = encode_episode_mask(filter, seasons);
  let ep_value = (mask != 0).then(|| mask.to_string());
  let q_value = (!search_raw.is_empty()).then(|| urlencoding::encode(search_raw).into_owned());

  let mut pairs: Vec<String> = Vec::new();
  let (mut wrote_ep, mut wrote_q) = (false, false);
  for pair in current.split('&').filter(|p| !p.is_empty()) {
    let key = pair.split_once('=').map_or(pair, |(k, _)| k);
    match key {
      "ep" if !wrote_ep => {
        wrote_ep = true;
        if let Some(ref v) = ep_value {
          pairs.push(format!("ep={v}"));
        }
      }
      "q" if !wrote_q => {
        wrote_q = true;
        if let Some(ref v) = q_value {
          pairs.push(format!("q={v}"));
        }
      }
      // Duplicate ep/q occurrences are dropped; anything else passes through.
      "ep" | "q" => {}
      _ => pairs.push(pair.to_string()),
    }
  }
  if !wrote_ep && let Some(v) = ep_value {
    pairs.push(format!("ep={v}"));
  }
  if !wrote_q && let Some(v) = q_value {
    pairs.push(format!("q={v}"));
  }

  let next = pairs.join("&");
  if next == current { None } else { Some(next) }
}

// --- History sink ---

/// In-process stand-in for the browser's URL bar and history stack: read
/// the current query string, push a replacement. The TUI derives its
/// shareable link from `current`.
#[derive(Debug, Default)]
pub struct History {
  entries: Vec<String>,
}

impl History {
  /// A history whose current entry is the app's initial state (e.g. from
  /// CLI flags), so the first commit only writes if it changes something.
  pub fn seeded(initial: String) -> Self {
    Self { entries: vec![initial] }
  }

  pub fn current(&self) -> &str {
    self.entries.last().map_or("", String::as_str)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Write committed state. Pushes a new entry only when the encoded query
  /// string actually changes; returns whether it did.
  pub fn sync(&mut self, filter: &FilterState, search_raw: &str, seasons: &[SeasonSpec]) -> bool {
    match apply_state(self.current(), filter, search_raw, seasons) {
      Some(next) => {
        self.entries.push(next);
        true
      }
      None => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::constants::constants;

  fn seasons() -> &'static [SeasonSpec] {
    &constants().seasons
  }

  // --- bitmask ---

  #[test]
  fn mask_round_trip() {
    let mut filter = FilterState::for_seasons(seasons());
    filter.set_episodes(1, BTreeSet::from([1, 3]));
    filter.set_episodes(2, BTreeSet::from([2]));
    let mask = encode_episode_mask(&filter, seasons());
    // Season 1 ep 1 → bit 0, ep 3 → bit 2; season 2 ep 2 → bit 14.
    assert_eq!(mask, 0b0100_0000_0000_0101);
    assert_eq!(decode_episode_mask(mask, seasons()), filter);
  }

  #[test]
  fn empty_filter_is_mask_zero() {
    let filter = FilterState::for_seasons(seasons());
    assert_eq!(encode_episode_mask(&filter, seasons()), 0);
    assert!(decode_episode_mask(0, seasons()).is_unrestricted());
  }

  #[test]
  fn out_of_range_episodes_never_reach_the_mask() {
    let mut filter = FilterState::for_seasons(seasons());
    filter.set_episodes(1, BTreeSet::from([99]));
    assert_eq!(encode_episode_mask(&filter, seasons()), 0);
  }

  #[test]
  fn second_season_bits_start_after_first_season_episodes() {
    let mut filter = FilterState::for_seasons(seasons());
    filter.set_episodes(2, BTreeSet::from([1]));
    // Season 1 has 13 episodes, so season 2 ep 1 lands on bit 13.
    assert_eq!(encode_episode_mask(&filter, seasons()), 1 << 13);
  }

  // --- query string ---

  #[test]
  fn read_query_parses_both_params() {
    let (ep, q) = read_query("ep=21&q=%E6%98%A5%E6%97%A5%E5%BD%B1");
    assert_eq!(ep, Some(21));
    assert_eq!(q.as_deref(), Some("春日影"));
  }

  #[test]
  fn read_query_absent_params() {
    assert_eq!(read_query(""), (None, None));
    assert_eq!(read_query("theme=dark"), (None, None));
  }

  #[test]
  fn apply_state_writes_only_non_defaults() {
    let mut filter = FilterState::for_seasons(seasons());
    let next = apply_state("", &filter, "春日影", seasons()).unwrap();
    assert_eq!(next, "q=%E6%98%A5%E6%97%A5%E5%BD%B1");

    filter.set_episodes(1, BTreeSet::from([1]));
    let next = apply_state(&next, &filter, "春日影", seasons()).unwrap();
    assert_eq!(next, "q=%E6%98%A5%E6%97%A5%E5%BD%B1&ep=1");
  }

  #[test]
  fn apply_state_removes_params_on_revert_to_default() {
    let empty = FilterState::for_seasons(seasons());
    let next = apply_state("ep=21&q=abc", &empty, "", seasons()).unwrap();
    assert_eq!(next, "");
  }

  #[test]
  fn apply_state_preserves_unrelated_params() {
    let mut filter = FilterState::for_seasons(seasons());
    filter.set_episodes(1, BTreeSet::from([2]));
    let next = apply_state("theme=dark&ep=1", &filter, "", seasons()).unwrap();
    assert_eq!(next, "theme=dark&ep=2");
  }

  #[test]
  fn apply_state_unchanged_is_none() {
    let mut filter = FilterState::for_seasons(seasons());
    filter.set_episodes(1, BTreeSet::from([1, 3]));
    assert_eq!(apply_state("ep=5", &filter, "", seasons()), None);
  }

  // --- history ---

  #[test]
  fn committing_unchanged_state_writes_no_history_entry() {
    let mut filter = FilterState::for_seasons(seasons());
    filter.set_episodes(1, BTreeSet::from([1, 3]));

    let mut history = History::default();
    assert!(history.sync(&filter, "soyo", seasons()));
    let len_after_first = history.len();

    // Same state again: no new entry.
    assert!(!history.sync(&filter, "soyo", seasons()));
    assert_eq!(history.len(), len_after_first);

    // An actual change writes again.
    filter.toggle(1, 4);
    assert!(history.sync(&filter, "soyo", seasons()));
    assert_eq!(history.len(), len_after_first + 1);
  }

  #[test]
  fn seeded_history_skips_the_initial_state() {
    let seasons = seasons();
    let mut filter = FilterState::for_seasons(seasons);
    filter.set_episodes(1, BTreeSet::from([1]));
    let initial = apply_state("", &filter, "", seasons).unwrap();

    let mut history = History::seeded(initial);
    assert!(!history.sync(&filter, "", seasons));
    assert_eq!(history.len(), 1);
  }
}
