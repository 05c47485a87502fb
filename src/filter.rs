//! Season/episode filtering.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::catalog::Card;
use crate::constants::SeasonSpec;

/// The committed season/episode selection.
///
/// One selected-episode set per configured season; an empty set means "no
/// restriction from this season". Restriction semantics are exclusive: as
/// soon as any season has a selection, only cards whose own season's set
/// contains their episode match — cards from unselected seasons are out,
/// even when that season's set is empty. With every set empty, everything
/// matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
  episodes: BTreeMap<u32, BTreeSet<u32>>,
  /// Reserved for a future per-character predicate. Always 0 today; ignored
  /// by [`matches`](Self::matches) and absent from the fingerprint.
  pub character_id: u32,
}

impl FilterState {
  /// An unrestricted filter covering every configured season, so that
  /// fingerprints always mention each season whether or not it has a
  /// selection.
  pub fn for_seasons(seasons: &[SeasonSpec]) -> Self {
    let episodes = seasons.iter().map(|s| (s.id, BTreeSet::new())).collect();
    Self { episodes, character_id: 0 }
  }

  pub fn episodes(&self, season: u32) -> Option<&BTreeSet<u32>> {
    self.episodes.get(&season)
  }

  pub fn set_episodes(&mut self, season: u32, episodes: BTreeSet<u32>) {
    self.episodes.insert(season, episodes);
  }

  /// Flip one episode's selection. Returns whether it is now selected.
  pub fn toggle(&mut self, season: u32, episode: u32) -> bool {
    let set = self.episodes.entry(season).or_default();
    if set.remove(&episode) { false } else { set.insert(episode) }
  }

  pub fn is_selected(&self, season: u32, episode: u32) -> bool {
    self.episodes.get(&season).is_some_and(|set| set.contains(&episode))
  }

  pub fn clear(&mut self) {
    for set in self.episodes.values_mut() {
      set.clear();
    }
  }

  /// No season has any selection: everything matches.
  pub fn is_unrestricted(&self) -> bool {
    self.episodes.values().all(BTreeSet::is_empty)
  }

  pub fn selected_count(&self) -> usize {
    self.episodes.values().map(BTreeSet::len).sum()
  }

  /// The filter predicate. Pure — caching is layered on top, not in here.
  pub fn matches(&self, card: &Card) -> bool {
    if self.is_unrestricted() {
      return true;
    }
    self.episodes.get(&card.season).is_some_and(|set| !set.is_empty() && set.contains(&card.episode))
  }

  /// Deterministic cache key for this selection: season-qualified episode
  /// lists, both levels sorted, so selection order can never split the cache.
  /// `character_id` is deliberately not part of the key while it only has
  /// its sentinel value.
  pub fn fingerprint(&self) -> String {
    let mut out = String::new();
    for (i, (season, set)) in self.episodes.iter().enumerate() {
      if i > 0 {
        out.push('|');
      }
      let _ = write!(out, "{season}:");
      for (j, episode) in set.iter().enumerate() {
        if j > 0 {
          out.push(',');
        }
        let _ = write!(out, "{episode}");
      }
    }
    out
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::constants::constants;

  fn card(season: u32, episode: u32) -> Card {
    Card::new(format!("s{season}e{episode}"), season, episode, 0, 0, 0, 0)
  }

  fn filter() -> FilterState {
    FilterState::for_seasons(&constants().seasons)
  }

  // --- predicate ---

  #[test]
  fn unrestricted_matches_everything() {
    let f = filter();
    assert!(f.is_unrestricted());
    assert!(f.matches(&card(1, 1)));
    assert!(f.matches(&card(2, 8)));
    // Even a season the config has never heard of.
    assert!(f.matches(&card(9, 1)));
  }

  #[test]
  fn selection_restricts_to_listed_episodes() {
    let mut f = filter();
    f.set_episodes(1, BTreeSet::from([3, 4]));
    assert!(f.matches(&card(1, 3)));
    assert!(f.matches(&card(1, 4)));
    assert!(!f.matches(&card(1, 5)));
  }

  #[test]
  fn restriction_anywhere_excludes_unselected_seasons() {
    // Season 1 restricted, season 2 untouched: season 2 cards are excluded.
    let mut f = filter();
    f.set_episodes(1, BTreeSet::from([3]));
    assert!(f.matches(&card(1, 3)));
    assert!(!f.matches(&card(2, 3)));
    assert!(!f.matches(&card(2, 1)));
  }

  #[test]
  fn both_seasons_restricted_is_a_union() {
    let mut f = filter();
    f.set_episodes(1, BTreeSet::from([3, 4]));
    f.set_episodes(2, BTreeSet::from([2]));
    assert!(f.matches(&card(1, 3)));
    assert!(f.matches(&card(2, 2)));
    assert!(!f.matches(&card(1, 2)));
    assert!(!f.matches(&card(2, 3)));
  }

  #[test]
  fn character_id_never_affects_matching() {
    let mut f = filter();
    f.character_id = 42;
    assert!(f.matches(&card(1, 1)));
    f.set_episodes(1, BTreeSet::from([1]));
    assert!(f.matches(&card(1, 1)));
  }

  // --- toggling ---

  #[test]
  fn toggle_flips_selection() {
    let mut f = filter();
    assert!(f.toggle(1, 3));
    assert!(f.is_selected(1, 3));
    assert!(!f.toggle(1, 3));
    assert!(!f.is_selected(1, 3));
  }

  #[test]
  fn clear_removes_every_selection() {
    let mut f = filter();
    f.toggle(1, 3);
    f.toggle(2, 2);
    f.clear();
    assert!(f.is_unrestricted());
  }

  // --- fingerprints ---

  #[test]
  fn fingerprint_is_sorted_and_season_qualified() {
    let mut f = filter();
    // Insert out of order; the key must not care.
    f.toggle(1, 4);
    f.toggle(1, 3);
    f.toggle(2, 2);
    assert_eq!(f.fingerprint(), "1:3,4|2:2");
  }

  #[test]
  fn fingerprint_of_unrestricted_filter_is_stable() {
    assert_eq!(filter().fingerprint(), "1:|2:");
  }

  #[test]
  fn same_selection_different_order_same_fingerprint() {
    let mut a = filter();
    a.toggle(1, 7);
    a.toggle(1, 2);
    let mut b = filter();
    b.toggle(1, 2);
    b.toggle(1, 7);
    assert_eq!(a.fingerprint(), b.fingerprint());
  }
}
