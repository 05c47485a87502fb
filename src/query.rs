//! The query pipeline: filter → search → order, with two cache layers.
//!
//! Layer one is keyed by the filter fingerprint alone, layer two by
//! `{filter fingerprint}:search:{normalized query}`. Keeping the layers
//! separate means a changed query re-filters nothing — the filtered
//! sequence comes straight out of layer one. Cached sequences share the
//! immutable catalog through `Arc`s and are never mutated; reversal works
//! on the caller's copy.

use std::sync::Arc;

use tracing::debug;

use crate::cache::LruCache;
use crate::catalog::Card;
use crate::filter::FilterState;
use crate::normalize::normalize;

/// The committed free-text query, held both raw (for display and the URL)
/// and normalized (for matching). Empty means "no text filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
  raw: String,
  normalized: String,
}

impl SearchState {
  pub fn new(raw: &str) -> Self {
    Self { raw: raw.to_string(), normalized: normalize(raw) }
  }

  pub fn raw(&self) -> &str {
    &self.raw
  }

  pub fn normalized(&self) -> &str {
    &self.normalized
  }

  pub fn is_empty(&self) -> bool {
    self.normalized.is_empty()
  }
}

pub struct QueryPipeline {
  filter_cache: LruCache<String, Vec<Arc<Card>>>,
  search_cache: LruCache<String, Vec<Arc<Card>>>,
}

impl QueryPipeline {
  pub fn new(cache_capacity: usize) -> Self {
    Self { filter_cache: LruCache::new(cache_capacity), search_cache: LruCache::new(cache_capacity) }
  }

  /// Drop every cached sequence. Must be called whenever the catalog is
  /// replaced — fingerprints don't encode catalog identity.
  pub fn invalidate(&mut self) {
    self.filter_cache.clear();
    self.search_cache.clear();
  }

  /// Run the pipeline over the catalog for the committed filter/search
  /// state. Deterministic: a cache hit and a cold recompute produce the
  /// same sequence for the same inputs.
  pub fn query(
    &mut self,
    cards: &[Arc<Card>],
    filter: &FilterState,
    search: &SearchState,
    reverse: bool,
  ) -> Vec<Arc<Card>> {
    if cards.is_empty() {
      return Vec::new();
    }

    let filter_fp = filter.fingerprint();
    let filtered = match self.filter_cache.get(&filter_fp) {
      Some(hit) => hit.clone(),
      None => {
        let computed: Vec<Arc<Card>> = cards.iter().filter(|c| filter.matches(c)).cloned().collect();
        debug!(key = %filter_fp, matched = computed.len(), "filter cache miss");
        self.filter_cache.insert(filter_fp.clone(), computed.clone());
        computed
      }
    };

    let mut result = if search.is_empty() {
      filtered
    } else {
      let key = format!("{filter_fp}:search:{}", search.normalized());
      match self.search_cache.get(&key) {
        Some(hit) => hit.clone(),
        None => {
          let computed: Vec<Arc<Card>> =
            filtered.iter().filter(|c| c.normalized_text().contains(search.normalized())).cloned().collect();
          debug!(key = %key, matched = computed.len(), "search cache miss");
          self.search_cache.insert(key, computed.clone());
          computed
        }
      }
    };

    // `result` is already this call's own copy, so reversing it can never
    // touch a cached sequence.
    if reverse {
      result.reverse();
    }
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::constants::constants;
  use std::collections::BTreeSet;

  fn catalog() -> Vec<Arc<Card>> {
    // Two seasons, three episodes each, two cards per episode.
    let mut cards = Vec::new();
    for season in 1..=2 {
      for episode in 1..=3 {
        for take in 0..2 {
          let text = format!("第{episode}話的台詞{take}");
          cards.push(Arc::new(Card::new(text, season, episode, take * 100, take * 100 + 40, take * 100 + 80, take)));
        }
      }
    }
    cards
  }

  fn filter() -> FilterState {
    FilterState::for_seasons(&constants().seasons)
  }

  fn texts(cards: &[Arc<Card>]) -> Vec<&str> {
    cards.iter().map(|c| c.text.as_str()).collect()
  }

  // --- short circuits ---

  #[test]
  fn empty_catalog_returns_empty() {
    let mut pipeline = QueryPipeline::new(8);
    let out = pipeline.query(&[], &filter(), &SearchState::new("春日影"), false);
    assert!(out.is_empty());
  }

  #[test]
  fn unrestricted_no_query_returns_catalog_order() {
    let cards = catalog();
    let mut pipeline = QueryPipeline::new(8);
    let out = pipeline.query(&cards, &filter(), &SearchState::default(), false);
    assert_eq!(texts(&out), texts(&cards));
  }

  // --- filtering and search ---

  #[test]
  fn filter_restricts_to_selected_episodes() {
    let cards = catalog();
    let mut pipeline = QueryPipeline::new(8);
    let mut f = filter();
    f.set_episodes(1, BTreeSet::from([2, 3]));
    let out = pipeline.query(&cards, &f, &SearchState::default(), false);
    assert_eq!(out.len(), 4);
    assert!(out.iter().all(|c| c.season == 1 && (c.episode == 2 || c.episode == 3)));
  }

  #[test]
  fn search_matches_through_normalization() {
    // Card text uses 你; the query uses 妳. Both normalize to 妳.
    let cards = vec![
      Arc::new(Card::new("你不要再裝了", 1, 1, 0, 0, 0, 0)),
      Arc::new(Card::new("春日影", 1, 1, 0, 0, 0, 0)),
    ];
    let mut pipeline = QueryPipeline::new(8);
    let out = pipeline.query(&cards, &filter(), &SearchState::new("妳"), false);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].text, "你不要再裝了");
  }

  #[test]
  fn search_and_filter_compose() {
    let cards = catalog();
    let mut pipeline = QueryPipeline::new(8);
    let mut f = filter();
    f.set_episodes(2, BTreeSet::from([1]));
    let out = pipeline.query(&cards, &f, &SearchState::new("台詞0"), false);
    assert_eq!(out.len(), 1);
    assert!(out[0].season == 2 && out[0].episode == 1);
  }

  // --- ordering ---

  #[test]
  fn reverse_returns_a_reversed_copy() {
    let cards = catalog();
    let mut pipeline = QueryPipeline::new(8);
    let forward = pipeline.query(&cards, &filter(), &SearchState::default(), false);
    let backward = pipeline.query(&cards, &filter(), &SearchState::default(), true);
    let mut expected = forward.clone();
    expected.reverse();
    assert_eq!(texts(&backward), texts(&expected));
    // And the cached (forward) sequence is untouched by the reversal.
    let forward_again = pipeline.query(&cards, &filter(), &SearchState::default(), false);
    assert_eq!(texts(&forward_again), texts(&forward));
  }

  // --- determinism ---

  #[test]
  fn warm_and_cold_paths_agree() {
    let cards = catalog();
    let f = {
      let mut f = filter();
      f.set_episodes(1, BTreeSet::from([1, 2]));
      f
    };
    let search = SearchState::new("台詞");

    let mut warm = QueryPipeline::new(8);
    let first = warm.query(&cards, &f, &search, false);
    let second = warm.query(&cards, &f, &search, false); // cache hit
    assert_eq!(texts(&first), texts(&second));

    let mut cold = QueryPipeline::new(8);
    let fresh = cold.query(&cards, &f, &search, false); // recomputed from scratch
    assert_eq!(texts(&first), texts(&fresh));
  }

  #[test]
  fn shared_not_copied() {
    let cards = catalog();
    let mut pipeline = QueryPipeline::new(8);
    let out = pipeline.query(&cards, &filter(), &SearchState::default(), false);
    // Same allocation as the catalog entry, not a clone of the card.
    assert!(Arc::ptr_eq(&out[0], &cards[0]));
  }

  #[test]
  fn invalidate_forgets_cached_sequences() {
    let cards = catalog();
    let mut pipeline = QueryPipeline::new(8);
    let _ = pipeline.query(&cards, &filter(), &SearchState::default(), false);
    pipeline.invalidate();
    // A smaller replacement catalog must not resurface the old sequence.
    let replacement = vec![cards[0].clone()];
    let out = pipeline.query(&replacement, &filter(), &SearchState::default(), false);
    assert_eq!(out.len(), 1);
  }
}
