//! Card model and the binary catalog codec.
//!
//! The catalog payload is one framed message: field 1 repeats, one
//! length-delimited card record per quote. Card fields are optional scalars
//! that default to empty/zero when absent, and unknown fields are skipped.

use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use crate::normalize::normalize;
use crate::wire::{self, DecodeError, Reader};

// Outer message: the repeated card record.
const F_CARD: u32 = 1;

// Card record fields.
const F_TEXT: u32 = 1;
const F_SEASON: u32 = 2;
const F_EPISODE: u32 = 3;
const F_FRAME_START: u32 = 4;
const F_FRAME_PREFER: u32 = 5;
const F_FRAME_END: u32 = 6;
const F_SEGMENT_ID: u32 = 7;

/// One dialogue line with its source position.
///
/// Cards are immutable once decoded; the whole set is replaced on refetch.
#[derive(Debug, Default, Clone)]
pub struct Card {
  pub text: String,
  pub season: u32,
  /// 1-based, unique only within a season.
  pub episode: u32,
  pub frame_start: u32,
  /// Representative frame: drives the thumbnail and timestamp math.
  pub frame_prefer: u32,
  pub frame_end: u32,
  /// Groups cards cut from the same contiguous segment.
  pub segment_id: u32,
  normalized: OnceLock<String>,
}

impl Card {
  pub fn new(
    text: impl Into<String>,
    season: u32,
    episode: u32,
    frame_start: u32,
    frame_prefer: u32,
    frame_end: u32,
    segment_id: u32,
  ) -> Self {
    Self {
      text: text.into(),
      season,
      episode,
      frame_start,
      frame_prefer,
      frame_end,
      segment_id,
      normalized: OnceLock::new(),
    }
  }

  /// Normalized form of `text`. Computed once on first use and memoized on
  /// the card, so repeated searches never re-normalize the catalog.
  pub fn normalized_text(&self) -> &str {
    self.normalized.get_or_init(|| normalize(&self.text))
  }
}

// Equality is over wire fields only; the memoized normalization is derived.
impl PartialEq for Card {
  fn eq(&self, other: &Self) -> bool {
    self.text == other.text
      && self.season == other.season
      && self.episode == other.episode
      && self.frame_start == other.frame_start
      && self.frame_prefer == other.frame_prefer
      && self.frame_end == other.frame_end
      && self.segment_id == other.segment_id
  }
}

impl Eq for Card {}

// --- Decoding ---

fn scalar(r: &mut Reader<'_>, field: u32) -> Result<u32, DecodeError> {
  u32::try_from(r.uvarint()?).map_err(|_| DecodeError::FieldRange { field })
}

fn decode_card(buf: &[u8]) -> Result<Card, DecodeError> {
  let mut r = Reader::new(buf);
  let mut card = Card::default();
  while !r.is_empty() {
    let (field, wire_type) = r.tag()?;
    match (field, wire_type) {
      (F_TEXT, wire::LEN) => card.text = r.string()?.to_string(),
      (F_SEASON, wire::VARINT) => card.season = scalar(&mut r, field)?,
      (F_EPISODE, wire::VARINT) => card.episode = scalar(&mut r, field)?,
      (F_FRAME_START, wire::VARINT) => card.frame_start = scalar(&mut r, field)?,
      (F_FRAME_PREFER, wire::VARINT) => card.frame_prefer = scalar(&mut r, field)?,
      (F_FRAME_END, wire::VARINT) => card.frame_end = scalar(&mut r, field)?,
      (F_SEGMENT_ID, wire::VARINT) => card.segment_id = scalar(&mut r, field)?,
      _ => r.skip(field, wire_type)?,
    }
  }
  Ok(card)
}

/// Decode the catalog payload into its ordered card sequence.
///
/// Total over well-formed input: no record is ever silently dropped, and an
/// empty payload is a valid empty catalog.
pub fn decode_catalog(buf: &[u8]) -> Result<Vec<Card>, DecodeError> {
  let mut r = Reader::new(buf);
  let mut cards = Vec::new();
  while !r.is_empty() {
    let (field, wire_type) = r.tag()?;
    match (field, wire_type) {
      (F_CARD, wire::LEN) => cards.push(decode_card(r.len_delimited()?)?),
      _ => r.skip(field, wire_type)?,
    }
  }
  Ok(cards)
}

// --- Encoding ---
//
// The writer half exists for the round-trip tests and for producing fixture
// payloads; the application itself only consumes catalogs. Zero/empty fields
// are omitted, matching how the payload is produced upstream.

fn encode_card(out: &mut Vec<u8>, card: &Card) {
  let mut body = Vec::new();
  if !card.text.is_empty() {
    wire::put_len_field(&mut body, F_TEXT, card.text.as_bytes());
  }
  for (field, value) in [
    (F_SEASON, card.season),
    (F_EPISODE, card.episode),
    (F_FRAME_START, card.frame_start),
    (F_FRAME_PREFER, card.frame_prefer),
    (F_FRAME_END, card.frame_end),
    (F_SEGMENT_ID, card.segment_id),
  ] {
    if value != 0 {
      wire::put_varint_field(&mut body, field, value as u64);
    }
  }
  wire::put_len_field(out, F_CARD, &body);
}

pub fn encode_catalog(cards: &[Card]) -> Vec<u8> {
  let mut out = Vec::new();
  for card in cards {
    encode_card(&mut out, card);
  }
  out
}

// --- Fetching ---

/// Download and decode the remote catalog.
pub async fn fetch_catalog(client: &Client, url: &str) -> Result<Vec<Card>> {
  info!(url, "fetching catalog");
  let response = client
    .get(url)
    .send()
    .await
    .with_context(|| format!("Failed to fetch catalog from {url}"))?
    .error_for_status()
    .context("Catalog server returned an error status")?;
  let buf = response.bytes().await.context("Failed to read catalog body")?;
  let cards = decode_catalog(&buf).context("Failed to decode catalog payload")?;
  info!(cards = cards.len(), bytes = buf.len(), "catalog decoded");
  Ok(cards)
}

// --- Session state ---

/// The session-lifetime card set plus the loading/error observables the UI
/// binds to. A failed load leaves the catalog empty so downstream code never
/// sees partial state.
#[derive(Debug, Default)]
pub struct CatalogState {
  cards: Vec<Arc<Card>>,
  pub is_loading: bool,
  pub error: Option<String>,
}

impl CatalogState {
  pub fn cards(&self) -> &[Arc<Card>] {
    &self.cards
  }

  /// Whether a fetch should start now. Once cards are populated the fetch is
  /// a no-op unless explicitly forced, and an in-flight load is never doubled.
  pub fn should_fetch(&self, force: bool) -> bool {
    !self.is_loading && (force || self.cards.is_empty())
  }

  pub fn begin_load(&mut self) {
    self.is_loading = true;
    self.error = None;
  }

  /// Apply a finished fetch. Success replaces the whole set; failure clears
  /// it and records a user-facing message.
  pub fn finish_load(&mut self, result: Result<Vec<Card>>) {
    self.is_loading = false;
    match result {
      Ok(cards) => {
        self.cards = cards.into_iter().map(Arc::new).collect();
        self.error = None;
      }
      Err(e) => {
        self.cards.clear();
        self.error = Some(format!("Failed to load catalog: {e:#}"));
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_card(i: u32) -> Card {
    Card::new(format!("台詞その{i}"), 1 + i % 2, 1 + i % 13, i * 100, i * 100 + 40, i * 100 + 80, i / 3)
  }

  // --- round trips ---

  #[test]
  fn round_trip_empty() {
    let encoded = encode_catalog(&[]);
    assert!(encoded.is_empty());
    assert_eq!(decode_catalog(&encoded).unwrap(), Vec::<Card>::new());
  }

  #[test]
  fn round_trip_single() {
    let cards = vec![sample_card(7)];
    let decoded = decode_catalog(&encode_catalog(&cards)).unwrap();
    assert_eq!(decoded, cards);
  }

  #[test]
  fn round_trip_thousand() {
    let cards: Vec<Card> = (0..1000).map(sample_card).collect();
    let decoded = decode_catalog(&encode_catalog(&cards)).unwrap();
    assert_eq!(decoded.len(), 1000);
    assert_eq!(decoded, cards);
  }

  #[test]
  fn absent_fields_default_to_zero() {
    // A record with only text set: every numeric field decodes as 0.
    let cards = vec![Card::new("小祥", 0, 0, 0, 0, 0, 0)];
    let decoded = decode_catalog(&encode_catalog(&cards)).unwrap();
    assert_eq!(decoded[0].text, "小祥");
    assert_eq!(decoded[0].season, 0);
    assert_eq!(decoded[0].frame_prefer, 0);
  }

  #[test]
  fn unknown_fields_are_skipped() {
    let card = sample_card(1);
    let mut body = Vec::new();
    wire::put_len_field(&mut body, F_TEXT, card.text.as_bytes());
    wire::put_varint_field(&mut body, F_SEASON, card.season as u64);
    wire::put_varint_field(&mut body, F_EPISODE, card.episode as u64);
    // A field number this decoder has never heard of.
    wire::put_len_field(&mut body, 99, b"future");
    let mut payload = Vec::new();
    wire::put_len_field(&mut payload, F_CARD, &body);

    let decoded = decode_catalog(&payload).unwrap();
    assert_eq!(decoded[0].text, card.text);
    assert_eq!(decoded[0].episode, card.episode);
  }

  // --- malformed payloads ---

  #[test]
  fn truncated_record_is_an_error() {
    let encoded = encode_catalog(&[sample_card(3)]);
    let truncated = &encoded[..encoded.len() - 2];
    assert!(decode_catalog(truncated).is_err());
  }

  #[test]
  fn garbage_is_an_error_not_a_panic() {
    assert!(decode_catalog(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]).is_err());
  }

  // --- lazy normalization ---

  #[test]
  fn normalized_text_is_memoized() {
    let card = Card::new("你的演奏", 1, 1, 0, 0, 0, 0);
    let first = card.normalized_text() as *const str;
    let second = card.normalized_text() as *const str;
    assert_eq!(card.normalized_text(), "妳的演奏");
    // Same allocation both times: computed exactly once.
    assert_eq!(first, second);
  }

  // --- session state ---

  #[test]
  fn fetch_guard_skips_populated_catalog() {
    let mut state = CatalogState::default();
    assert!(state.should_fetch(false));
    state.finish_load(Ok(vec![sample_card(1)]));
    assert!(!state.should_fetch(false));
    assert!(state.should_fetch(true), "explicit refetch bypasses the guard");
  }

  #[test]
  fn failed_load_leaves_catalog_empty_with_error() {
    let mut state = CatalogState::default();
    state.begin_load();
    assert!(state.is_loading);
    state.finish_load(Err(anyhow::anyhow!("boom")));
    assert!(!state.is_loading);
    assert!(state.cards().is_empty());
    assert!(state.error.as_deref().unwrap_or_default().contains("boom"));
  }
}
