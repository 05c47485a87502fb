use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use ratatui::widgets::ListState;
use reqwest::Client;
use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::config::Config;
use qcard::catalog::{Card, CatalogState, fetch_catalog};
use qcard::constants::constants;
use qcard::filter::FilterState;
use qcard::query::{QueryPipeline, SearchState};
use qcard::urlstate::{self, History};

// --- Types ---

pub type FetchResult = Result<Vec<Card>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
  Input,
  Results,
  Filter,
}

pub struct App {
  // Search input buffer. Edits land here immediately; the committed
  // SearchState only changes on flush (debounce deadline or Enter).
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub mode: AppMode,

  // Committed query state — the only state the pipeline and URL ever see.
  pub filter: FilterState,
  pub search: SearchState,
  pub reverse: bool,

  // Episode picker buffer: toggles accumulate here until Enter commits.
  pub filter_buffer: FilterState,
  pub picker_row: usize,

  pub catalog: CatalogState,
  pipeline: QueryPipeline,
  pub results: Vec<Arc<Card>>,
  pub list_state: ListState,

  pub history: History,

  // Trailing-edge debounce for the search buffer. Every edit re-arms the
  // deadline, so only the newest buffered value can ever be committed.
  search_deadline: Option<Instant>,

  pub http_client: Client,
  catalog_url: String,
  fetch_rx: Option<oneshot::Receiver<FetchResult>>,

  pub last_error: Option<String>,
  pub status_message: Option<String>,
  pub should_quit: bool,
  /// When the last error was set — used for auto-dismiss after 5 seconds.
  error_time: Option<Instant>,
}

impl App {
  pub fn new(initial_filter: FilterState, initial_query: String, reverse_flag: bool, catalog_url: String) -> Self {
    let config = Config::load();
    let reverse = reverse_flag || config.reverse.unwrap_or(false);

    let search = SearchState::new(&initial_query);
    let seasons = &constants().seasons;
    let initial_entry = urlstate::apply_state("", &initial_filter, search.raw(), seasons).unwrap_or_default();

    let cursor = initial_query.chars().count();
    Self {
      input: initial_query,
      cursor_position: cursor,
      input_scroll: 0,
      mode: AppMode::Input,
      filter_buffer: initial_filter.clone(),
      picker_row: 0,
      filter: initial_filter,
      search,
      reverse,
      catalog: CatalogState::default(),
      pipeline: QueryPipeline::new(constants().cache_capacity),
      results: Vec::new(),
      list_state: ListState::default(),
      history: History::seeded(initial_entry),
      search_deadline: None,
      http_client: Client::new(),
      catalog_url,
      fetch_rx: None,
      last_error: None,
      status_message: None,
      should_quit: false,
      error_time: None,
    }
  }

  // --- Messages ---

  /// Set an error message with auto-dismiss tracking.
  pub fn set_error(&mut self, msg: String) {
    self.last_error = Some(msg);
    self.error_time = Some(Instant::now());
  }

  /// Clear the current error message and its expiry timer.
  pub fn clear_error(&mut self) {
    self.last_error = None;
    self.error_time = None;
  }

  /// Clear stale error messages after 5 seconds.
  pub fn expire_error(&mut self) {
    if let Some(t) = self.error_time
      && t.elapsed() >= Duration::from_secs(5)
    {
      self.last_error = None;
      self.error_time = None;
    }
  }

  fn save_config(&self) {
    let config = Config { reverse: Some(self.reverse) };
    config.save();
  }

  // --- Catalog loading ---

  /// Start a catalog fetch unless one is already done or running. `force`
  /// is the explicit-refetch path: it bypasses the populated guard and
  /// replaces the whole set when it lands.
  pub fn trigger_fetch(&mut self, force: bool) {
    if !self.catalog.should_fetch(force) {
      debug!(force, "catalog already populated or loading, skipping fetch");
      return;
    }
    self.catalog.begin_load();
    self.status_message = Some("Loading catalog…".to_string());

    let client = self.http_client.clone();
    let url = self.catalog_url.clone();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let _ = tx.send(fetch_catalog(&client, &url).await);
    });
    self.fetch_rx = Some(rx);
  }

  /// Poll in-flight async work. Called once per event-loop tick.
  pub fn check_pending(&mut self) {
    if let Some(mut rx) = self.fetch_rx.take() {
      match rx.try_recv() {
        Ok(result) => {
          self.status_message = None;
          let failed = result.is_err();
          self.catalog.finish_load(result);
          // The old card set is gone either way; cached sequences go with it.
          self.pipeline.invalidate();
          if failed {
            self.set_error(self.catalog.error.clone().unwrap_or_else(|| "Failed to load catalog".to_string()));
          }
          self.recompute();
        }
        Err(oneshot::error::TryRecvError::Empty) => {
          self.fetch_rx = Some(rx);
        }
        Err(oneshot::error::TryRecvError::Closed) => {
          self.status_message = None;
          self.catalog.finish_load(Err(anyhow::anyhow!("catalog fetch task died")));
          self.pipeline.invalidate();
          self.set_error("Catalog fetch task failed.".to_string());
        }
      }
    }
  }

  // --- Buffer → active commits ---

  /// Note a search-buffer edit: re-arm the trailing-edge debounce. The
  /// commit fires from [`tick`](Self::tick) once the buffer goes quiet.
  pub fn touch_search(&mut self) {
    self.search_deadline = Some(Instant::now() + Duration::from_millis(constants().search_debounce_ms));
  }

  /// Per-tick timer check. Fires the debounced search commit when due.
  pub fn tick(&mut self) {
    self.expire_error();
    if let Some(deadline) = self.search_deadline
      && Instant::now() >= deadline
    {
      self.commit_search();
    }
  }

  /// Promote the search buffer to committed state. Returns whether anything
  /// changed; an unchanged buffer is a no-op all the way down (no recompute,
  /// no history entry).
  pub fn commit_search(&mut self) -> bool {
    self.search_deadline = None;
    if self.search.raw() == self.input {
      debug!("search unchanged, skip commit");
      return false;
    }
    self.search = SearchState::new(&self.input);
    info!(query = %self.search.raw(), "search committed");
    self.recompute();
    self.sync_history();
    true
  }

  /// Promote the episode-picker buffer to committed state.
  pub fn commit_filter(&mut self) -> bool {
    if self.filter_buffer == self.filter {
      debug!("filter unchanged, skip commit");
      return false;
    }
    self.filter = self.filter_buffer.clone();
    info!(fingerprint = %self.filter.fingerprint(), "filter committed");
    self.recompute();
    self.sync_history();
    true
  }

  /// Throw away un-committed picker toggles.
  pub fn revert_filter_buffer(&mut self) {
    self.filter_buffer = self.filter.clone();
  }

  fn sync_history(&mut self) {
    let wrote = self.history.sync(&self.filter, self.search.raw(), &constants().seasons);
    debug!(wrote, current = %self.history.current(), "history sync");
  }

  // --- Results ---

  /// Re-run the pipeline over the committed state and clamp the selection.
  pub fn recompute(&mut self) {
    self.results = self.pipeline.query(self.catalog.cards(), &self.filter, &self.search, self.reverse);
    if self.results.is_empty() {
      self.list_state.select(None);
    } else {
      match self.list_state.selected() {
        Some(selected) if selected >= self.results.len() => {
          self.list_state.select(Some(self.results.len() - 1));
        }
        Some(_) => {}
        None => self.list_state.select(Some(0)),
      }
    }
  }

  pub fn toggle_reverse(&mut self) {
    self.reverse = !self.reverse;
    self.recompute();
    self.save_config();
  }

  pub fn selected_card(&self) -> Option<&Arc<Card>> {
    self.results.get(self.list_state.selected()?)
  }

  /// The shareable link for the committed state.
  pub fn share_url(&self) -> String {
    let query = self.history.current();
    if query.is_empty() {
      constants().share_base_url.clone()
    } else {
      format!("{}?{}", constants().share_base_url, query)
    }
  }

  // --- Episode picker ---

  /// Flattened (season, episode) rows the picker navigates, in season
  /// config order.
  pub fn picker_rows() -> Vec<(u32, u32)> {
    let mut rows = Vec::new();
    for season in &constants().seasons {
      for episode in 1..=season.episode_count {
        rows.push((season.id, episode));
      }
    }
    rows
  }
}
