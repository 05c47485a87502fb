mod app;
mod config;
mod input;
mod ui;

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use serde::Serialize;
use tracing::info;

use app::App;
use qcard::catalog::{Card, fetch_catalog};
use qcard::constants::constants;
use qcard::filter::FilterState;
use qcard::links;
use qcard::query::{QueryPipeline, SearchState};
use qcard::urlstate::{decode_episode_mask, read_query};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Start from a shared link (or bare query string) carrying ep/q state
  #[arg(long)]
  link: Option<String>,

  /// Initial episode selection: the `ep` bitmask from a shared link
  #[arg(long)]
  ep: Option<u64>,

  /// Initial search query: the `q` parameter from a shared link
  #[arg(long)]
  q: Option<String>,

  /// Newest-first result ordering
  #[arg(long)]
  reverse: bool,

  /// Print matching cards as JSON lines and exit (no TUI)
  #[arg(long)]
  json: bool,

  /// Override the catalog URL
  #[arg(long)]
  catalog_url: Option<String>,

  /// Generate shell completions and exit
  #[arg(long, value_enum, value_name = "SHELL")]
  completions: Option<clap_complete::Shell>,
}

impl Args {
  /// Resolve the initial committed state. `--ep`/`--q` win over `--link`.
  fn initial_state(&self) -> (FilterState, String) {
    let (link_ep, link_q) = match self.link {
      Some(ref link) => read_query(link.split_once('?').map_or(link.as_str(), |(_, q)| q)),
      None => (None, None),
    };
    let mask = self.ep.or(link_ep).unwrap_or(0);
    let query = self.q.clone().or(link_q).unwrap_or_default();
    (decode_episode_mask(mask, &constants().seasons), query)
  }
}

// --- Logging ---

/// Log to a file in the platform data dir so the TUI stays clean. Returns
/// the appender guard; dropping it flushes buffered lines on exit.
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let proj_dirs = directories::ProjectDirs::from("", "", "qcard")?;
  let log_dir = proj_dirs.data_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;
  let appender = tracing_appender::rolling::daily(log_dir, "qcard.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = tracing_subscriber::EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("qcard=info"));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

// --- Headless mode ---

#[derive(Serialize)]
struct CardView<'a> {
  text: &'a str,
  season: u32,
  episode: u32,
  segment_id: u32,
  timestamp: String,
  image_url: String,
  video_url: Option<String>,
}

/// One-shot query: fetch, filter, search, print JSON lines. The pipeline is
/// exactly the TUI's; only the front-end differs.
async fn run_headless(args: &Args) -> Result<()> {
  let cfg = constants();
  let url = args.catalog_url.clone().unwrap_or_else(|| cfg.catalog_url.clone());
  let client = reqwest::Client::new();
  let cards: Vec<Arc<Card>> = fetch_catalog(&client, &url).await?.into_iter().map(Arc::new).collect();

  let (filter, query) = args.initial_state();
  let search = SearchState::new(&query);
  let mut pipeline = QueryPipeline::new(cfg.cache_capacity);
  let results = pipeline.query(&cards, &filter, &search, args.reverse);
  info!(total = cards.len(), matched = results.len(), "headless query done");

  let mut stdout = std::io::stdout().lock();
  for card in &results {
    let view = CardView {
      text: &card.text,
      season: card.season,
      episode: card.episode,
      segment_id: card.segment_id,
      timestamp: links::timestamp_label(card, cfg),
      image_url: links::image_url(card, cfg),
      video_url: links::video_url(card, cfg),
    };
    serde_json::to_writer(&mut stdout, &view).context("Failed to serialize card")?;
    writeln!(stdout)?;
  }
  Ok(())
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "qcard", &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = init_logging();

  if args.json {
    return run_headless(&args).await;
  }

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, args).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, args: Args) -> Result<()> {
  let (filter, query) = args.initial_state();
  let url = args.catalog_url.unwrap_or_else(|| constants().catalog_url.clone());
  let mut app = App::new(filter, query, args.reverse, url);
  app.trigger_fetch(false);

  loop {
    app.check_pending();
    app.tick();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key)?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  Ok(())
}
