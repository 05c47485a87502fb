use anyhow::Result;
use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::{App, AppMode};
use qcard::constants::constants;
use qcard::links;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

/// Open a URL in the default browser without blocking the event loop.
fn open_in_browser(app: &mut App, url: &str) {
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  match std::process::Command::new(cmd)
    .arg(url)
    .stdin(std::process::Stdio::null())
    .stdout(std::process::Stdio::null())
    .stderr(std::process::Stdio::null())
    .spawn()
  {
    Ok(mut child) => {
      // Reap the child in a background thread to avoid zombie processes.
      std::thread::spawn(move || {
        let _ = child.wait();
      });
    }
    Err(e) => {
      app.set_error(format!("Failed to open browser: {}", e));
    }
  }
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) -> Result<()> {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return Ok(());
  }

  // Ctrl+R — explicit refetch: replaces the whole catalog and drops caches.
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('r') {
    app.trigger_fetch(true);
    return Ok(());
  }

  match app.mode {
    AppMode::Input => handle_input_key(app, key),
    AppMode::Results => handle_results_key(app, key),
    AppMode::Filter => handle_filter_key(app, key),
  }
  Ok(())
}

fn handle_input_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter => {
      // Immediate commit, skipping the debounce.
      app.commit_search();
      if !app.results.is_empty() {
        app.mode = AppMode::Results;
      }
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
      app.touch_search();
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.touch_search();
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.touch_search();
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Tab => {
      app.mode = AppMode::Filter;
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
        app.touch_search();
      } else if !app.results.is_empty() {
        app.mode = AppMode::Results;
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down => {
      if !app.results.is_empty() {
        app.mode = AppMode::Results;
      }
    }
    _ => {}
  }
}

fn handle_results_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      // Deep-link into the source video at the card's timestamp.
      let link = app.selected_card().map(|card| (links::video_url(card, constants()), card.season));
      match link {
        Some((Some(url), _)) => open_in_browser(app, &url),
        Some((None, season)) => app.set_error(format!("No video link for season {season}")),
        None => {}
      }
    }
    KeyCode::Char('r') => {
      app.toggle_reverse();
    }
    KeyCode::Char('f') | KeyCode::Tab => {
      app.mode = AppMode::Filter;
    }
    KeyCode::Char('/') => {
      app.mode = AppMode::Input;
    }
    KeyCode::Down | KeyCode::Char('j') => {
      let count = app.results.len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| (i + 1) % count);
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      let count = app.results.len();
      if count > 0 {
        let i = app.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
        app.list_state.select(Some(i));
      }
    }
    KeyCode::Esc => {
      app.mode = AppMode::Input;
    }
    _ => {}
  }
}

fn handle_filter_key(app: &mut App, key: event::KeyEvent) {
  let rows = App::picker_rows();
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => {
      if !rows.is_empty() {
        app.picker_row = (app.picker_row + 1) % rows.len();
      }
    }
    KeyCode::Up | KeyCode::Char('k') => {
      if !rows.is_empty() {
        app.picker_row = if app.picker_row == 0 { rows.len() - 1 } else { app.picker_row - 1 };
      }
    }
    KeyCode::Char(' ') => {
      if let Some(&(season, episode)) = rows.get(app.picker_row) {
        app.filter_buffer.toggle(season, episode);
      }
    }
    KeyCode::Char('c') => {
      app.filter_buffer.clear();
    }
    KeyCode::Enter => {
      // Commit the buffered toggles; a no-op if nothing changed.
      app.commit_filter();
      app.mode = AppMode::Results;
    }
    KeyCode::Esc => {
      app.revert_filter_buffer();
      app.mode = AppMode::Results;
    }
    _ => {}
  }
}
