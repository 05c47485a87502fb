use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, List, ListItem, Paragraph},
};

use crate::app::{App, AppMode};
use qcard::constants::constants;
use qcard::links;

// --- Palette ---

const ACCENT: Color = Color::Cyan;
const MUTED: Color = Color::DarkGray;
const FG: Color = Color::Gray;
const WARN: Color = Color::Red;

// --- Helpers ---

/// Truncate a string to `max_width` display columns (double-width CJK aware),
/// appending "…" when truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  use unicode_width::UnicodeWidthChar;
  let mut width = 0;
  let mut out = String::new();
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if width + w > max_width.saturating_sub(1) {
      out.push('…');
      return out;
    }
    width += w;
    out.push(c);
  }
  s.to_string()
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(2),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  render_main(frame, app, main_area);
  render_status(frame, app, status_area);
  render_input(frame, app, input_area);
  render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let count = app.results.len();
  let left = Line::from(vec![
    Span::styled(" ▶ qcard ", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
    Span::styled(format!("{count} cards"), Style::default().fg(MUTED)),
  ]);
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(MUTED)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_main(frame: &mut Frame, app: &mut App, area: Rect) {
  match app.mode {
    AppMode::Filter => render_picker(frame, app, area),
    _ if !app.results.is_empty() => render_results(frame, app, area),
    _ => render_welcome(frame, app, area),
  }
}

fn render_welcome(frame: &mut Frame, app: &App, area: Rect) {
  let message = if app.catalog.is_loading {
    "Loading catalog…"
  } else if app.catalog.error.is_some() {
    "Catalog failed to load. Ctrl+R to retry."
  } else if app.catalog.cards().is_empty() {
    "No catalog loaded yet."
  } else {
    "No cards match the current filter."
  };
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  qcard", Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Search quote cards. Deep-link the source.", Style::default().fg(FG))),
    Line::from(""),
    Line::from(Span::styled(message, Style::default().fg(MUTED))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
    Block::bordered()
      .border_type(ratatui::widgets::BorderType::Rounded)
      .border_style(Style::default().fg(MUTED)),
  );
  frame.render_widget(paragraph, area);
}

fn render_results(frame: &mut Frame, app: &mut App, area: Rect) {
  let cfg = constants();
  let text_width = (area.width as usize).saturating_sub(24);
  let items: Vec<ListItem> = app
    .results
    .iter()
    .map(|card| {
      let line = Line::from(vec![
        Span::styled(truncate_str(&card.text, text_width), Style::default().fg(FG)),
        Span::raw("  "),
        Span::styled(links::episode_label(card, cfg), Style::default().fg(ACCENT)),
        Span::raw(" · "),
        Span::styled(links::timestamp_label(card, cfg), Style::default().fg(MUTED)),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(
      Block::bordered()
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(if app.mode == AppMode::Results { ACCENT } else { MUTED }))
        .title(" Results "),
    )
    .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))
    .highlight_symbol("▶ ");

  frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_picker(frame: &mut Frame, app: &App, area: Rect) {
  let cfg = constants();
  let rows = App::picker_rows();
  let mut lines = Vec::new();
  let mut last_season = None;
  for (i, &(season_id, episode)) in rows.iter().enumerate() {
    if last_season != Some(season_id) {
      last_season = Some(season_id);
      let name = cfg.season(season_id).map_or("?", |s| s.name.as_str());
      lines.push(Line::from(Span::styled(name.to_string(), Style::default().fg(ACCENT).add_modifier(Modifier::BOLD))));
    }
    let mark = if app.filter_buffer.is_selected(season_id, episode) { "[x]" } else { "[ ]" };
    let style = if i == app.picker_row {
      Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(FG)
    };
    let cursor = if i == app.picker_row { "▶ " } else { "  " };
    lines.push(Line::from(Span::styled(format!("{cursor}{mark} 第{episode}話"), style)));
  }

  let pending = app.filter_buffer != app.filter;
  let selected = app.filter_buffer.selected_count();
  let title = match (selected, pending) {
    (0, false) => " Episodes ".to_string(),
    (n, false) => format!(" Episodes ({n} selected) "),
    (n, true) => format!(" Episodes ({n} selected, Enter to apply) "),
  };
  let paragraph = Paragraph::new(lines)
    .scroll((picker_scroll(app, area), 0))
    .block(
      Block::bordered()
        .border_type(ratatui::widgets::BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT))
        .title(title),
    );
  frame.render_widget(paragraph, area);
}

/// Keep the picker cursor visible inside the bordered area.
fn picker_scroll(app: &App, area: Rect) -> u16 {
  let visible = area.height.saturating_sub(2) as usize;
  if visible == 0 {
    return 0;
  }
  // Each season header adds one line above its episodes.
  let seasons_before = constants()
    .seasons
    .iter()
    .scan(0usize, |acc, s| {
      *acc += s.episode_count as usize;
      Some(*acc)
    })
    .filter(|&end| end <= app.picker_row)
    .count();
  let cursor_line = app.picker_row + seasons_before + 1;
  cursor_line.saturating_sub(visible.saturating_sub(1)) as u16
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let cfg = constants();
  let first = if let Some(ref err) = app.last_error {
    Line::from(Span::styled(format!(" ✗ {err}"), Style::default().fg(WARN)))
  } else if let Some(ref status) = app.status_message {
    Line::from(Span::styled(format!(" ⟳ {status}"), Style::default().fg(ACCENT)))
  } else if let Some(card) = app.selected_card() {
    match links::video_url(card, cfg) {
      Some(url) => Line::from(vec![
        Span::styled(" ⏵ ", Style::default().fg(ACCENT)),
        Span::styled(url, Style::default().fg(FG)),
      ]),
      None => Line::from(""),
    }
  } else {
    Line::from("")
  };
  let second = Line::from(vec![
    Span::styled(" ⇱ ", Style::default().fg(MUTED)),
    Span::styled(app.share_url(), Style::default().fg(MUTED)),
  ]);
  frame.render_widget(Paragraph::new(vec![first, second]), area);
}

fn render_input(frame: &mut Frame, app: &mut App, area: Rect) {
  let focused = app.mode == AppMode::Input;
  let border = if focused { ACCENT } else { MUTED };
  // A pending (un-committed) buffer shows a subtle marker in the title.
  let pending = app.input != app.search.raw();
  let title = if pending { " Search * " } else { " Search " };

  let inner_width = area.width.saturating_sub(2) as usize;
  let chars: Vec<char> = app.input.chars().collect();
  // Keep the cursor in view with simple horizontal scrolling.
  if app.cursor_position < app.input_scroll {
    app.input_scroll = app.cursor_position;
  } else if app.cursor_position >= app.input_scroll + inner_width.max(1) {
    app.input_scroll = app.cursor_position + 1 - inner_width.max(1);
  }
  let visible: String = chars.iter().skip(app.input_scroll).take(inner_width).collect();

  let paragraph = Paragraph::new(Line::from(Span::styled(visible, Style::default().fg(FG)))).block(
    Block::bordered()
      .border_type(ratatui::widgets::BorderType::Rounded)
      .border_style(Style::default().fg(border))
      .title(title),
  );
  frame.render_widget(paragraph, area);

  if focused {
    use unicode_width::UnicodeWidthChar;
    let cursor_cols: usize =
      chars.iter().skip(app.input_scroll).take(app.cursor_position - app.input_scroll).map(|c| c.width().unwrap_or(0)).sum();
    frame.set_cursor_position((area.x + 1 + cursor_cols as u16, area.y + 1));
  }
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let hints = match app.mode {
    AppMode::Input => " Enter search · Tab episodes · ↓ results · Ctrl+R refetch · Ctrl+C quit",
    AppMode::Results => " Enter open video · / search · f episodes · r reverse · j/k move · Esc back",
    AppMode::Filter => " Space toggle · c clear · Enter apply · Esc cancel · j/k move",
  };
  frame.render_widget(Line::from(Span::styled(hints, Style::default().fg(MUTED))), area);
}
