//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * The layout is a two-row split: a scrollable stream on top and a
//!   one-line status bar at the bottom.
//! * Each item renders as a header line; a post-stream item adds up to
//!   [`POSTS_PER_ITEM`] indented post lines once its posts have arrived.
//! * Colours and styles are defined inline.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::App;
use crate::source::{Item, ItemKind};
use crate::stream::StreamDestination;

/// How many posts of an enriched item are listed under it.
const POSTS_PER_ITEM: usize = 3;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [main_area, status_area] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    if app.not_found && app.cells.is_empty() {
        draw_not_found(frame, main_area);
    } else {
        draw_stream(app, frame, main_area);
    }
    draw_status_bar(app, frame, status_area);
}

fn block() -> Block<'static> {
    Block::default().title(" Ello ").borders(Borders::ALL)
}

/// Render the scrollable stream.
fn draw_stream(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .cells
        .iter()
        .map(|cell| match cell.as_item() {
            Some(item) => ListItem::new(item_text(item)),
            None => ListItem::new(Line::from(Span::styled(
                "  Loading…",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ))),
        })
        .collect();

    let list = List::new(list_items)
        .block(block())
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn item_text(item: &Item) -> Text<'_> {
    let title = item.title.as_deref().unwrap_or(match &item.kind {
        ItemKind::Invite => "Invite your friends",
        ItemKind::Join => "Join Ello",
        _ => "(untitled)",
    });

    let mut header = vec![
        Span::styled(
            format!("{:<12}", format!("[{}]", item.kind.label())),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(title, Style::default().fg(Color::White)),
    ];
    if let Some(subtitle) = &item.subtitle {
        header.push(Span::raw("  "));
        header.push(Span::styled(subtitle.as_str(), Style::default().fg(Color::DarkGray)));
    }
    if let Some(posts) = &item.posts {
        header.push(Span::raw("  "));
        header.push(Span::styled(
            match posts.len() {
                1 => "1 post".to_string(),
                n => format!("{n} posts"),
            },
            Style::default().fg(Color::Green),
        ));
    }

    let mut lines = vec![Line::from(header)];
    for post in item.posts.iter().flatten().take(POSTS_PER_ITEM) {
        let date_str = post
            .published
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "no date".into());
        lines.push(Line::from(vec![
            Span::raw("    "),
            Span::styled(format!("{:<18}", date_str), Style::default().fg(Color::DarkGray)),
            Span::raw(" "),
            Span::raw(post.title.as_str()),
        ]));
    }
    Text::from(lines)
}

fn draw_not_found(frame: &mut Frame, area: Rect) {
    let message = Paragraph::new(Line::from(Span::styled(
        "  This stream could not be found.",
        Style::default().fg(Color::Red),
    )))
    .block(block());
    frame.render_widget(message, area);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let paging = match (&app.paging, app.paging_enabled()) {
        (Some(p), true) if !p.is_last_page() => "more available",
        (Some(_), true) => "last page",
        _ => "",
    };
    let status = Paragraph::new(Line::from(vec![
        Span::styled(" ", Style::default()),
        Span::styled(&app.status, Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} items", app.item_count()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  "),
        Span::styled(paging, Style::default().fg(Color::Cyan)),
        Span::raw("  q: quit  r: reload  ↑/↓: scroll  Home/End: jump"),
    ]));
    frame.render_widget(status, area);
}

// ---------------------------------------------------------------------------
// Tests (smoke)
// ---------------------------------------------------------------------------
