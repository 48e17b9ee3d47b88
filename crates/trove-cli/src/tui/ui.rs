//! UI rendering

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use trove_core::models::{format_tags, ReadStatus};

use super::app::{ActivePane, App, Filter, InputMode};
use crate::output::truncate;

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    // Create vertical layout for status bar at the bottom
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    // Split the main area into three panes
    let pane_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(35),
            Constraint::Percentage(45),
        ])
        .split(outer_chunks[0]);

    draw_filters_pane(frame, app, pane_chunks[0]);
    draw_items_pane(frame, app, pane_chunks[1]);
    draw_detail_pane(frame, app, pane_chunks[2]);

    match app.input_mode {
        InputMode::Normal => draw_status_bar(frame, app, outer_chunks[1]),
        InputMode::Command => draw_input(frame, app, outer_chunks[1], ":", Color::Yellow, None),
        InputMode::Filter => {
            let matches = format!("  ({} matches)", app.books.len());
            draw_input(frame, app, outer_chunks[1], "/", Color::Cyan, Some(matches));
        }
        InputMode::Confirm => draw_confirm(frame, app, outer_chunks[1]),
    }

    if app.show_help {
        draw_help_overlay(frame);
    }

    if let Some(message) = &app.error_message {
        draw_error_overlay(frame, message);
    }
}

fn pane_styles(is_active: bool) -> (Style, Style) {
    if is_active {
        (
            Style::default().add_modifier(Modifier::BOLD),
            Style::default()
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::REVERSED),
        )
    } else {
        (
            Style::default(),
            Style::default().add_modifier(Modifier::REVERSED),
        )
    }
}

/// Draw the filters pane (left)
fn draw_filters_pane(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .filters
        .iter()
        .map(|filter| {
            let name = match filter {
                Filter::All => "≡ All".to_string(),
                Filter::Recent => "⏱ Recent".to_string(),
                Filter::Unread => "○ Unread".to_string(),
                Filter::Reading => "◐ Reading".to_string(),
                Filter::Read => "● Read".to_string(),
                Filter::TagsHeader => accordion("By Tag...", app.tags_expanded),
                Filter::ByTag(tag) => match app.tag_defs.iter().find(|t| &t.name == tag) {
                    Some(def) => format!("    {}", def.label()),
                    None => format!("    #{}", tag),
                },
                Filter::SeriesHeader => accordion("By Series...", app.series_expanded),
                Filter::BySeries(series) => format!("    {}", series),
            };

            ListItem::new(name)
        })
        .collect();

    let (border_style, highlight_style) = pane_styles(app.active_pane == ActivePane::Filters);

    let block = Block::default()
        .title(" Filters ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style);

    let mut state = ListState::default();
    state.select(Some(app.filter_index));

    frame.render_stateful_widget(list, area, &mut state);
}

fn accordion(label: &str, expanded: bool) -> String {
    if expanded {
        format!("▼ {}", label)
    } else {
        format!("▶ {}", label)
    }
}

fn status_marker(status: ReadStatus) -> &'static str {
    match status {
        ReadStatus::Unread => "○",
        ReadStatus::Reading => "◐",
        ReadStatus::Read => "●",
    }
}

/// Draw the books pane (middle)
fn draw_items_pane(frame: &mut Frame, app: &App, area: Rect) {
    let max_len = area.width.saturating_sub(6) as usize;

    let items: Vec<ListItem> = app
        .books
        .iter()
        .map(|book| {
            let title = Line::from(vec![
                Span::raw(format!("{} ", status_marker(book.read_status))),
                Span::raw(truncate(&book.title, max_len)),
            ]);

            let mut byline = book.author.clone();
            if let Some(ref series) = book.series {
                byline.push_str(&format!(" · {}", series));
            }
            let byline = Line::from(vec![Span::styled(
                format!("  {}", truncate(&byline, max_len)),
                Style::default().add_modifier(Modifier::DIM),
            )]);

            ListItem::new(vec![title, byline])
        })
        .collect();

    let (border_style, highlight_style) = pane_styles(app.active_pane == ActivePane::Items);

    let title = format!(" Books ({}) · {} ", app.books.len(), app.sort_label());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style);

    let mut state = ListState::default();
    if !app.books.is_empty() {
        state.select(Some(app.book_index));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

fn field<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value),
    ])
}

/// Draw the detail pane (right)
fn draw_detail_pane(frame: &mut Frame, app: &App, area: Rect) {
    let (border_style, _) = pane_styles(app.active_pane == ActivePane::Detail);

    let block = Block::default()
        .title(" Detail ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let content = if let Some(book) = app.current_book() {
        let mut lines = vec![
            field("Title: ", book.title.clone()),
            field("Author: ", book.author.clone()),
            Line::from(""),
            field("File: ", book.file_path.display().to_string()),
        ];

        if !book.other_formats.is_empty() {
            let formats: Vec<String> = book
                .other_formats
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            lines.push(field("Other formats: ", formats.join(", ")));
        }

        lines.push(Line::from(""));
        lines.push(field(
            "Series: ",
            book.series
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ));

        let tags = if book.tags.is_empty() {
            "-".to_string()
        } else {
            format_tags(&book.tags, &app.tag_defs)
        };
        lines.push(field("Tags: ", tags));

        let status = match book.read_at {
            Some(at) => format!("{} ({})", book.read_status, at.format("%Y-%m-%d")),
            None => book.read_status.to_string(),
        };
        lines.push(field("Status: ", status));

        lines.push(Line::from(""));
        lines.push(field(
            "Description: ",
            book.description.clone().unwrap_or_else(|| "-".to_string()),
        ));

        lines.push(Line::from(""));
        lines.push(field("Metadata: ", book.metadata.to_string()));
        lines.push(field(
            "Added: ",
            book.added.format("%Y-%m-%d %H:%M").to_string(),
        ));
        lines.push(field(
            "Updated: ",
            book.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        ));

        lines
    } else {
        vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                "Select a book to view details",
                Style::default().add_modifier(Modifier::DIM),
            )]),
        ]
    };

    // Keep at least the last line visible when scrolled past the end
    let max_scroll = content.len().saturating_sub(1) as u16;

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.detail_scroll.min(max_scroll), 0));

    frame.render_widget(paragraph, area);
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let content = if let Some(msg) = &app.status_message {
        msg.clone()
    } else {
        "a:add  e:edit  t:tag  d:del  o:open  s:sort  r:reverse  S:settings  /:filter  ?:help  q:quit"
            .to_string()
    };

    let paragraph = Paragraph::new(content).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Draw a one-line text input with a cursor
fn draw_input(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    prefix: &'static str,
    color: Color,
    suffix: Option<String>,
) {
    let mut spans = vec![
        Span::styled(prefix, Style::default().fg(color)),
        Span::raw(app.command_input.as_str()),
    ];
    if let Some(suffix) = suffix {
        spans.push(Span::styled(
            suffix,
            Style::default().add_modifier(Modifier::DIM),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    let cursor_x = area.x + prefix.len() as u16 + app.command_cursor as u16;
    frame.set_cursor_position((cursor_x, area.y));
}

/// Draw the delete confirmation prompt
fn draw_confirm(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .pending_delete
        .as_ref()
        .map(|b| b.title.as_str())
        .unwrap_or("");

    let line = Line::from(vec![
        Span::styled(
            format!("Delete '{}' and its files? ", title),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::raw("(y/n)"),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Centered popup area
fn popup(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.width.saturating_sub(width) / 2;
    let y = area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let popup_area = popup(frame.area(), 52, 30);
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from("  gg          Jump to first item"),
        Line::from("  G           Jump to last item"),
        Line::from("  h/l, ←/→    Switch panes"),
        Line::from("  Tab         Cycle panes"),
        Line::from("  Enter       Open book / Apply filter"),
        Line::from(""),
        Line::from("Commands:"),
        Line::from("  a           Add a file"),
        Line::from("  e           Edit book"),
        Line::from("  t           Edit tags"),
        Line::from("  d           Delete book and files"),
        Line::from("  o           Open book"),
        Line::from("  s           Cycle sort field"),
        Line::from("  r           Reverse sort"),
        Line::from("  S           Settings"),
        Line::from(""),
        Line::from("  /           Filter view"),
        Line::from("  :           Command mode"),
        Line::from("              add <path>, tag a, b, search <q>,"),
        Line::from("              read, reading, unread, sort <field>"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, popup_area);
}

/// Draw the error modal
fn draw_error_overlay(frame: &mut Frame, message: &str) {
    let popup_area = popup(frame.area(), 60, 8);
    frame.render_widget(Clear, popup_area);

    let text = vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup_area);
}
