//! Trove TUI
//!
//! Terminal user interface for browsing and curating the library.
//!
//! ## Layout
//!
//! Three-pane layout:
//! - Left: Filters (All, Recent, Unread, Reading, Read, By Tag..., By Series...)
//! - Middle: Books matching the filter
//! - Right: Detail preview of the selected book
//!
//! ## Navigation
//!
//! - j/k or ↑/↓: Move selection up/down
//! - h/l or ←/→: Switch focus between panes
//! - Tab: Cycle through panes
//! - Enter: Select filter / Open book
//! - q: Quit
//!
//! ## Commands
//!
//! - a: Add a file
//! - e: Edit book
//! - t: Edit tags
//! - d: Delete book and its files
//! - o: Open book
//! - s/r: Cycle sort field / reverse
//! - S: Settings
//! - /: Filter current view
//! - :: Command mode

mod app;
mod ui;

use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::{info, warn};

use trove_core::{Config, ConfigFile, Store};

use app::{App, CommandResult, CommandType, EditorTask, InputMode};

use crate::commands::config::effective_path;
use crate::editor;
use crate::form::{apply_settings, render_settings, BookForm};

/// Run the TUI application
pub fn run(config: Config, config_path: Option<PathBuf>) -> Result<()> {
    let mut store = Store::open_with_config(config).context("Failed to open library")?;
    info!(books = store.book_count(), "Starting TUI");

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = App::new(&store);
    let settings_path = effective_path(config_path.as_ref());

    // Run app
    let result = run_app(&mut terminal, &mut app, &mut store, &settings_path);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    store: &mut Store,
    settings_path: &Path,
) -> Result<()> {
    loop {
        // Check for status message timeout
        app.check_status_timeout();

        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // If error modal is showing, any key dismisses it
                if app.has_error() {
                    app.clear_error();
                    continue;
                }

                // If help is showing, any key dismisses it
                if app.show_help {
                    app.show_help = false;
                    continue;
                }

                let task = match app.input_mode {
                    InputMode::Normal => handle_normal_mode(app, store, key.code, key.modifiers),
                    InputMode::Command => handle_command_mode(app, store, key.code, key.modifiers),
                    InputMode::Filter => {
                        handle_filter_mode(app, store, key.code);
                        None
                    }
                    InputMode::Confirm => {
                        let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
                        if let Err(e) = app.confirm_delete(store, confirmed) {
                            app.set_error(format!("Failed to delete book: {}", e));
                        }
                        None
                    }
                };

                if let Some(task) = task {
                    run_editor_task(terminal, app, store, task, settings_path)?;
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle key events in normal mode
///
/// Returns an editor task when the key needs the external editor.
fn handle_normal_mode(
    app: &mut App,
    store: &mut Store,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Option<EditorTask> {
    // Clear status message on navigation keys
    if matches!(
        code,
        KeyCode::Char('j')
            | KeyCode::Char('k')
            | KeyCode::Up
            | KeyCode::Down
            | KeyCode::Char('h')
            | KeyCode::Char('l')
            | KeyCode::Left
            | KeyCode::Right
            | KeyCode::Tab
            | KeyCode::BackTab
            | KeyCode::Char('g')
            | KeyCode::Char('G')
    ) {
        app.status_message = None;
    }

    // Clear pending 'g' if timeout expired (500ms)
    if let Some(time) = app.pending_g {
        if time.elapsed() > Duration::from_millis(500) {
            app.pending_g = None;
        }
    }

    match code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(),
        KeyCode::Char('h') | KeyCode::Left => app.prev_pane(),
        KeyCode::Char('l') | KeyCode::Right => app.next_pane(),
        KeyCode::Tab => app.next_pane(),
        KeyCode::BackTab => app.prev_pane(),

        KeyCode::Enter => app.handle_enter(store),

        // Space: toggle accordion (when in filters pane on a header)
        KeyCode::Char(' ') if app.active_pane == app::ActivePane::Filters => {
            match app.current_filter() {
                Some(app::Filter::TagsHeader) => app.toggle_tags_accordion(),
                Some(app::Filter::SeriesHeader) => app.toggle_series_accordion(),
                _ => {}
            }
        }

        KeyCode::Char('a') => app.enter_command_mode(CommandType::Add),
        KeyCode::Char('t') => {
            if app.current_book().is_some() {
                app.enter_command_mode(CommandType::Tag);
            } else {
                app.set_status("No book selected");
            }
        }
        KeyCode::Char('e') => {
            if app.current_book().is_some() {
                return Some(EditorTask::EditBook);
            }
            app.set_status("No book selected");
        }
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Char('o') => app.open_current(store),
        KeyCode::Char('s') => app.cycle_sort(store),
        KeyCode::Char('r') => app.toggle_reverse(store),
        KeyCode::Char('S') => return Some(EditorTask::Settings),

        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Char(':') => app.enter_command_mode(CommandType::Generic),
        KeyCode::Char('?') => app.toggle_help(),

        // Vim navigation: G (go to last)
        KeyCode::Char('G') => {
            app.pending_g = None;
            app.move_to_last();
        }

        // Vim navigation: g (start of gg sequence)
        KeyCode::Char('g') => {
            if app.pending_g.is_some() {
                app.pending_g = None;
                app.move_to_first();
            } else {
                app.pending_g = Some(Instant::now());
            }
        }

        _ => {
            // Any other key clears pending 'g'
            app.pending_g = None;
        }
    }

    None
}

/// Handle key events in command mode
fn handle_command_mode(
    app: &mut App,
    store: &mut Store,
    code: KeyCode,
    modifiers: KeyModifiers,
) -> Option<EditorTask> {
    match code {
        KeyCode::Esc => app.exit_input_mode(),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.exit_input_mode();
        }

        KeyCode::Enter => match app.execute_command(store) {
            Ok(CommandResult::Done) => {}
            Ok(CommandResult::NeedEditor(task)) => return Some(task),
            Err(e) => app.set_error(format!("Command failed: {}", e)),
        },

        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),

        _ => {}
    }

    None
}

/// Handle key events in filter mode
fn handle_filter_mode(app: &mut App, store: &Store, code: KeyCode) {
    match code {
        // Cancel filter
        KeyCode::Esc => {
            app.exit_input_mode();
            app.clear_filter(store);
        }

        // Confirm filter (stay in filtered view)
        KeyCode::Enter => app.exit_input_mode(),

        KeyCode::Char(c) => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),

        _ => {}
    }
}

/// Run a task that needs the external editor
///
/// Editor and form errors are shown in the error modal; only terminal
/// failures are returned.
fn run_editor_task<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    store: &mut Store,
    task: EditorTask,
    settings_path: &Path,
) -> Result<()> {
    let outcome = match task {
        EditorTask::AddBook(path) => {
            let initial = BookForm::from_file_name(&path).render(&format!("Add {}", path.display()));
            with_editor(terminal, &initial)?
                .and_then(|content| BookForm::parse(&content))
                .and_then(|form| app.add_book(store, path, form))
        }
        EditorTask::EditBook => {
            let Some(book) = app.current_book() else {
                return Ok(());
            };
            let initial = BookForm::from_book(book).render("Edit Book");
            with_editor(terminal, &initial)?
                .and_then(|content| BookForm::parse(&content))
                .and_then(|form| app.save_edit(store, form))
        }
        EditorTask::Settings => edit_settings(terminal, app, settings_path)?,
    };

    if let Err(e) = outcome {
        warn!("Editor task failed: {:#}", e);
        app.set_error(format!("{:#}", e));
    }
    Ok(())
}

fn edit_settings<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    path: &Path,
) -> Result<Result<()>> {
    let mut file = match ConfigFile::load(path) {
        Ok(file) => file,
        Err(e) => return Ok(Err(e.into())),
    };

    let content = match with_editor(terminal, &render_settings(&file))? {
        Ok(content) => content,
        Err(e) => return Ok(Err(e)),
    };

    Ok(apply_settings(&content, &mut file).and_then(|changed| {
        if changed {
            file.save(path).context("Failed to save configuration")?;
            info!(path = %path.display(), "Settings saved");
            app.set_status("Settings saved; restart trove to apply");
        } else {
            app.set_status("No changes");
        }
        Ok(())
    }))
}

/// Leave the TUI, run the editor on `initial`, and come back
///
/// The outer result carries terminal failures, the inner one the
/// editor's.
fn with_editor<B: Backend>(terminal: &mut Terminal<B>, initial: &str) -> Result<Result<String>> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(cursor::Show)?;

    let result = editor::edit_text(initial);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    terminal.clear()?;

    Ok(result)
}
