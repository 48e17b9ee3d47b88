//! Application state and logic

use std::path::PathBuf;
use std::time::{Duration, Instant};

use trove_core::models::{parse_tag_list, Book, ReadStatus, SortField, Tag};
use trove_core::store::sort_books;
use trove_core::{Ingestor, Store};

use crate::commands::book::{open_book, save_book};
use crate::form::BookForm;

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Command input mode (after pressing : or command key)
    Command,
    /// Filter/search mode (after pressing /)
    Filter,
    /// Waiting for y/n on a delete
    Confirm,
}

/// Type of command being entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandType {
    /// Generic command starting with :
    Generic,
    /// Add a file
    Add,
    /// Edit tags on selected book
    Tag,
}

/// Which pane has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    Filters,
    Items,
    Detail,
}

impl ActivePane {
    /// Move to the next pane (wrapping)
    pub fn next(self) -> Self {
        match self {
            ActivePane::Filters => ActivePane::Items,
            ActivePane::Items => ActivePane::Detail,
            ActivePane::Detail => ActivePane::Filters,
        }
    }

    /// Move to the previous pane (wrapping)
    pub fn prev(self) -> Self {
        match self {
            ActivePane::Filters => ActivePane::Detail,
            ActivePane::Items => ActivePane::Filters,
            ActivePane::Detail => ActivePane::Items,
        }
    }
}

/// Smart filter options in the left pane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Recent,
    Unread,
    Reading,
    Read,
    /// The "By Tag..." accordion header
    TagsHeader,
    ByTag(String),
    /// The "By Series..." accordion header
    SeriesHeader,
    BySeries(String),
}

/// Result of command execution
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Command completed
    Done,
    /// Need to open the editor
    NeedEditor(EditorTask),
}

/// Type of editor task
#[derive(Debug, PartialEq)]
pub enum EditorTask {
    /// Fill in the add form for a file
    AddBook(PathBuf),
    /// Edit the selected book
    EditBook,
    /// Edit the settings
    Settings,
}

/// How long a status message stays visible
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// Type of command being entered
    pub command_type: Option<CommandType>,
    /// Command input buffer
    pub command_input: String,
    /// Cursor position in command input, in characters
    pub command_cursor: usize,
    /// Which pane has focus
    pub active_pane: ActivePane,
    /// Available filters (includes expanded tags and series)
    pub filters: Vec<Filter>,
    /// Currently selected filter index
    pub filter_index: usize,
    pub tags_expanded: bool,
    pub series_expanded: bool,
    /// Tag definitions, for icons
    pub tag_defs: Vec<Tag>,
    /// Every tag name in use
    pub all_tags: Vec<String>,
    pub all_series: Vec<String>,
    /// Books selected by the current filter, before the live filter
    base_books: Vec<Book>,
    /// Books shown in the middle pane
    pub books: Vec<Book>,
    /// Currently selected book index
    pub book_index: usize,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Error shown in a modal until a key is pressed
    pub error_message: Option<String>,
    /// Filter text for real-time filtering
    pub filter_text: String,
    /// Scroll offset for detail pane
    pub detail_scroll: u16,
    /// Whether help overlay is visible
    pub show_help: bool,
    /// Pending 'g' keypress for gg sequence (with timestamp)
    pub pending_g: Option<Instant>,
    pub sort_field: SortField,
    pub sort_reverse: bool,
    /// Book waiting for delete confirmation
    pub pending_delete: Option<Book>,
    /// Directory the add prompt starts from
    pub upload_dir: PathBuf,
}

impl App {
    /// Create a new app with data from store
    pub fn new(store: &Store) -> Self {
        let mut app = Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            command_type: None,
            command_input: String::new(),
            command_cursor: 0,
            active_pane: ActivePane::Items,
            filters: Vec::new(),
            filter_index: 0, // Start on "All"
            tags_expanded: false,
            series_expanded: false,
            tag_defs: Vec::new(),
            all_tags: Vec::new(),
            all_series: Vec::new(),
            base_books: Vec::new(),
            books: Vec::new(),
            book_index: 0,
            status_message: None,
            status_message_time: None,
            error_message: None,
            filter_text: String::new(),
            detail_scroll: 0,
            show_help: false,
            pending_g: None,
            sort_field: SortField::default(),
            sort_reverse: false,
            pending_delete: None,
            upload_dir: store.config().upload_dir_path.clone(),
        };
        app.refresh(store);
        app
    }

    /// Rebuild filters list based on expanded state
    fn rebuild_filters(&mut self) {
        let mut filters = vec![
            Filter::All,
            Filter::Recent,
            Filter::Unread,
            Filter::Reading,
            Filter::Read,
        ];

        if !self.all_tags.is_empty() {
            filters.push(Filter::TagsHeader);
            if self.tags_expanded {
                filters.extend(self.all_tags.iter().cloned().map(Filter::ByTag));
            }
        }

        if !self.all_series.is_empty() {
            filters.push(Filter::SeriesHeader);
            if self.series_expanded {
                filters.extend(self.all_series.iter().cloned().map(Filter::BySeries));
            }
        }

        self.filters = filters;
        self.filter_index = self.filter_index.min(self.filters.len() - 1);
    }

    pub fn toggle_tags_accordion(&mut self) {
        self.tags_expanded = !self.tags_expanded;
        self.rebuild_filters();
    }

    pub fn toggle_series_accordion(&mut self) {
        self.series_expanded = !self.series_expanded;
        self.rebuild_filters();
    }

    /// Get the currently selected filter
    pub fn current_filter(&self) -> Option<&Filter> {
        self.filters.get(self.filter_index)
    }

    /// Set a status message (will auto-dismiss after 3 seconds)
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Get the currently selected book
    pub fn current_book(&self) -> Option<&Book> {
        self.books.get(self.book_index)
    }

    /// Move selection up in the current pane
    pub fn move_up(&mut self) {
        match self.active_pane {
            ActivePane::Filters => {
                self.filter_index = self.filter_index.saturating_sub(1);
            }
            ActivePane::Items => {
                if self.book_index > 0 {
                    self.book_index -= 1;
                    self.detail_scroll = 0;
                }
            }
            ActivePane::Detail => {
                self.detail_scroll = self.detail_scroll.saturating_sub(1);
            }
        }
    }

    /// Move selection down in the current pane
    pub fn move_down(&mut self) {
        match self.active_pane {
            ActivePane::Filters => {
                if self.filter_index < self.filters.len().saturating_sub(1) {
                    self.filter_index += 1;
                }
            }
            ActivePane::Items => {
                if self.book_index < self.books.len().saturating_sub(1) {
                    self.book_index += 1;
                    self.detail_scroll = 0;
                }
            }
            ActivePane::Detail => {
                self.detail_scroll = self.detail_scroll.saturating_add(1);
            }
        }
    }

    /// Move selection to first item in the current pane (vim 'gg')
    pub fn move_to_first(&mut self) {
        match self.active_pane {
            ActivePane::Filters => self.filter_index = 0,
            ActivePane::Items => {
                self.book_index = 0;
                self.detail_scroll = 0;
            }
            ActivePane::Detail => self.detail_scroll = 0,
        }
    }

    /// Move selection to last item in the current pane (vim 'G')
    pub fn move_to_last(&mut self) {
        match self.active_pane {
            ActivePane::Filters => {
                self.filter_index = self.filters.len().saturating_sub(1);
            }
            ActivePane::Items => {
                self.book_index = self.books.len().saturating_sub(1);
                self.detail_scroll = 0;
            }
            ActivePane::Detail => {
                // Clamped to the content when rendering
                self.detail_scroll = u16::MAX;
            }
        }
    }

    /// Move focus to the next pane
    pub fn next_pane(&mut self) {
        self.active_pane = self.active_pane.next();
    }

    /// Move focus to the previous pane
    pub fn prev_pane(&mut self) {
        self.active_pane = self.active_pane.prev();
    }

    /// Handle Enter key in current pane
    pub fn handle_enter(&mut self, store: &Store) {
        match self.active_pane {
            ActivePane::Filters => match self.current_filter() {
                Some(Filter::TagsHeader) => self.toggle_tags_accordion(),
                Some(Filter::SeriesHeader) => self.toggle_series_accordion(),
                _ => {
                    self.filter_text.clear();
                    self.apply_filter(store);
                    self.active_pane = ActivePane::Items;
                }
            },
            ActivePane::Items => self.open_current(store),
            ActivePane::Detail => {}
        }
    }

    /// Open the selected book with the default application
    pub fn open_current(&mut self, store: &Store) {
        let Some(book) = self.current_book().cloned() else {
            self.set_status("No book selected");
            return;
        };
        match open_book(store, &book) {
            Ok(_) => self.set_status(format!("Opened '{}'", book.title)),
            Err(e) => self.set_status(format!("Failed to open: {}", e)),
        }
    }

    /// Apply the currently selected filter
    pub fn apply_filter(&mut self, store: &Store) {
        let filter = self.current_filter().cloned();

        self.base_books = match filter {
            Some(Filter::All) | None => self.sorted(store.get_all_books()),
            Some(Filter::Recent) => {
                let mut books = store.get_all_books();
                books.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                books
            }
            Some(Filter::Unread) => self.sorted(store.get_books_by_status(ReadStatus::Unread)),
            Some(Filter::Reading) => self.sorted(store.get_books_by_status(ReadStatus::Reading)),
            Some(Filter::Read) => self.sorted(store.get_books_by_status(ReadStatus::Read)),
            Some(Filter::TagsHeader) | Some(Filter::SeriesHeader) => {
                // Headers don't filter, they only toggle their accordion
                return;
            }
            Some(Filter::ByTag(tag)) => self.sorted(store.get_books_by_tag(&tag)),
            // Series keep their reading order
            Some(Filter::BySeries(series)) => store.get_books_by_series(&series),
        };

        self.apply_realtime_filter();
    }

    fn sorted(&self, mut books: Vec<Book>) -> Vec<Book> {
        sort_books(&mut books, self.sort_field, self.sort_reverse);
        books
    }

    /// Refresh data from store
    pub fn refresh(&mut self, store: &Store) {
        self.tag_defs = store.get_all_tags();
        self.all_tags = store.tag_names();
        self.all_series = store.series_names();
        self.rebuild_filters();
        self.apply_filter(store);
    }

    /// Switch to the next sort field
    pub fn cycle_sort(&mut self, store: &Store) {
        self.sort_field = self.sort_field.next();
        self.apply_filter(store);
        self.set_status(format!("Sorted by {}", self.sort_label()));
    }

    /// Flip the sort direction
    pub fn toggle_reverse(&mut self, store: &Store) {
        self.sort_reverse = !self.sort_reverse;
        self.apply_filter(store);
        self.set_status(format!("Sorted by {}", self.sort_label()));
    }

    pub fn sort_label(&self) -> String {
        if self.sort_reverse {
            format!("{} (reversed)", self.sort_field)
        } else {
            self.sort_field.to_string()
        }
    }

    /// Enter command mode with a specific command type
    pub fn enter_command_mode(&mut self, cmd_type: CommandType) {
        self.input_mode = InputMode::Command;
        self.command_input = match cmd_type {
            CommandType::Add => {
                if self.upload_dir.as_os_str().is_empty() || self.upload_dir == PathBuf::from(".")
                {
                    "add ".to_string()
                } else {
                    format!("add {}/", self.upload_dir.display())
                }
            }
            CommandType::Tag => match self.current_book() {
                Some(book) => format!("tag {}", book.tags.join(", ")),
                None => "tag ".to_string(),
            },
            CommandType::Generic => String::new(),
        };
        self.command_cursor = self.command_input.chars().count();
        self.command_type = Some(cmd_type);
    }

    /// Enter filter mode
    pub fn enter_filter_mode(&mut self) {
        self.input_mode = InputMode::Filter;
        self.filter_text.clear();
        self.command_input.clear();
        self.command_cursor = 0;
    }

    /// Exit command/filter/confirm mode
    pub fn exit_input_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.command_type = None;
        self.command_input.clear();
        self.command_cursor = 0;
    }

    /// Clear filter and show all items of the current filter
    pub fn clear_filter(&mut self, store: &Store) {
        self.filter_text.clear();
        self.apply_filter(store);
    }

    /// Narrow the current view to books matching the filter text
    ///
    /// Matches title, author, tags and series, case-insensitively.
    pub fn apply_realtime_filter(&mut self) {
        let needle = self.filter_text.to_lowercase();
        self.books = if needle.is_empty() {
            self.base_books.clone()
        } else {
            self.base_books
                .iter()
                .filter(|book| {
                    book.title.to_lowercase().contains(&needle)
                        || book.author.to_lowercase().contains(&needle)
                        || book.tags.iter().any(|t| t.to_lowercase().contains(&needle))
                        || book
                            .series
                            .as_ref()
                            .is_some_and(|s| s.name.to_lowercase().contains(&needle))
                })
                .cloned()
                .collect()
        };

        if self.books.is_empty() {
            self.book_index = 0;
        } else {
            self.book_index = self.book_index.min(self.books.len() - 1);
        }
    }

    /// Byte offset of the cursor in the command input
    fn cursor_byte(&self) -> usize {
        self.command_input
            .char_indices()
            .nth(self.command_cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.command_input.len())
    }

    /// Insert character at cursor position
    pub fn insert_char(&mut self, c: char) {
        let at = self.cursor_byte();
        self.command_input.insert(at, c);
        self.command_cursor += 1;

        if self.input_mode == InputMode::Filter {
            self.filter_text = self.command_input.clone();
            self.apply_realtime_filter();
        }
    }

    /// Delete character before cursor
    pub fn delete_char(&mut self) {
        if self.command_cursor > 0 {
            self.command_cursor -= 1;
            let at = self.cursor_byte();
            self.command_input.remove(at);

            if self.input_mode == InputMode::Filter {
                self.filter_text = self.command_input.clone();
                self.apply_realtime_filter();
            }
        }
    }

    /// Move cursor left
    pub fn cursor_left(&mut self) {
        self.command_cursor = self.command_cursor.saturating_sub(1);
    }

    /// Move cursor right
    pub fn cursor_right(&mut self) {
        if self.command_cursor < self.command_input.chars().count() {
            self.command_cursor += 1;
        }
    }

    /// Ask for confirmation before deleting the selected book
    pub fn request_delete(&mut self) {
        match self.current_book().cloned() {
            Some(book) => {
                self.pending_delete = Some(book);
                self.input_mode = InputMode::Confirm;
            }
            None => self.set_status("No book selected"),
        }
    }

    /// Answer the delete confirmation
    pub fn confirm_delete(&mut self, store: &mut Store, confirmed: bool) -> anyhow::Result<()> {
        self.input_mode = InputMode::Normal;
        let Some(book) = self.pending_delete.take() else {
            return Ok(());
        };

        if !confirmed {
            self.set_status("Delete cancelled");
            return Ok(());
        }

        let saved_index = self.book_index;
        let (book, removed) = store.delete_book_with_files(book.uuid)?;
        self.set_status(format!(
            "Deleted '{}' ({} file(s) removed)",
            book.title,
            removed.len()
        ));
        self.refresh(store);
        if !self.books.is_empty() {
            self.book_index = saved_index.min(self.books.len() - 1);
        }
        Ok(())
    }

    /// Ingest a file with the fields from the add form
    pub fn add_book(&mut self, store: &mut Store, path: PathBuf, form: BookForm) -> anyhow::Result<()> {
        let ingestor = Ingestor::new(store.config());
        let book = ingestor.ingest(store, form.into_request(path))?;

        if book.metadata.is_failed() {
            self.set_status(format!("Added '{}' ({})", book.title, book.metadata));
        } else {
            self.set_status(format!("Added '{}'", book.title));
        }
        self.refresh(store);
        self.select_book(&book);
        Ok(())
    }

    /// Apply the edit form to the selected book
    pub fn save_edit(&mut self, store: &mut Store, form: BookForm) -> anyhow::Result<()> {
        let Some(original) = self.current_book().cloned() else {
            self.set_status("No book selected");
            return Ok(());
        };

        let mut book = original.clone();
        if !form.apply_to(&mut book) {
            self.set_status("No changes");
            return Ok(());
        }

        save_book(store, &original, &mut book)?;
        self.set_status("Book updated");
        self.refresh(store);
        self.select_book(&book);
        Ok(())
    }

    fn select_book(&mut self, book: &Book) {
        if let Some(index) = self.books.iter().position(|b| b.uuid == book.uuid) {
            self.book_index = index;
            self.detail_scroll = 0;
        }
    }

    /// Replace the tags on the selected book
    pub fn update_tags(&mut self, store: &mut Store, tags_str: &str) -> anyhow::Result<()> {
        let Some(original) = self.current_book().cloned() else {
            self.set_status("No book selected");
            return Ok(());
        };

        let mut book = original.clone();
        book.set_tags(parse_tag_list(tags_str));
        save_book(store, &original, &mut book)?;
        self.set_status("Tags updated");
        self.refresh(store);
        Ok(())
    }

    /// Change the reading status of the selected book
    pub fn set_read_status(&mut self, store: &mut Store, status: ReadStatus) -> anyhow::Result<()> {
        let Some(mut book) = self.current_book().cloned() else {
            self.set_status("No book selected");
            return Ok(());
        };

        book.set_read_status(status);
        store.update_book(&book)?;
        self.set_status(format!("'{}' marked {}", book.title, status));
        self.refresh(store);
        Ok(())
    }

    /// Search all books by title or author
    pub fn search(&mut self, store: &Store, query: &str) {
        if query.is_empty() {
            self.apply_filter(store);
            return;
        }
        self.base_books = store.search_books(query);
        self.filter_text.clear();
        self.apply_realtime_filter();
        self.book_index = 0;
        self.set_status(format!("Found {} results", self.books.len()));
    }

    /// Parse and execute the command in the input buffer
    pub fn execute_command(&mut self, store: &mut Store) -> anyhow::Result<CommandResult> {
        let input = self.command_input.trim().to_string();
        self.exit_input_mode();

        let (cmd, arg) = match input.split_once(' ') {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (input.as_str(), ""),
        };

        match cmd {
            "" => {}
            "add" => {
                let path = PathBuf::from(unquote(arg));
                if arg.is_empty() {
                    self.set_status("Usage: add <path>");
                } else if !path.is_file() {
                    self.set_status(format!("Not a file: {}", path.display()));
                } else {
                    return Ok(CommandResult::NeedEditor(EditorTask::AddBook(path)));
                }
            }
            "tag" | "tags" => self.update_tags(store, arg)?,
            "search" => self.search(store, arg),
            "read" | "reading" | "unread" => {
                let status: ReadStatus = cmd.parse().map_err(anyhow::Error::msg)?;
                self.set_read_status(store, status)?;
            }
            "edit" => return Ok(CommandResult::NeedEditor(EditorTask::EditBook)),
            "settings" => return Ok(CommandResult::NeedEditor(EditorTask::Settings)),
            "delete" | "d" => self.request_delete(),
            "sort" => match arg.parse::<SortField>() {
                Ok(field) => {
                    self.sort_field = field;
                    self.apply_filter(store);
                    self.set_status(format!("Sorted by {}", self.sort_label()));
                }
                Err(e) => self.set_status(e),
            },
            "help" => self.show_help = true,
            "q" | "quit" => self.should_quit = true,
            other => self.set_status(format!("Unknown command: {}", other)),
        }

        Ok(CommandResult::Done)
    }
}

/// Strip one pair of matching quotes, as terminals add on drag and drop
fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use trove_core::models::Series;
    use trove_core::Config;

    fn setup() -> (TempDir, Store) {
        let temp = TempDir::new().unwrap();
        let mut store = Store::open_with_config(Config::with_library(temp.path())).unwrap();

        let mut rosa = Book::new("Il nome della rosa", "Umberto Eco", "Umberto Eco/rosa.pdf");
        rosa.set_tags(vec!["Letteratura".to_string()]);
        store.add_book(&rosa).unwrap();

        let mut summa = Book::new("Summa", "Tommaso d'Aquino", "Tommaso dAquino/summa.pdf");
        summa.set_read_status(ReadStatus::Read);
        summa.set_series(Some(Series::new("Opere", Some(1.0))));
        store.add_book(&summa).unwrap();

        store
            .add_book(&Book::new("Abelardo", "Pietro", "Pietro/abelardo.pdf"))
            .unwrap();

        (temp, store)
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.insert_char(c);
        }
    }

    #[test]
    fn test_active_pane_cycle() {
        assert_eq!(ActivePane::Filters.next(), ActivePane::Items);
        assert_eq!(ActivePane::Detail.next(), ActivePane::Filters);
        assert_eq!(ActivePane::Filters.prev(), ActivePane::Detail);
        assert_eq!(ActivePane::Items.prev(), ActivePane::Filters);
    }

    #[test]
    fn test_filters_and_accordions() {
        let (_temp, store) = setup();
        let mut app = App::new(&store);

        assert_eq!(app.books.len(), 3);
        assert_eq!(app.filters.len(), 7);
        assert_eq!(app.filters[5], Filter::TagsHeader);
        assert_eq!(app.filters[6], Filter::SeriesHeader);

        app.toggle_tags_accordion();
        assert_eq!(app.filters[6], Filter::ByTag("Letteratura".to_string()));
        app.toggle_series_accordion();
        assert_eq!(
            app.filters.last(),
            Some(&Filter::BySeries("Opere".to_string()))
        );
    }

    #[test]
    fn test_status_filters() {
        let (_temp, store) = setup();
        let mut app = App::new(&store);

        app.filter_index = app.filters.iter().position(|f| *f == Filter::Read).unwrap();
        app.apply_filter(&store);
        assert_eq!(app.books.len(), 1);
        assert_eq!(app.books[0].title, "Summa");

        app.filter_index = app.filters.iter().position(|f| *f == Filter::Unread).unwrap();
        app.apply_filter(&store);
        assert_eq!(app.books.len(), 2);
    }

    #[test]
    fn test_live_filter() {
        let (_temp, store) = setup();
        let mut app = App::new(&store);

        app.enter_filter_mode();
        type_str(&mut app, "eco");
        assert_eq!(app.books.len(), 1);
        assert_eq!(app.books[0].author, "Umberto Eco");

        app.delete_char();
        app.delete_char();
        app.delete_char();
        assert_eq!(app.books.len(), 3);

        type_str(&mut app, "lettera");
        assert_eq!(app.books.len(), 1);

        app.exit_input_mode();
        app.clear_filter(&store);
        assert_eq!(app.books.len(), 3);
    }

    #[test]
    fn test_multibyte_input() {
        let (_temp, store) = setup();
        let mut app = App::new(&store);

        app.enter_command_mode(CommandType::Generic);
        type_str(&mut app, "sà");
        app.cursor_left();
        app.insert_char('é');
        assert_eq!(app.command_input, "séà");
        app.cursor_right();
        app.delete_char();
        assert_eq!(app.command_input, "sé");
    }

    #[test]
    fn test_sorting() {
        let (_temp, store) = setup();
        let mut app = App::new(&store);

        app.sort_field = SortField::Added;
        app.cycle_sort(&store);
        assert_eq!(app.sort_field, SortField::Author);
        app.cycle_sort(&store);
        assert_eq!(app.sort_field, SortField::Title);
        assert_eq!(app.books[0].title, "Abelardo");

        app.toggle_reverse(&store);
        assert_eq!(app.books[0].title, "Summa");
    }

    #[test]
    fn test_tag_and_read_commands() {
        let (_temp, mut store) = setup();
        let mut app = App::new(&store);
        let uuid = app.current_book().unwrap().uuid;

        app.enter_command_mode(CommandType::Generic);
        type_str(&mut app, "tag Storia, Filosofia");
        assert_eq!(app.execute_command(&mut store).unwrap(), CommandResult::Done);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(
            store.get_book(uuid).unwrap().tags,
            vec!["Storia".to_string(), "Filosofia".to_string()]
        );

        app.book_index = app.books.iter().position(|b| b.uuid == uuid).unwrap();
        app.enter_command_mode(CommandType::Generic);
        type_str(&mut app, "reading");
        app.execute_command(&mut store).unwrap();
        assert_eq!(store.get_book(uuid).unwrap().read_status, ReadStatus::Reading);
    }

    #[test]
    fn test_unknown_command_and_add_prompt() {
        let (temp, mut store) = setup();
        let mut app = App::new(&store);

        app.enter_command_mode(CommandType::Generic);
        type_str(&mut app, "frobnicate");
        app.execute_command(&mut store).unwrap();
        assert_eq!(
            app.status_message.as_deref(),
            Some("Unknown command: frobnicate")
        );

        app.enter_command_mode(CommandType::Add);
        assert_eq!(app.command_input, "add ");
        type_str(&mut app, "missing.pdf");
        assert_eq!(app.execute_command(&mut store).unwrap(), CommandResult::Done);

        let file = temp.path().join("Nuovo - Autore.pdf");
        fs::write(&file, b"pdf").unwrap();
        app.enter_command_mode(CommandType::Add);
        type_str(&mut app, &format!("'{}'", file.display()));
        assert_eq!(
            app.execute_command(&mut store).unwrap(),
            CommandResult::NeedEditor(EditorTask::AddBook(file))
        );
    }

    #[test]
    fn test_add_book_from_form() {
        let (temp, mut store) = setup();
        let mut app = App::new(&store);

        let file = temp.path().join("incoming.pdf");
        fs::write(&file, b"pdf").unwrap();
        let form = BookForm {
            title: "Nuovo".to_string(),
            author: "Autore".to_string(),
            ..BookForm::default()
        };

        app.add_book(&mut store, file, form).unwrap();
        assert_eq!(store.book_count(), 4);
        assert_eq!(app.current_book().unwrap().title, "Nuovo");
        assert!(temp
            .path()
            .join(&app.current_book().unwrap().file_path)
            .is_file());
    }

    #[test]
    fn test_delete_needs_confirmation() {
        let (_temp, mut store) = setup();
        let mut app = App::new(&store);

        app.request_delete();
        assert_eq!(app.input_mode, InputMode::Confirm);
        app.confirm_delete(&mut store, false).unwrap();
        assert_eq!(store.book_count(), 3);
        assert_eq!(app.input_mode, InputMode::Normal);

        app.request_delete();
        app.confirm_delete(&mut store, true).unwrap();
        assert_eq!(store.book_count(), 2);
        assert_eq!(app.books.len(), 2);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'/a b/c.pdf'"), "/a b/c.pdf");
        assert_eq!(unquote("\"/a.pdf\""), "/a.pdf");
        assert_eq!(unquote("/a.pdf"), "/a.pdf");
    }
}
