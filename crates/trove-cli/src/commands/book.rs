//! Book command handlers

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;

use trove_core::integrity::expected_path;
use trove_core::metadata::MetadataFields;
use trove_core::models::{parse_tag_list, Book, ReadStatus, SortField};
use trove_core::store::sort_books;
use trove_core::{Ingestor, Store};

use crate::editor::{confirm, edit_text};
use crate::form::BookForm;
use crate::output::{short_id, Output};

/// Book fields settable from the command line
#[derive(Args, Debug, Clone, Default)]
pub struct BookFields {
    /// Title
    #[arg(short = 'T', long)]
    pub title: Option<String>,
    /// Author
    #[arg(short, long)]
    pub author: Option<String>,
    /// Comma-separated tags
    #[arg(short, long)]
    pub tags: Option<String>,
    /// Series name (empty to clear)
    #[arg(long)]
    pub series: Option<String>,
    /// Position within the series
    #[arg(long)]
    pub series_index: Option<f64>,
    /// Description (empty to clear)
    #[arg(short, long)]
    pub description: Option<String>,
    /// Reading status: unread, reading or read
    #[arg(short, long)]
    pub status: Option<ReadStatus>,
}

impl BookFields {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.tags.is_none()
            && self.series.is_none()
            && self.series_index.is_none()
            && self.description.is_none()
            && self.status.is_none()
    }

    /// Overwrite the form fields that were given
    pub fn apply_to(&self, form: &mut BookForm) {
        if let Some(ref title) = self.title {
            form.title = title.trim().to_string();
        }
        if let Some(ref author) = self.author {
            form.author = author.trim().to_string();
        }
        if let Some(ref tags) = self.tags {
            form.tags = parse_tag_list(tags);
        }
        if let Some(ref series) = self.series {
            form.series = Some(series.trim().to_string()).filter(|s| !s.is_empty());
        }
        if self.series_index.is_some() {
            form.series_index = self.series_index;
        }
        if let Some(ref desc) = self.description {
            form.description = Some(desc.trim().to_string()).filter(|d| !d.is_empty());
        }
        if let Some(status) = self.status {
            form.read_status = status;
        }
    }
}

/// Filters and ordering for `list`
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only books with this tag
    #[arg(short, long)]
    pub tag: Option<String>,
    /// Only books by this author
    #[arg(short, long)]
    pub author: Option<String>,
    /// Only books in this series
    #[arg(long)]
    pub series: Option<String>,
    /// Only books with this reading status
    #[arg(short, long)]
    pub status: Option<ReadStatus>,
    /// Sort field: added, author, title or read
    #[arg(long, default_value = "added")]
    pub sort: SortField,
    /// Reverse the sort order
    #[arg(short, long)]
    pub reverse: bool,
}

/// Add a file to the library
///
/// Fields not given on the command line are taken from the file name.
/// With `--edit`, or when title or author are still missing on an
/// interactive terminal, the add form is opened in the editor.
pub fn add(
    store: &mut Store,
    path: PathBuf,
    fields: BookFields,
    edit: bool,
    output: &Output,
) -> Result<()> {
    let mut form = BookForm::from_file_name(&path);
    fields.apply_to(&mut form);

    let incomplete = form.title.is_empty() || form.author.is_empty();
    if edit || (incomplete && output.should_prompt() && atty::is(atty::Stream::Stdin)) {
        let content = edit_text(&form.render(&format!("Add {}", path.display())))?;
        form = BookForm::parse(&content)?;
    } else if incomplete {
        bail!(
            "Title and author are required. Pass --title and --author, \
             or name the file \"Title - Author.pdf\"."
        );
    }

    let ingestor = Ingestor::new(store.config());
    let book = ingestor
        .ingest(store, form.into_request(path))
        .context("Failed to add book")?;

    output.success(&format!("Added book: {}", book.uuid));
    if book.metadata.is_failed() {
        output.message(&format!("Warning: {}", book.metadata));
    }
    output.print_book(&book, &store.get_all_tags());

    Ok(())
}

/// List books, optionally filtered
pub fn list(store: &Store, args: ListArgs, output: &Output) -> Result<()> {
    let mut books = store.get_all_books();

    if let Some(ref tag) = args.tag {
        books.retain(|b| b.tags.iter().any(|t| t == tag));
    }
    if let Some(ref author) = args.author {
        books.retain(|b| b.author.eq_ignore_ascii_case(author));
    }
    if let Some(ref series) = args.series {
        books.retain(|b| b.series.as_ref().is_some_and(|s| &s.name == series));
    }
    if let Some(status) = args.status {
        books.retain(|b| b.read_status == status);
    }
    sort_books(&mut books, args.sort, args.reverse);

    output.print_books(&books);
    Ok(())
}

/// Show a single book
pub fn show(store: &Store, id: String, output: &Output) -> Result<()> {
    let book = resolve_book(store, &id)?;
    output.print_book(&book, &store.get_all_tags());
    Ok(())
}

/// Search books by title or author
pub fn search(store: &Store, query: String, output: &Output) -> Result<()> {
    let books = store.search_books(&query);
    output.print_books(&books);
    Ok(())
}

/// Edit a book
///
/// Without field flags the edit form is opened in the editor.
pub fn edit(store: &mut Store, id: String, fields: BookFields, output: &Output) -> Result<()> {
    let original = resolve_book(store, &id)?;

    let form = if fields.is_empty() {
        let content = edit_text(&BookForm::from_book(&original).render("Edit Book"))?;
        BookForm::parse(&content)?
    } else {
        let mut form = BookForm::from_book(&original);
        fields.apply_to(&mut form);
        form
    };

    let mut book = original.clone();
    if !form.apply_to(&mut book) {
        output.message("No changes.");
        return Ok(());
    }

    save_book(store, &original, &mut book)?;

    output.success("Book updated");
    if book.metadata.is_failed() {
        output.message(&format!("Warning: {}", book.metadata));
    }
    output.print_book(&book, &store.get_all_tags());
    Ok(())
}

/// Delete a book and its files
pub fn delete(store: &mut Store, id: String, yes: bool, output: &Output) -> Result<()> {
    let book = resolve_book(store, &id)?;

    if !yes {
        if !output.should_prompt() {
            bail!("Refusing to delete without confirmation. Pass --yes.");
        }
        println!(
            "Delete book: {} - {} ({})",
            short_id(&book.uuid),
            book.title,
            book.file_path.display()
        );
        if !confirm("The record and its files will be removed. Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let (book, removed) = store
        .delete_book_with_files(book.uuid)
        .context("Failed to delete book")?;

    output.success(&format!(
        "Deleted book: {} ({} file(s) removed)",
        book.uuid,
        removed.len()
    ));
    Ok(())
}

/// Open a book's file with the default application
pub fn open(store: &Store, id: String, output: &Output) -> Result<()> {
    let book = resolve_book(store, &id)?;
    let path = open_book(store, &book)?;
    output.success(&format!("Opened {}", path.display()));
    Ok(())
}

/// Set a book's reading status
pub fn read(store: &mut Store, id: String, status: ReadStatus, output: &Output) -> Result<()> {
    let mut book = resolve_book(store, &id)?;
    book.set_read_status(status);
    store.update_book(&book).context("Failed to update book")?;

    output.success(&format!("'{}' marked {}", book.title, status));
    Ok(())
}

/// Persist an edited book
///
/// When a field that is embedded in the file changed, the file's
/// metadata is rewritten and the outcome recorded on the book.
pub fn save_book(store: &mut Store, original: &Book, book: &mut Book) -> Result<()> {
    let embedded_changed = original.title != book.title
        || original.author != book.author
        || original.tags != book.tags
        || original.description != book.description;

    if embedded_changed {
        let ingestor = Ingestor::new(store.config());
        let fields = MetadataFields {
            title: book.title.clone(),
            author: book.author.clone(),
            keywords: book.tags.clone(),
            description: book.description.clone(),
        };
        book.metadata = ingestor.write_metadata(&book.file_path, &fields);
    }

    store.update_book(book).context("Failed to update book")?;
    Ok(())
}

/// Open the book's primary file without waiting for the viewer
pub fn open_book(store: &Store, book: &Book) -> Result<PathBuf> {
    let path = expected_path(book, store.library_root()).map_err(|reason| anyhow!(reason))?;
    if !path.is_file() {
        bail!("File not found: {}", path.display());
    }
    open::that_detached(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(path)
}

/// Resolve a book ID (full UUID or prefix)
pub fn resolve_book(store: &Store, id: &str) -> Result<Book> {
    if let Some(book) = store.find_book(id) {
        return Ok(book);
    }

    let prefix = id.to_lowercase();
    let matches: Vec<Book> = store
        .get_all_books()
        .into_iter()
        .filter(|b| b.uuid.to_string().starts_with(&prefix))
        .collect();

    if matches.len() > 1 {
        eprintln!("Multiple books match '{}':", id);
        for book in &matches {
            eprintln!("  {} - {}", book.uuid, book.title);
        }
        bail!("Ambiguous ID. Please provide more characters.");
    }
    bail!("No book found matching: {}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_core::Config;
    use tempfile::TempDir;

    fn store(temp: &TempDir) -> Store {
        Store::open_with_config(Config::with_library(temp.path())).unwrap()
    }

    #[test]
    fn test_fields_apply_to_form() {
        let mut form = BookForm::from_file_name(std::path::Path::new("Summa - Tommaso.pdf"));
        let fields = BookFields {
            tags: Some("Teologia, Filosofia".to_string()),
            series: Some(" ".to_string()),
            status: Some(ReadStatus::Reading),
            ..BookFields::default()
        };
        assert!(!fields.is_empty());
        fields.apply_to(&mut form);

        assert_eq!(form.title, "Summa");
        assert_eq!(form.tags, vec!["Teologia".to_string(), "Filosofia".to_string()]);
        assert_eq!(form.series, None);
        assert_eq!(form.read_status, ReadStatus::Reading);
        assert!(BookFields::default().is_empty());
    }

    #[test]
    fn test_resolve_book() {
        let temp = TempDir::new().unwrap();
        let mut store = store(&temp);
        let book = Book::new("T", "A", "A/T - A.pdf");
        store.add_book(&book).unwrap();

        assert_eq!(
            resolve_book(&store, &book.uuid.to_string()).unwrap().uuid,
            book.uuid
        );
        assert_eq!(
            resolve_book(&store, &book.uuid.to_string()[..6]).unwrap().uuid,
            book.uuid
        );
        assert!(resolve_book(&store, "zzzz").is_err());
    }

    #[test]
    fn test_save_book_updates_record() {
        let temp = TempDir::new().unwrap();
        let mut store = store(&temp);
        std::fs::create_dir_all(temp.path().join("A")).unwrap();
        std::fs::write(temp.path().join("A/T - A.pdf"), b"pdf").unwrap();

        let original = Book::new("T", "A", "A/T - A.pdf");
        store.add_book(&original).unwrap();

        let mut edited = original.clone();
        edited.set_read_status(ReadStatus::Read);
        save_book(&mut store, &original, &mut edited).unwrap();
        assert_eq!(edited.metadata, original.metadata);

        let mut retitled = edited.clone();
        retitled.set_title("T2");
        save_book(&mut store, &edited, &mut retitled).unwrap();
        assert_eq!(
            store.get_book(original.uuid).unwrap().metadata,
            retitled.metadata
        );
        assert_eq!(store.get_book(original.uuid).unwrap().title, "T2");
    }

    #[test]
    fn test_open_book_missing_file() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let book = Book::new("T", "A", "A/missing.pdf");
        assert!(open_book(&store, &book).is_err());
    }
}
