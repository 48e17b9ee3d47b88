//! Filename and directory name derivation
//!
//! Books live at `<library>/<author dir>/<title> - <author dir>.<ext>`.
//! The helpers here turn free-form titles and author names into
//! components that are valid on every common filesystem.

use std::path::{Path, PathBuf};

/// Characters that are invalid in Windows file names
const INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Directory name used when an author sanitizes to nothing
pub const UNNAMED_AUTHOR_DIR: &str = "_unnamed_author_";

/// Title used when a title sanitizes to nothing
const UNKNOWN_TITLE: &str = "Unknown Title";

/// Collapse runs of whitespace to single spaces and trim
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turn an author name into a directory name
///
/// - `AA.VV.` (Italian "various authors") becomes `AAVV`
/// - apostrophes are dropped (`d'Aquino` -> `dAquino`)
/// - dots become spaces (`J.R.R. Tolkien` -> `J R R Tolkien`)
/// - filesystem-invalid characters are removed
/// - whitespace is collapsed
pub fn sanitize_author(author: &str) -> String {
    if author.trim().eq_ignore_ascii_case("AA.VV.") {
        return "AAVV".to_string();
    }

    let cleaned: String = author
        .chars()
        .filter(|c| *c != '\'' && *c != '\u{2019}')
        .map(|c| if c == '.' { ' ' } else { c })
        .filter(|c| !INVALID_CHARS.contains(c) && !c.is_control())
        .collect();

    let cleaned = collapse_whitespace(&cleaned);
    if cleaned.is_empty() {
        UNNAMED_AUTHOR_DIR.to_string()
    } else {
        cleaned
    }
}

/// Turn a title into a file name component
///
/// Invalid characters are replaced with `_` rather than dropped so the
/// title stays readable.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if INVALID_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    // A trailing dot or space is not allowed on Windows
    let cleaned = collapse_whitespace(&cleaned);
    let cleaned = cleaned.trim_end_matches('.').trim_end();
    if cleaned.is_empty() {
        UNKNOWN_TITLE.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Canonical file name for a book: `"<title> - <author>.<ext>"`
///
/// `ext` is lower-cased; an empty extension yields no dot.
pub fn generated_filename(title: &str, author: &str, ext: &str) -> String {
    let stem = format!("{} - {}", sanitize_title(title), sanitize_author(author));
    let ext = ext.trim_start_matches('.').to_lowercase();
    if ext.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, ext)
    }
}

/// Relative location of a book's primary file: `<author dir>/<generated name>`
pub fn book_relative_path(title: &str, author: &str, ext: &str) -> PathBuf {
    PathBuf::from(sanitize_author(author)).join(generated_filename(title, author, ext))
}

/// Lower-cased extension of a path, or an empty string
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Insert a `" (n)"` counter before the extension
///
/// `with_counter("A/T - A.pdf", 2)` is `A/T - A (2).pdf`.
pub fn with_counter(path: &Path, n: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, n, ext.to_string_lossy()),
        None => format!("{} ({})", stem, n),
    };
    path.with_file_name(name)
}

/// First candidate for which `is_taken` returns false
///
/// Tries `path` itself, then `" (2)"`, `" (3)"`, and so on.
pub fn first_free<F>(path: &Path, mut is_taken: F) -> PathBuf
where
    F: FnMut(&Path) -> bool,
{
    if !is_taken(path) {
        return path.to_path_buf();
    }
    let mut n = 2;
    loop {
        let candidate = with_counter(path, n);
        if !is_taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
