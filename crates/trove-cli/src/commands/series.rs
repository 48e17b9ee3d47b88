//! Series command handler

use anyhow::Result;

use trove_core::Store;

use crate::output::Output;

/// List series, or the books of one series in reading order
pub fn run(store: &Store, name: Option<String>, output: &Output) -> Result<()> {
    match name {
        Some(name) => {
            let books = store.get_books_by_series(&name);
            output.print_books(&books);
        }
        None => {
            let series: Vec<(String, usize)> = store
                .series_names()
                .into_iter()
                .map(|name| {
                    let count = store.get_books_by_series(&name).len();
                    (name, count)
                })
                .collect();
            output.print_series(&series);
        }
    }
    Ok(())
}
