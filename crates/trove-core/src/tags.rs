//! Tag seeding
//!
//! Loads a `name -> icon` map into the tag table. Existing tags get
//! their icon replaced, new ones are inserted; running the same seed
//! twice changes nothing the second time.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::models::Tag;
use crate::store::{Store, StoreResult};

/// Built-in tag set used when no seed file is given
pub const DEFAULT_TAGS: &[(&str, &str)] = &[
    ("Preferiti", "⭐"),
    ("Da leggere", "📖"),
    ("Filosofia", "🤔"),
    ("Teologia", "✝️"),
    ("Morale", "⚖️"),
    ("Spiritualità", "🕊️"),
    ("Storia", "🏛️"),
    ("Esegesi", "📜"),
    ("Sacramenti", "💧"),
    ("Liturgia", "🕯️"),
    ("Pastorale", "🐑"),
    ("Domenicani", "⚪⚫"),
    ("Tommaso d'Aquino", "😇"),
    ("STh-Salani", "📚"),
    ("Questioni Disputate", "❓"),
    ("Manuali", "📘"),
    ("Enciclopedie & Dizionari", "📖"),
    ("Padri della Chiesa", "📜"),
    ("Scienza", "🔬"),
    ("Tecnologia", "💻"),
    ("Tecnoetica", "💡"),
    ("Post-Trans-Umanesimo", "🤖"),
    ("Pop philosophy", "🎬"),
    ("Letteratura", "✒️"),
    ("Religioni", "🕉️"),
    ("Linguistica", "🗣️"),
    ("Bioetica", "🧬"),
    ("Sociologia", "👥"),
    ("Diritto", "⚖️"),
    ("Logica", "🧠"),
    ("default", "📄"),
];

/// The built-in tags, in declaration order
pub fn default_tags() -> Vec<Tag> {
    DEFAULT_TAGS
        .iter()
        .map(|(name, icon)| Tag::new(*name, *icon))
        .collect()
}

/// Read a seed file: a JSON object mapping tag names to icons
pub fn load_seed_file(path: &Path) -> Result<Vec<Tag>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read tag file {:?}", path))?;
    let map: BTreeMap<String, String> = serde_json::from_str(&content)
        .with_context(|| format!("Tag file {:?} must be a JSON object of name: icon", path))?;
    Ok(map
        .into_iter()
        .map(|(name, icon)| Tag::new(name, icon))
        .collect())
}

/// What a seed run changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Upsert every tag in `tags` with a single write
pub fn seed_tags(store: &mut Store, tags: &[Tag]) -> StoreResult<SeedReport> {
    let mut report = SeedReport::default();
    let mut changed = Vec::new();

    for tag in tags {
        match store.get_tag(&tag.name) {
            Some(existing) if existing.icon == tag.icon => report.unchanged += 1,
            Some(_) => {
                report.updated += 1;
                changed.push(tag.clone());
            }
            None => {
                report.inserted += 1;
                changed.push(tag.clone());
            }
        }
    }

    if !changed.is_empty() {
        store.upsert_tags(&changed)?;
    }
    info!(
        inserted = report.inserted,
        updated = report.updated,
        unchanged = report.unchanged,
        "Seeded tags"
    );
    Ok(report)
}
