use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One character line recovered from OCR text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterRecord {
    pub name: String,
    pub job: Option<String>,
    pub fame: Option<u64>,
}

impl CharacterRecord {
    pub fn new(name: impl Into<String>, job: Option<&str>, fame: Option<u64>) -> Self {
        CharacterRecord {
            name: name.into(),
            job: job.map(str::to_string),
            fame,
        }
    }
}

/// A character paired with the total damage scraped from its profile page.
/// `damage` is kept verbatim ("12.3조", "845억", "1,234,567").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DamageRecord {
    pub name: String,
    pub job: Option<String>,
    pub fame: Option<u64>,
    pub damage: String,
}

impl DamageRecord {
    pub fn from_record(record: &CharacterRecord, damage: String) -> Self {
        DamageRecord {
            name: record.name.clone(),
            job: record.job.clone(),
            fame: record.fame,
            damage,
        }
    }
}

/// Immutable result of one capture. Damage results never mutate a snapshot;
/// they produce a new one via [`Snapshot::superseded_by`].
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    characters: Vec<CharacterRecord>,
    screenshot: Option<PathBuf>,
    captured_at: DateTime<Utc>,
    damages: Vec<DamageRecord>,
}

impl Snapshot {
    pub fn capture(characters: Vec<CharacterRecord>, screenshot: Option<PathBuf>) -> Self {
        Snapshot {
            characters,
            screenshot,
            captured_at: Utc::now(),
            damages: Vec::new(),
        }
    }

    pub fn superseded_by(&self, damages: Vec<DamageRecord>) -> Self {
        Snapshot {
            characters: self.characters.clone(),
            screenshot: self.screenshot.clone(),
            captured_at: self.captured_at,
            damages,
        }
    }

    pub fn characters(&self) -> &[CharacterRecord] {
        &self.characters
    }

    pub fn screenshot(&self) -> Option<&Path> {
        self.screenshot.as_deref()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn damages(&self) -> &[DamageRecord] {
        &self.damages
    }
}
