//! Content Catalog
//!
//! Static content records (pitfalls and signals) with lookup-by-id and
//! free-text search. Loaded once at startup; nothing here mutates.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Content category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Pitfall,
    Signal,
}

/// One catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Zero means freely accessible
    #[serde(default)]
    pub price_cents: u32,
    pub body: String,
}

impl ContentRecord {
    pub fn is_free(&self) -> bool {
        self.price_cents == 0
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-memory catalog over static records
pub struct Catalog {
    records: Vec<ContentRecord>,
}

impl Catalog {
    pub fn new(records: Vec<ContentRecord>) -> Self {
        Self { records }
    }

    /// Load records from a JSON array file
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<ContentRecord> = serde_json::from_str(&raw)?;
        Ok(Self::new(records))
    }

    pub fn get(&self, id: &str) -> Option<&ContentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Free-text containment search over title, summary, and tags
    ///
    /// Scored by the fraction of query terms matched; zero-score
    /// records are omitted; ties keep catalog order (stable sort).
    pub fn search(&self, query: &str) -> Vec<&ContentRecord> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if terms.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, &ContentRecord)> = self
            .records
            .iter()
            .filter_map(|record| {
                let haystack = format!(
                    "{} {} {}",
                    record.title.to_lowercase(),
                    record.summary.to_lowercase(),
                    record.tags.join(" ").to_lowercase()
                );
                let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (matched > 0).then_some((matched, record))
            })
            .collect();

        scored.sort_by_key(|(matched, _)| std::cmp::Reverse(*matched));
        scored.into_iter().map(|(_, record)| record).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Built-in records for local development
    pub fn sample() -> Self {
        Self::new(vec![
            ContentRecord {
                id: "pitfall-premature-microservices".to_string(),
                kind: ContentKind::Pitfall,
                title: "Premature microservices".to_string(),
                summary: "Splitting a product into services before the domain boundaries are known"
                    .to_string(),
                tags: vec!["architecture".to_string(), "microservices".to_string()],
                price_cents: 900,
                body: "Teams that split a young product into microservices before the domain \
                       boundaries have settled pay for every wrong guess twice: once in the \
                       network hop and once in the migration that moves the boundary later. \
                       Start with a modular monolith and extract services only along seams \
                       that have already survived real change."
                    .to_string(),
            },
            ContentRecord {
                id: "pitfall-orm-n-plus-one".to_string(),
                kind: ContentKind::Pitfall,
                title: "The invisible N+1 query".to_string(),
                summary: "Lazy-loading relations inside a render loop".to_string(),
                tags: vec!["database".to_string(), "orm".to_string()],
                price_cents: 900,
                body: "An ORM that lazy-loads relations will happily issue one query per row \
                       the moment a template iterates over a collection. The page works in \
                       development with ten rows and falls over in production with ten \
                       thousand. Log and count queries per request in CI before users do \
                       it for you."
                    .to_string(),
            },
            ContentRecord {
                id: "signal-issue-triage-latency".to_string(),
                kind: ContentKind::Signal,
                title: "Issue triage latency".to_string(),
                summary: "How long a project takes to label or answer a new issue".to_string(),
                tags: vec!["open-source".to_string(), "maintenance".to_string()],
                price_cents: 0,
                body: "The time between a new issue being opened and a maintainer reacting to \
                       it is one of the most honest signals a dependency publishes. Releases \
                       can be automated; attention cannot."
                    .to_string(),
            },
        ])
    }
}
