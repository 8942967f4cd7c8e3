// ABOUTME: Row-count summaries used to validate a migrated database
// ABOUTME: Compares table->count mappings key by key, order independent

use std::collections::BTreeMap;
use std::fmt;

/// Table name to row count, collected from one database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowCountSummary {
    counts: BTreeMap<String, u64>,
}

/// One table whose count differs between two summaries
///
/// `None` means the table is absent from that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDifference {
    pub table: String,
    pub source: Option<u64>,
    pub destination: Option<u64>,
}

impl RowCountSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the row count of a table, replacing any previous value
    pub fn insert(&mut self, table: impl Into<String>, rows: u64) {
        self.counts.insert(table.into(), rows);
    }

    pub fn get(&self, table: &str) -> Option<u64> {
        self.counts.get(table).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn total_rows(&self) -> u64 {
        self.counts.values().sum()
    }

    /// True when both summaries cover the same tables with the same counts
    pub fn matches(&self, other: &RowCountSummary) -> bool {
        self.counts.len() == other.counts.len()
            && self
                .counts
                .iter()
                .all(|(table, rows)| other.counts.get(table) == Some(rows))
    }

    /// Every table missing on one side or counted differently, sorted by name
    pub fn differences(&self, destination: &RowCountSummary) -> Vec<TableDifference> {
        let mut diffs: Vec<TableDifference> = self
            .counts
            .iter()
            .filter(|(table, rows)| destination.counts.get(*table) != Some(*rows))
            .map(|(table, rows)| TableDifference {
                table: table.clone(),
                source: Some(*rows),
                destination: destination.get(table),
            })
            .collect();

        diffs.extend(
            destination
                .counts
                .iter()
                .filter(|(table, _)| !self.counts.contains_key(*table))
                .map(|(table, rows)| TableDifference {
                    table: table.clone(),
                    source: None,
                    destination: Some(*rows),
                }),
        );

        diffs.sort_by(|a, b| a.table.cmp(&b.table));
        diffs
    }
}

impl FromIterator<(String, u64)> for RowCountSummary {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for RowCountSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (table, rows)) in self.counts.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", table, rows)?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for TableDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = |rows: Option<u64>| match rows {
            Some(rows) => rows.to_string(),
            None => "missing".to_string(),
        };
        write!(
            f,
            "{}: source={}, destination={}",
            self.table,
            side(self.source),
            side(self.destination)
        )
    }
}
