//! Sort and search state for stop listings.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::stop::Stop;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Id,
    Address,
    Status,
    DueDate,
    Eta,
}

/// Column and direction of the current listing sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: Option<SortColumn>,
    pub ascending: bool,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            column: None,
            ascending: true,
        }
    }
}

impl SortState {
    /// Selecting the current column flips direction; a new column sorts ascending.
    pub fn select(&mut self, column: SortColumn) {
        if self.column == Some(column) {
            self.ascending = !self.ascending;
        } else {
            self.column = Some(column);
            self.ascending = true;
        }
    }

    pub fn compare(&self, a: &Stop, b: &Stop) -> Ordering {
        let Some(column) = self.column else {
            return Ordering::Equal;
        };
        let ordering = match column {
            // Undated stops sort after every dated one.
            SortColumn::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            _ => text_key(a, column).cmp(&text_key(b, column)),
        };
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

fn text_key(stop: &Stop, column: SortColumn) -> String {
    let raw = match column {
        SortColumn::Id => stop.id.as_str(),
        SortColumn::Address => stop.address.as_deref().unwrap_or_default(),
        SortColumn::Status => stop.status.as_str(),
        SortColumn::Eta => stop.eta.as_deref().unwrap_or_default(),
        SortColumn::DueDate => "",
    };
    raw.to_lowercase()
}

/// Case-insensitive match of `query` against id, address and status.
pub fn matches_search(stop: &Stop, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    [
        stop.id.as_str(),
        stop.address.as_deref().unwrap_or_default(),
        stop.status.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&query))
}
