//! Working view of a dataset during one validation call.

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::input::{Column, ColumnSource, TabularDataset};

/// Map every column whose name contains a space to the underscore form.
/// A rename that would collide with another column is skipped.
pub fn space_renames(dataset: &TabularDataset) -> IndexMap<String, String> {
    let names = dataset.column_names();
    let mut renames = IndexMap::new();
    for name in &names {
        if !name.contains(' ') {
            continue;
        }
        let renamed = name.replace(' ', "_");
        let taken = names.contains(&renamed.as_str()) || renames.values().any(|v| *v == renamed);
        if taken {
            warn!(column = %name, renamed = %renamed, "rename would collide, keeping original name");
            continue;
        }
        renames.insert(name.to_string(), renamed);
    }
    if !renames.is_empty() {
        info!(?renames, "renaming columns with spaces");
    }
    renames
}

/// Renamed view over a borrowed dataset plus call-local synthetic columns.
///
/// The underlying dataset is never modified.
#[derive(Debug)]
pub struct Frame<'a> {
    base: &'a TabularDataset,
    names: Vec<String>,
    synthetic: Vec<Column>,
}

impl<'a> Frame<'a> {
    pub fn new(base: &'a TabularDataset, renames: &IndexMap<String, String>) -> Self {
        let names = base
            .columns()
            .iter()
            .map(|c| renames.get(&c.name).cloned().unwrap_or_else(|| c.name.clone()))
            .collect();
        Self {
            base,
            names,
            synthetic: Vec::new(),
        }
    }

    /// Add or replace a synthetic column.
    pub fn insert(&mut self, mut column: Column, name: impl Into<String>) {
        column.name = name.into();
        match self.synthetic.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.synthetic.push(column),
        }
    }

    pub fn synthetic_columns(&self) -> &[Column] {
        &self.synthetic
    }
}

impl ColumnSource for Frame<'_> {
    fn row_count(&self) -> usize {
        self.base.row_count()
    }

    fn column(&self, name: &str) -> Option<&Column> {
        self.synthetic.iter().find(|c| c.name == name).or_else(|| {
            self.names
                .iter()
                .position(|n| n == name)
                .map(|i| &self.base.columns()[i])
        })
    }

    fn column_names(&self) -> Vec<&str> {
        self.names
            .iter()
            .map(String::as_str)
            .chain(self.synthetic.iter().map(|c| c.name.as_str()))
            .collect()
    }
}
