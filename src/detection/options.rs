use crate::error::TableError;
use glob::Pattern;
use serde::Deserialize;
use thiserror::Error;

/// Errors related to extraction settings.
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("Option '{name}' must be at least 1, got {value}")]
    InvalidOption { name: &'static str, value: usize },
}

/// Tuning knobs of the detection and extraction passes.
///
/// Deserializes with per-field defaults so it can sit inside a larger config file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Minimum candidate height in rows.
    pub min_rows: usize,

    /// Minimum candidate width in columns.
    pub min_cols: usize,

    /// Number of leading rows considered when looking for the header.
    pub header_search_depth: usize,

    /// Glob patterns selecting sheets by name; all sheets when absent.
    pub sheets: Option<Vec<String>>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_cols: 2,
            header_search_depth: 5,
            sheets: None,
        }
    }
}

impl ExtractOptions {
    pub fn with_min_rows(mut self, min_rows: usize) -> Self {
        self.min_rows = min_rows;
        self
    }

    pub fn with_min_cols(mut self, min_cols: usize) -> Self {
        self.min_cols = min_cols;
        self
    }

    pub fn with_header_search_depth(mut self, header_search_depth: usize) -> Self {
        self.header_search_depth = header_search_depth;
        self
    }

    pub fn with_sheets<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sheets = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    /// Checks every numeric option is at least 1 and every sheet pattern compiles.
    pub fn validate(&self) -> Result<(), TableError> {
        for (name, value) in [
            ("min_rows", self.min_rows),
            ("min_cols", self.min_cols),
            ("header_search_depth", self.header_search_depth),
        ] {
            if value == 0 {
                Err(OptionsError::InvalidOption { name, value })?
            }
        }
        self.sheet_selector()?;
        Ok(())
    }

    /// Compiles the sheet patterns into a selector.
    pub(crate) fn sheet_selector(&self) -> Result<SheetSelector, TableError> {
        let patterns = self
            .sheets
            .as_ref()
            .map(|patterns| patterns.iter().map(|pattern| Pattern::new(pattern)).collect::<Result<Vec<_>, _>>())
            .transpose()?;
        Ok(SheetSelector { patterns })
    }
}

/// Compiled sheet name filter.
#[derive(Clone, Debug)]
pub(crate) struct SheetSelector {
    patterns: Option<Vec<Pattern>>,
}

impl SheetSelector {
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        match &self.patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }
}
