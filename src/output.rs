//! Output formats for the non-interactive commands.

use std::fmt;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width text, the same rows the interactive views show
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// Parse a configured default; unknown names fall back to table.
    pub fn from_setting(name: &str) -> Self {
        <Self as ValueEnum>::from_str(name, true).unwrap_or_else(|_| {
            tracing::warn!(format = name, "unsupported default_format, using table");
            Self::default()
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => f.write_str("table"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Render `value` as JSON or as the given table rows.
pub fn render<T, F>(format: OutputFormat, value: &T, table: F) -> Result<String>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> Vec<String>,
{
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("failed to serialize output")
        }
        OutputFormat::Table => Ok(table(value).join("\n")),
    }
}

/// Render and print to stdout.
pub fn print<T, F>(format: OutputFormat, value: &T, table: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> Vec<String>,
{
    println!("{}", render(format, value, table)?);
    Ok(())
}
