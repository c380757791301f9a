//! Renderings of a [`ResultSet`] for the terminal and for piping.

use colored::Colorize;
use std::fmt;
use std::str::FromStr;

use crate::client::ResultSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
        };
        write!(f, "{name}")
    }
}

impl OutputFormat {
    pub fn render(&self, results: &ResultSet) -> String {
        match self {
            Self::Table => render_table(results),
            Self::Json => render_json(results),
            Self::Csv => render_csv(results),
        }
    }
}

fn cell<'r>(results: &'r ResultSet, row: usize, var: &str) -> &'r str {
    results.rows[row].get(var).map(String::as_str).unwrap_or("")
}

fn render_table(results: &ResultSet) -> String {
    if results.is_empty() {
        return "no results".dimmed().to_string();
    }

    let widths: Vec<usize> = results
        .variables
        .iter()
        .map(|var| {
            (0..results.rows.len())
                .map(|row| cell(results, row, var).len())
                .chain(std::iter::once(var.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    // Pad before colorizing: escape codes must not count toward the width.
    let header: Vec<String> = results
        .variables
        .iter()
        .zip(widths.iter().copied())
        .map(|(var, w)| format!("{:<w$}", var).cyan().bold().to_string())
        .collect();
    out.push_str(&header.join("  "));
    out.push('\n');

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');

    for row in 0..results.rows.len() {
        let cells: Vec<String> = results
            .variables
            .iter()
            .zip(widths.iter().copied())
            .map(|(var, w)| format!("{:<w$}", cell(results, row, var)))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out.push_str(&format!("{} row(s)", results.rows.len()).dimmed().to_string());
    out
}

fn render_json(results: &ResultSet) -> String {
    serde_json::to_string_pretty(&results.rows).unwrap_or_else(|_| "[]".to_string())
}

fn render_csv(results: &ResultSet) -> String {
    let mut out = String::new();
    out.push_str(
        &results
            .variables
            .iter()
            .map(|v| csv_field(v))
            .collect::<Vec<_>>()
            .join(","),
    );
    out.push('\n');
    for row in 0..results.rows.len() {
        let fields: Vec<String> = results
            .variables
            .iter()
            .map(|var| csv_field(cell(results, row, var)))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> ResultSet {
        let mut row1 = BTreeMap::new();
        row1.insert("item".to_string(), "http://example.org/kb#m1".to_string());
        row1.insert("person_name".to_string(), "John Smith".to_string());
        let mut row2 = BTreeMap::new();
        row2.insert("item".to_string(), "http://example.org/kb#m2".to_string());
        row2.insert("person_name".to_string(), "a,\"b\"".to_string());
        ResultSet {
            variables: vec!["item".to_string(), "person_name".to_string()],
            rows: vec![row1, row2],
        }
    }

    #[test]
    fn format_names_round_trip() {
        for format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Csv] {
            assert_eq!(format.to_string().parse::<OutputFormat>(), Ok(format));
        }
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn csv_quotes_embedded_separators_and_quotes() {
        let csv = OutputFormat::Csv.render(&sample());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "item,person_name");
        assert_eq!(lines[1], "http://example.org/kb#m1,John Smith");
        assert_eq!(lines[2], "http://example.org/kb#m2,\"a,\"\"b\"\"\"");
    }

    #[test]
    fn json_rendering_is_an_array_of_objects() {
        let json = OutputFormat::Json.render(&sample());
        let parsed: Vec<BTreeMap<String, String>> =
            serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed[0].get("person_name").map(String::as_str),
            Some("John Smith")
        );
    }

    #[test]
    fn table_lists_every_row() {
        let table = OutputFormat::Table.render(&sample());
        assert!(table.contains("John Smith"));
        assert!(table.contains("2 row(s)"));
    }

    #[test]
    fn table_header_aligns_with_the_data_columns() {
        colored::control::set_override(false);
        let table = OutputFormat::Table.render(&sample());
        colored::control::unset_override();

        let lines: Vec<&str> = table.lines().collect();
        // "item" padded to the widest item value (24 chars), then the rule.
        assert_eq!(lines[0], format!("{:<24}  {}", "item", "person_name"));
        assert_eq!(lines[1], format!("{}  {}", "-".repeat(24), "-".repeat(11)));
    }
}
