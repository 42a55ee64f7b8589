//! Column profiling and analysis-prompt building for uploaded tables.
//!
//! Everything here is derived and recomputed per upload; nothing is
//! persisted. The output of [`build_report`] is the exact text handed to the
//! model as a user turn, so it must be deterministic for a given table.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;

/// Decoded tabular data: header order is preserved from the source file and
/// drives every iteration below.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Number,
    Date,
    Text,
    Unknown,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Text => "text",
            ColumnType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Per-column profile.
#[derive(Debug, Clone)]
pub struct ColumnSummary {
    pub name: String,
    pub inferred_type: ColumnType,
    pub unique_count: usize,
    pub non_empty_count: usize,
    pub empty_count: usize,
    /// Populated for number columns.
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
    /// Populated for date columns.
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Parse a cell as a calendar date. A bare four-digit year counts as a date
/// (January 1st); this is the documented tie-break for values that would
/// also parse as numbers.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    // Datetime cells from spreadsheet exports.
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    if value.len() == 4 {
        if let Ok(year) = value.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1);
        }
    }
    None
}

fn parse_number(value: &str) -> Option<f64> {
    let parsed: f64 = value.trim().parse().ok()?;
    parsed.is_finite().then_some(parsed)
}

/// Classify a column from its non-empty values. Checks run date before
/// number before text; an empty column is unknown.
fn infer_type(values: &[&str]) -> ColumnType {
    if values.is_empty() {
        return ColumnType::Unknown;
    }
    if values.iter().all(|v| parse_date(v).is_some()) {
        return ColumnType::Date;
    }
    if values.iter().all(|v| parse_number(v).is_some()) {
        return ColumnType::Number;
    }
    ColumnType::Text
}

/// Profile every column of the table, in header order.
pub fn summarize_columns(table: &Table) -> Vec<ColumnSummary> {
    table
        .headers
        .iter()
        .map(|header| {
            let values: Vec<&str> = table
                .rows
                .iter()
                .filter_map(|row| row.get(header))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .collect();

            let inferred_type = infer_type(&values);
            let unique: HashSet<&str> = values.iter().copied().collect();

            let mut summary = ColumnSummary {
                name: header.clone(),
                inferred_type,
                unique_count: unique.len(),
                non_empty_count: values.len(),
                empty_count: table.rows.len() - values.len(),
                min: None,
                max: None,
                average: None,
                earliest: None,
                latest: None,
            };

            match inferred_type {
                ColumnType::Number => {
                    let numbers: Vec<f64> =
                        values.iter().filter_map(|v| parse_number(v)).collect();
                    if !numbers.is_empty() {
                        summary.min = numbers.iter().copied().reduce(f64::min);
                        summary.max = numbers.iter().copied().reduce(f64::max);
                        summary.average =
                            Some(numbers.iter().sum::<f64>() / numbers.len() as f64);
                    }
                }
                ColumnType::Date => {
                    let dates: Vec<NaiveDate> =
                        values.iter().filter_map(|v| parse_date(v)).collect();
                    summary.earliest = dates.iter().min().copied();
                    summary.latest = dates.iter().max().copied();
                }
                _ => {}
            }

            summary
        })
        .collect()
}

/// The fixed question set appended verbatim to every analysis prompt.
const ANALYSIS_QUESTIONS: &str = "\
1. What are the main content and purpose of this data?
2. What are its key characteristics and patterns?
3. What important observations stand out?
4. How is the data quality (completeness, consistency)?
5. What relationships might exist between the columns?
6. What analyses or applications would this data be suited for?";

const PREVIEW_ROWS: usize = 5;

/// Build the natural-language analysis prompt for an uploaded table.
pub fn build_report(table: &Table, source_format: &str) -> String {
    let summaries = summarize_columns(table);
    let sample_size = table.row_count().min(PREVIEW_ROWS);

    let mut prompt = format!(
        "Please analyze this {} data file and provide detailed insights.\n\n\
         File overview:\n\
         - Total rows: {}\n\
         - Columns: {}\n\
         - Column names: {}\n\n\
         Column statistics:\n",
        source_format.to_uppercase(),
        table.row_count(),
        table.column_count(),
        table.headers.join(", "),
    );

    for summary in &summaries {
        prompt.push_str(&format!(
            "\n{}:\n- Type: {}\n- Unique values: {}\n- Non-empty values: {}\n- Empty values: {}\n",
            summary.name,
            summary.inferred_type,
            summary.unique_count,
            summary.non_empty_count,
            summary.empty_count,
        ));
        if let (Some(min), Some(max), Some(avg)) = (summary.min, summary.max, summary.average) {
            prompt.push_str(&format!(
                "- Min: {}\n- Max: {}\n- Average: {:.2}\n",
                min, max, avg
            ));
        }
        if let (Some(earliest), Some(latest)) = (summary.earliest, summary.latest) {
            prompt.push_str(&format!(
                "- Earliest date: {}\n- Latest date: {}\n",
                earliest, latest
            ));
        }
    }

    prompt.push_str(&format!("\nData preview (first {} rows):\n", sample_size));
    for (index, row) in table.rows.iter().take(PREVIEW_ROWS).enumerate() {
        let fields: Vec<String> = table
            .headers
            .iter()
            .map(|header| {
                format!(
                    "{}: {}",
                    header,
                    row.get(header).map(String::as_str).unwrap_or("")
                )
            })
            .collect();
        prompt.push_str(&format!("Row {}: {}\n", index + 1, fields.join(", ")));
    }

    prompt.push_str(&format!(
        "\nPlease provide the following analysis:\n{}\n\n\
         Give concrete insights where possible, and point out any anomalies \
         or unusual patterns you notice.",
        ANALYSIS_QUESTIONS
    ));

    prompt
}
