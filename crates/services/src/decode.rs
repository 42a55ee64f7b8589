//! Decode uploaded file bytes into row mappings.
//!
//! CSV goes through the `csv` crate; spreadsheets go through `calamine`.
//! The first row is always treated as the header row.

use calamine::{Reader, Xlsx};
use shared::error::ResourceError;
use std::collections::HashMap;
use std::io::Cursor;

use crate::tabular::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    /// Map a file extension to a decoder. Unrecognized spreadsheet-ish
    /// extensions fall back to the xlsx path, matching the upload widget's
    /// accept list.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" | "xls" => Some(SourceFormat::Xlsx),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceFormat::Csv => "csv",
            SourceFormat::Xlsx => "xlsx",
        }
    }
}

/// Decode raw file bytes into a [`Table`].
pub fn decode_rows(bytes: &[u8], format: SourceFormat) -> Result<Table, ResourceError> {
    let table = match format {
        SourceFormat::Csv => decode_csv(bytes)?,
        SourceFormat::Xlsx => decode_xlsx(bytes)?,
    };
    if table.headers.is_empty() {
        return Err(ResourceError::Decode {
            format: format.label(),
            message: "file has no header row".into(),
        });
    }
    Ok(table)
}

fn decode_csv(bytes: &[u8]) -> Result<Table, ResourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ResourceError::Decode {
            format: "csv",
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ResourceError::Decode {
            format: "csv",
            message: e.to_string(),
        })?;
        let mut row = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            row.insert(
                header.clone(),
                record.get(i).unwrap_or_default().to_string(),
            );
        }
        rows.push(row);
    }

    Ok(Table { headers, rows })
}

fn decode_xlsx(bytes: &[u8]) -> Result<Table, ResourceError> {
    let decode_err = |message: String| ResourceError::Decode {
        format: "xlsx",
        message,
    };

    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes.to_vec())).map_err(|e| decode_err(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| decode_err("workbook has no sheets".into()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .ok_or_else(|| decode_err(format!("sheet {:?} is missing", sheet_name)))?
        .map_err(|e| decode_err(e.to_string()))?;

    let mut cells = range.rows();
    let headers: Vec<String> = cells
        .next()
        .map(|row| row.iter().map(|c| c.to_string().trim().to_string()).collect())
        .unwrap_or_default();

    let rows = cells
        .map(|row| {
            headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let value = row.get(i).map(|c| c.to_string()).unwrap_or_default();
                    (header.clone(), value)
                })
                .collect::<HashMap<_, _>>()
        })
        .collect();

    Ok(Table { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SourceFormat::from_extension("CSV"), Some(SourceFormat::Csv));
        assert_eq!(
            SourceFormat::from_extension("xlsx"),
            Some(SourceFormat::Xlsx)
        );
        assert_eq!(SourceFormat::from_extension("pdf"), None);
    }

    #[test]
    fn test_decode_csv_rows() {
        let bytes = b"name,age,city\nAlice,30,\"Taipei, TW\"\nBob,25,Tainan\n";
        let table = decode_rows(bytes, SourceFormat::Csv).unwrap();
        assert_eq!(table.headers, vec!["name", "age", "city"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0]["city"], "Taipei, TW");
        assert_eq!(table.rows[1]["age"], "25");
    }

    #[test]
    fn test_decode_csv_short_rows_pad_empty() {
        let bytes = b"a,b\n1\n";
        let table = decode_rows(bytes, SourceFormat::Csv).unwrap();
        assert_eq!(table.rows[0]["a"], "1");
        assert_eq!(table.rows[0]["b"], "");
    }

    #[test]
    fn test_decode_rejects_garbage_xlsx() {
        let err = decode_rows(b"definitely not a zip", SourceFormat::Xlsx).unwrap_err();
        assert!(matches!(err, ResourceError::Decode { format: "xlsx", .. }));
    }
}
