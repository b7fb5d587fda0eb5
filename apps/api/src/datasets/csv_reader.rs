use std::collections::HashMap;

use super::schema::{DatasetKind, SchemaError, TabularRecord};

/// Header row plus the data rows of one CSV file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub records: Vec<TabularRecord>,
}

/// Reads comma-delimited text with a header row into column-name → value records.
///
/// Cells are trimmed, short rows are padded with empty strings and cells beyond the
/// header are dropped. No type coercion happens here.
pub fn read_table(kind: DatasetKind, text: &str) -> Result<CsvTable, SchemaError> {
    let text = text.trim_start_matches('\u{feff}').trim();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SchemaError::Malformed {
            kind,
            message: e.to_string(),
        })?
        .iter()
        .map(str::to_string)
        .collect();

    let mut records = Vec::new();
    for (line_num, result) in reader.records().enumerate() {
        let row = result.map_err(|e| SchemaError::Malformed {
            kind,
            message: format!("line {}: {e}", line_num + 2),
        })?;

        let fields: HashMap<String, String> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), row.get(i).unwrap_or("").to_string()))
            .collect();
        records.push(TabularRecord::new(fields));
    }

    Ok(CsvTable { headers, records })
}
