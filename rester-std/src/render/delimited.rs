use super::{RenderError, Renderer, shape_of};
use bytes::Bytes;
use serde_json::{Map, Value};

/// Renders an object, or an array of objects, as CSV.
///
/// The header row is the union of every row's keys, in first-seen order; a row
/// missing a column gets an empty cell. Nested values are written as their
/// JSON text.
#[derive(Debug, Clone)]
pub struct CsvRenderer {
    /// Field delimiter (default: `,`).
    pub delimiter: u8,
    /// Whether a header row is written.
    pub headers: bool,
}

impl Default for CsvRenderer {
    fn default() -> Self {
        Self {
            delimiter: b',',
            headers: true,
        }
    }
}

impl CsvRenderer {
    /// Set the field delimiter.
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set whether a header row is written.
    pub fn headers(mut self, headers: bool) -> Self {
        self.headers = headers;
        self
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn encoding(e: impl std::fmt::Display) -> RenderError {
    RenderError::Encoding {
        format: "csv",
        message: e.to_string(),
    }
}

impl Renderer for CsvRenderer {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn media_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn render(&self, body: &Value) -> Result<Bytes, RenderError> {
        let rows: Vec<&Map<String, Value>> = match body {
            Value::Object(map) => vec![map],
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(RenderError::Unsupported {
                        format: "csv",
                        shape: shape_of(other),
                    }),
                })
                .collect::<Result<_, _>>()?,
            other => {
                return Err(RenderError::Unsupported {
                    format: "csv",
                    shape: shape_of(other),
                });
            }
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(Vec::new());

        let mut columns: Vec<&String> = Vec::new();
        for key in rows.iter().flat_map(|row| row.keys()) {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }

        if !rows.is_empty() {
            if self.headers {
                writer.write_record(&columns).map_err(encoding)?;
            }
            for row in &rows {
                let record: Vec<String> = columns
                    .iter()
                    .map(|column| row.get(*column).map(cell).unwrap_or_default())
                    .collect();
                writer.write_record(&record).map_err(encoding)?;
            }
        }

        let data = writer.into_inner().map_err(encoding)?;
        Ok(Bytes::from(data))
    }
}
