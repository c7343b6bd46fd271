//! Text protocol result sets
//!
//! A `COM_QUERY` response is either an OK packet (no result set) or:
//! column count, one definition per column, EOF, rows, EOF.

use super::packet::{PayloadReader, Truncated};

/// Column definition (protocol 4.1); only the name is kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
}

impl ColumnDefinition {
    pub fn parse(payload: &[u8]) -> Result<Self, Truncated> {
        let mut reader = PayloadReader::new(payload);
        // catalog, schema, table, org_table
        for _ in 0..4 {
            reader.read_lenenc_bytes()?;
        }
        let name = reader
            .read_lenenc_bytes()?
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default();
        Ok(Self { name })
    }
}

/// Decode one text row of `columns` nullable values
pub fn parse_text_row(payload: &[u8], columns: usize) -> Result<Row, Truncated> {
    let mut reader = PayloadReader::new(payload);
    let mut values = Vec::with_capacity(columns);
    for _ in 0..columns {
        let value = reader
            .read_lenenc_bytes()?
            .map(|b| String::from_utf8_lossy(b).into_owned());
        values.push(value);
    }
    Ok(Row { values })
}

/// One row; `None` is SQL NULL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub values: Vec<Option<String>>,
}

impl Row {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }
}

/// Result of a text query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    /// Result of a statement that produced no result set
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first_row(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Position of a column, matched case-insensitively
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Value of `column` in row `row`; `None` for NULL or a missing column
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)
    }
}
