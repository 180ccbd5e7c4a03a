//! Curated tables and their column schemas, as handed to the store.
use qu::ick_use::*;
use serde::{Serialize, Serializer};
use std::fmt;

/// Strings longer than this are stored as large text when a schema is inferred.
const MAX_STRING_SIZE: usize = 1000;

/// The type of a stored column.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ColumnType {
    String { max_size: usize },
    Integer,
    Double,
    LargeText,
    FileHandleId,
    EntityId,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::String { .. } => "STRING",
            ColumnType::Integer => "INTEGER",
            ColumnType::Double => "DOUBLE",
            ColumnType::LargeText => "LARGETEXT",
            ColumnType::FileHandleId => "FILEHANDLEID",
            ColumnType::EntityId => "ENTITYID",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum_size: Option<usize>,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let maximum_size = match column_type {
            ColumnType::String { max_size } => Some(max_size),
            _ => None,
        };
        Column {
            name: name.into(),
            column_type,
            maximum_size,
        }
    }

    pub fn string(name: impl Into<String>, max_size: usize) -> Self {
        Self::new(name, ColumnType::String { max_size })
    }
}

/// Something that becomes one row of a curated table.
pub trait Record {
    fn columns() -> Vec<Column>;
    fn row(&self) -> Vec<String>;
}

/// A named table of text cells with a typed schema.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Table {
            name: name.into(),
            columns,
            rows: vec![],
        }
    }

    pub fn from_records<'a, R: Record + 'a>(
        name: impl Into<String>,
        records: impl IntoIterator<Item = &'a R>,
    ) -> Self {
        let mut table = Table::new(name, R::columns());
        table.rows = records.into_iter().map(R::row).collect();
        table
    }

    /// Build a table from text columns, choosing each column's type from its values.
    ///
    /// A column is an integer column if every non-empty value is an integer, a double column if
    /// every non-empty value is a number, and text otherwise.
    pub fn infer(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns = headers
            .into_iter()
            .enumerate()
            .map(|(idx, header)| {
                let values = rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty() && *v != "nan");
                Column::new(header, infer_type(values))
            })
            .collect();
        Table {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    /// Normalize every integer column with [`parse_float_to_int`].
    pub fn clean_numeric_cols(&mut self) {
        let int_cols = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.column_type == ColumnType::Integer)
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        for row in self.rows.iter_mut() {
            for idx in int_cols.iter().copied() {
                if let Some(cell) = row.get_mut(idx) {
                    *cell = parse_float_to_int(cell);
                }
            }
        }
    }

    /// Check every row fits the schema.
    pub fn validate(&self) -> Result {
        let width = self.columns.len();
        for (row_idx, row) in self.rows.iter().enumerate() {
            ensure!(
                row.len() == width,
                "table \"{}\" row {} has {} cells, expected {}",
                self.name,
                row_idx,
                row.len(),
                width
            );
            for (cell, col) in row.iter().zip(self.columns.iter()) {
                if let Some(max) = col.maximum_size {
                    ensure!(
                        cell.chars().count() <= max,
                        "table \"{}\" row {}: \"{}\" is longer than {} characters (column `{}`)",
                        self.name,
                        row_idx,
                        cell,
                        max,
                        col.name
                    );
                }
            }
        }
        Ok(())
    }

    /// A file name for the table, e.g. `medication_diary` for "Medication Diary".
    pub fn file_stem(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        for ch in self.name.chars() {
            if ch.is_ascii_alphanumeric() {
                out.push(ch.to_ascii_lowercase());
            } else if !out.ends_with('_') {
                out.push('_');
            }
        }
        out.trim_matches('_').to_string()
    }
}

/// Turn float-formatted integers back into integers.
///
/// Missing values in numeric columns turn the column into floats upstream, so `123` arrives as
/// `123.0` and a missing value as `nan`.
pub fn parse_float_to_int(value: &str) -> String {
    if value == "nan" {
        String::new()
    } else if let Some(stripped) = value.strip_suffix(".0") {
        stripped.to_string()
    } else {
        value.to_string()
    }
}

/// Render an optional value, using the empty string for `None`.
pub fn opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

fn infer_type<'a>(values: impl Iterator<Item = &'a str>) -> ColumnType {
    let mut is_int = true;
    let mut is_double = true;
    let mut max_len = 0;
    let mut count = 0;
    for value in values {
        count += 1;
        is_int = is_int && value.parse::<i64>().is_ok();
        is_double = is_double && value.parse::<f64>().is_ok();
        max_len = max_len.max(value.chars().count());
    }
    if count == 0 {
        ColumnType::String { max_size: 50 }
    } else if is_int {
        ColumnType::Integer
    } else if is_double {
        ColumnType::Double
    } else if max_len > MAX_STRING_SIZE {
        ColumnType::LargeText
    } else {
        ColumnType::String { max_size: max_len }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn float_to_int() {
        assert_eq!(parse_float_to_int("123.0"), "123");
        assert_eq!(parse_float_to_int("nan"), "");
        assert_eq!(parse_float_to_int("7"), "7");
        assert_eq!(parse_float_to_int("7.5"), "7.5");
        assert_eq!(parse_float_to_int(""), "");
    }

    #[test]
    fn cleans_only_integer_columns() {
        let mut table = Table::new(
            "Sleep Diary",
            vec![
                Column::string("subject_id", 6),
                Column::new("sleep", ColumnType::Integer),
                Column::new("score", ColumnType::Double),
            ],
        );
        table.rows.push(vec!["1.0".into(), "1546300800.0".into(), "2.0".into()]);
        table.rows.push(vec!["2.0".into(), "nan".into(), "nan".into()]);
        table.clean_numeric_cols();
        assert_eq!(table.rows[0], ["1.0", "1546300800", "2.0"]);
        assert_eq!(table.rows[1], ["2.0", "", "nan"]);
    }

    #[test]
    fn validation() {
        let mut table = Table::new("t", vec![Column::string("subject_id", 6)]);
        table.rows.push(vec!["12_BOS".into()]);
        assert!(table.validate().is_ok());
        table.rows.push(vec!["123_BOS".into()]);
        assert!(table.validate().is_err());
        table.rows.pop();
        table.rows.push(vec![]);
        assert!(table.validate().is_err());
    }

    #[test]
    fn inferred_schema() {
        let table = Table::infer(
            "Task Scores (Home)",
            vec!["subject_id".into(), "visit".into(), "seconds".into(), "note".into()],
            vec![
                vec!["3_BOS".into(), "1".into(), "12.5".into(), "".into()],
                vec!["40_NYC".into(), "".into(), "3".into(), "".into()],
            ],
        );
        let types = table
            .columns
            .iter()
            .map(|c| c.column_type)
            .collect::<Vec<_>>();
        assert_eq!(
            types,
            [
                ColumnType::String { max_size: 6 },
                ColumnType::Integer,
                ColumnType::Double,
                ColumnType::String { max_size: 50 },
            ]
        );
        assert_eq!(table.file_stem(), "task_scores_home");
    }
}
