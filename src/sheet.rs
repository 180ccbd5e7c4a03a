//! Spreadsheet access.
//!
//! Questionnaire workbooks are read with calamine and copied into a plain grid of [`Cell`]s, so the
//! extraction code only deals with absolute `(row, column)` positions and never with calamine's
//! ranges (which may not start at the top-left corner).
use calamine::{DataType, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use qu::ick_use::*;
use std::{collections::BTreeMap, fmt, path::Path};

/// Values meaning "no answer given".
pub const PLACEHOLDERS: &[&str] = &["Unknown", SELECT_FROM_LIST, "NA"];
/// The dropdown default, also used to mark the end of the home diaries.
pub const SELECT_FROM_LIST: &str = "<Select from list>";

static EMPTY: Cell = Cell::Empty;

/// The serial number of 9999-12-31, the last date excel can show.
const MAX_EXCEL_SERIAL: f64 = 2_958_465.;

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// A time-of-day cell (excel stores these as the fraction of a day).
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Empty, blank text, or one of the [`PLACEHOLDERS`].
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(v) => v.is_nan(),
            Cell::Text(s) => {
                let s = s.trim();
                s.is_empty() || PLACEHOLDERS.contains(&s)
            }
            _ => false,
        }
    }

    /// Text exactly equal to `value` (ignoring surrounding whitespace).
    pub fn is_text(&self, value: &str) -> bool {
        matches!(self, Cell::Text(s) if s.trim() == value)
    }

    /// The cell rendered as text, or `None` if it is missing.
    ///
    /// Whole numbers are rendered without a fractional part.
    pub fn as_text(&self) -> Option<String> {
        if self.is_missing() {
            return None;
        }
        Some(self.to_string())
    }

    /// The cell as an integer, accepting numbers and numeric text.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Number(v) if v.fract() == 0. && v.is_finite() => Some(*v as i64),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| {
                    let v = s.parse::<f64>().ok()?;
                    (v.fract() == 0. && v.is_finite()).then(|| v as i64)
                })
            }
            _ => None,
        }
    }

    fn from_calamine(value: &DataType) -> Self {
        match value {
            DataType::Int(v) => Cell::Number(*v as f64),
            DataType::Float(v) => Cell::Number(*v),
            DataType::String(s) => Cell::Text(s.clone()),
            DataType::Bool(b) => Cell::Bool(*b),
            DataType::DateTime(serial) => excel_serial(*serial),
            _ => Cell::Empty,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(v) if v.fract() == 0. && v.is_finite() => write!(f, "{}", *v as i64),
            Cell::Number(v) => write!(f, "{}", v),
            Cell::Text(s) => f.write_str(s.trim()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Convert an excel date serial number. Values below 1 are a time of day with no date.
///
/// Serials that aren't a date excel could display are empty.
fn excel_serial(serial: f64) -> Cell {
    if !(0. ..=MAX_EXCEL_SERIAL).contains(&serial) {
        return Cell::Empty;
    }
    // rounding to the second avoids 13:59:59.9999 style artifacts
    let seconds = (serial.fract() * 86_400.).round() as i64;
    if serial < 1. {
        let seconds = seconds.min(86_399) as u32;
        return match NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0) {
            Some(t) => Cell::Time(t),
            None => Cell::Empty,
        };
    }
    let Some(epoch) = NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return Cell::Empty;
    };
    let offset = Duration::days(serial.trunc() as i64) + Duration::seconds(seconds);
    match epoch.checked_add_signed(offset) {
        Some(datetime) => Cell::DateTime(datetime),
        None => Cell::Empty,
    }
}

/// A worksheet as a grid of cells, indexed from the top-left corner of the sheet.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Sheet { rows }
    }

    pub fn from_range(range: &calamine::Range<DataType>) -> Self {
        let Some(end) = range.end() else {
            return Sheet::default();
        };
        let start = range.start().unwrap_or((0, 0));
        let mut rows = vec![vec![Cell::Empty; end.1 as usize + 1]; end.0 as usize + 1];
        for row in start.0..=end.0 {
            for col in start.1..=end.1 {
                if let Some(value) = range.get_value((row, col)) {
                    rows[row as usize][col as usize] = Cell::from_calamine(value);
                }
            }
        }
        Sheet { rows }
    }

    /// Number of rows, counting from the top of the sheet.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// The cell at `(row, col)`; cells outside the used area are empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// The column in `header_row` whose text is `name`.
    pub fn find_column(&self, header_row: usize, name: &str) -> Option<usize> {
        self.rows
            .get(header_row)?
            .iter()
            .position(|cell| cell.is_text(name))
    }

    /// Like `find_column`, but the column must be there.
    pub fn column(&self, header_row: usize, name: &str) -> Result<usize> {
        self.find_column(header_row, name)
            .with_context(|| format!("no column \"{}\" in header row {}", name, header_row + 1))
    }
}

/// The sheets of one workbook, by name.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: BTreeMap<String, Sheet>,
}

impl Workbook {
    /// Load the named sheets of a workbook. Sheets that aren't present are skipped, which is
    /// reported when they are asked for.
    pub fn open(path: impl AsRef<Path>, sheet_names: &[&str]) -> Result<Self> {
        fn inner(path: &Path, sheet_names: &[&str]) -> Result<Workbook> {
            let mut workbook = calamine::open_workbook_auto(path)?;
            let mut sheets = BTreeMap::new();
            for name in sheet_names {
                if let Some(range) = workbook.worksheet_range(name) {
                    sheets.insert(name.to_string(), Sheet::from_range(&range?));
                }
            }
            Ok(Workbook { sheets })
        }
        let path = path.as_ref();
        inner(path, sheet_names)
            .with_context(|| format!("unable to read workbook \"{}\"", path.display()))
    }

    pub fn with_sheet(mut self, name: impl Into<String>, sheet: Sheet) -> Self {
        self.sheets.insert(name.into(), sheet);
        self
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.get(name)
            .with_context(|| format!("missing `{}` worksheet", name))
    }

    pub fn get(&self, name: &str) -> Option<&Sheet> {
        self.sheets.get(name)
    }
}
