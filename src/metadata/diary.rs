//! The home diaries: medication taken and sleep.
//!
//! Each diary row has its date split over day, month and year columns, with the columns found by
//! their header text. Rows that aren't filled in properly are skipped.
use crate::{
    datetime::{cells_timestamp, is_time_of_day},
    sheet::{Cell, Sheet, SELECT_FROM_LIST},
    subject::SubjectId,
    table::{opt, Column, ColumnType, Record},
};
use chrono_tz::Tz;
use qu::ick_use::*;

pub const MEDS_SHEET: &str = "Home Diary - Meds";
pub const SLEEP_SHEET: &str = "Home Diary - Sleep";

const HEADER_ROW: usize = 3;
const DAY: &str = "Day (DD)";
const MONTH: &str = "Month (MM)";
const YEAR: &str = "Year (YYYY)";
const MEDS_TIME: &str = "Time (hh:mm - 24 hour format)";
const PD_MEDS: &str = "PD-related medications taken";
const OTHER_MEDS: &str = "Other medications taken";
const SLEEP_TIME: &str = "Time fallen asleep (hh:mm - 24 hour format)";
const WAKE_TIME: &str = "Time woke up (hh:mm - 24 hour format)";

/// Medication taken at home.
#[derive(Debug, Clone, PartialEq)]
pub struct MedicationEvent {
    pub subject_id: SubjectId,
    pub timestamp: i64,
    pub pd_related_medications: Option<String>,
    pub other_medications: Option<String>,
}

impl Record for MedicationEvent {
    fn columns() -> Vec<Column> {
        vec![
            Column::string("subject_id", 6),
            Column::new("timestamp", ColumnType::Integer),
            Column::string("pd_related_medications", 250),
            Column::string("other_medications", 250),
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.subject_id.to_string(),
            self.timestamp.to_string(),
            opt(&self.pd_related_medications),
            opt(&self.other_medications),
        ]
    }
}

/// A night's sleep. Either end may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct SleepInterval {
    pub subject_id: SubjectId,
    pub sleep: Option<i64>,
    pub wake: Option<i64>,
}

impl Record for SleepInterval {
    fn columns() -> Vec<Column> {
        vec![
            Column::string("subject_id", 6),
            Column::new("sleep", ColumnType::Integer),
            Column::new("wake", ColumnType::Integer),
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.subject_id.to_string(),
            opt(&self.sleep),
            opt(&self.wake),
        ]
    }
}

/// The day, month and year columns of a diary.
struct DateColumns {
    day: usize,
    month: usize,
    year: usize,
}

impl DateColumns {
    fn find(sheet: &Sheet) -> Result<Self> {
        Ok(DateColumns {
            day: sheet.column(HEADER_ROW, DAY)?,
            month: sheet.column(HEADER_ROW, MONTH)?,
            year: sheet.column(HEADER_ROW, YEAR)?,
        })
    }

    fn cells<'a>(&self, sheet: &'a Sheet, row: usize) -> [&'a Cell; 3] {
        [
            sheet.cell(row, self.day),
            sheet.cell(row, self.month),
            sheet.cell(row, self.year),
        ]
    }

    fn is_complete(&self, sheet: &Sheet, row: usize) -> bool {
        self.cells(sheet, row).iter().all(|cell| !cell.is_missing())
    }

    fn timestamp(&self, sheet: &Sheet, row: usize, time: &Cell, tz: Tz) -> Option<i64> {
        let [day, month, year] = self.cells(sheet, row);
        cells_timestamp(tz, day, month, year, time)
    }

    /// The row marking the end of the diary: day and month left at the dropdown default.
    fn is_end(&self, sheet: &Sheet, row: usize) -> bool {
        sheet.cell(row, self.day).is_text(SELECT_FROM_LIST)
            && sheet.cell(row, self.month).is_text(SELECT_FROM_LIST)
    }
}

/// Nothing in `cols` was filled in.
fn is_blank(sheet: &Sheet, row: usize, cols: &[usize]) -> bool {
    cols.iter().all(|col| sheet.cell(row, *col).is_missing())
}

pub fn extract_medications(
    sheet: &Sheet,
    subject_id: SubjectId,
    tz: Tz,
) -> Result<Vec<MedicationEvent>> {
    let date = DateColumns::find(sheet)?;
    let time_col = sheet.column(HEADER_ROW, MEDS_TIME)?;
    let pd_col = sheet.column(HEADER_ROW, PD_MEDS)?;
    let other_col = sheet.column(HEADER_ROW, OTHER_MEDS)?;
    let all_cols = [date.day, date.month, date.year, time_col, pd_col, other_col];

    let mut events = vec![];
    for row in HEADER_ROW + 1..sheet.height() {
        let time = sheet.cell(row, time_col);
        if !date.is_complete(sheet, row) || !is_time_of_day(time) {
            if !is_blank(sheet, row, &all_cols) {
                event!(
                    Level::DEBUG,
                    "{}: skipping incomplete medication diary row {}",
                    subject_id,
                    row + 1
                );
            }
            continue;
        }
        let Some(timestamp) = date.timestamp(sheet, row, time, tz) else {
            event!(
                Level::WARN,
                "{}: medication diary row {} isn't a valid local time, skipping",
                subject_id,
                row + 1
            );
            continue;
        };
        events.push(MedicationEvent {
            subject_id,
            timestamp,
            pd_related_medications: sheet.cell(row, pd_col).as_text(),
            other_medications: sheet.cell(row, other_col).as_text(),
        });
    }
    Ok(events)
}

/// Pairs up sleep and wake events into intervals.
///
/// A wake pairs with the sleep before it. A wake with no sleep before it, or a sleep followed by
/// another sleep, gives an interval with one end missing.
#[derive(Debug)]
pub struct SleepPairing {
    subject_id: SubjectId,
    /// A sleep waiting for its wake. The sleep time itself may be unknown.
    pending: Option<Option<i64>>,
    intervals: Vec<SleepInterval>,
}

impl SleepPairing {
    pub fn new(subject_id: SubjectId) -> Self {
        SleepPairing {
            subject_id,
            pending: None,
            intervals: vec![],
        }
    }

    pub fn sleep(&mut self, timestamp: Option<i64>) {
        if let Some(previous) = self.pending.replace(timestamp) {
            self.emit(previous, None);
        }
    }

    pub fn wake(&mut self, timestamp: Option<i64>) {
        let sleep = self.pending.take().flatten();
        self.emit(sleep, timestamp);
    }

    pub fn finish(mut self) -> Vec<SleepInterval> {
        if let Some(sleep) = self.pending.take() {
            self.emit(sleep, None);
        }
        self.intervals
    }

    fn emit(&mut self, sleep: Option<i64>, wake: Option<i64>) {
        self.intervals.push(SleepInterval {
            subject_id: self.subject_id,
            sleep,
            wake,
        });
    }
}

pub fn extract_sleep(sheet: &Sheet, subject_id: SubjectId, tz: Tz) -> Result<Vec<SleepInterval>> {
    let date = DateColumns::find(sheet)?;
    let sleep_col = sheet.column(HEADER_ROW, SLEEP_TIME)?;
    let wake_col = sheet.column(HEADER_ROW, WAKE_TIME)?;
    let all_cols = [date.day, date.month, date.year, sleep_col, wake_col];

    let mut pairing = SleepPairing::new(subject_id);
    for row in HEADER_ROW + 1..sheet.height() {
        if date.is_end(sheet, row) {
            break;
        }
        if !date.is_complete(sheet, row) {
            if !is_blank(sheet, row, &all_cols) {
                event!(
                    Level::DEBUG,
                    "{}: skipping sleep diary row {} with no date",
                    subject_id,
                    row + 1
                );
            }
            continue;
        }
        let sleep = sheet.cell(row, sleep_col);
        if is_time_of_day(sleep) {
            pairing.sleep(date.timestamp(sheet, row, sleep, tz));
        }
        let wake = sheet.cell(row, wake_col);
        if is_time_of_day(wake) {
            pairing.wake(date.timestamp(sheet, row, wake, tz));
        }
    }
    Ok(pairing.finish())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{datetime::parse_tz, subject::Site};

    fn subject() -> SubjectId {
        SubjectId::new(3, Site::Bos)
    }

    fn pairs(intervals: &[SleepInterval]) -> Vec<(Option<i64>, Option<i64>)> {
        intervals.iter().map(|i| (i.sleep, i.wake)).collect()
    }

    #[test]
    fn pairing() {
        let mut p = SleepPairing::new(subject());
        p.sleep(Some(1));
        p.wake(Some(2));
        p.wake(Some(3));
        assert_eq!(pairs(&p.finish()), [(Some(1), Some(2)), (None, Some(3))]);

        let mut p = SleepPairing::new(subject());
        p.wake(Some(1));
        assert_eq!(pairs(&p.finish()), [(None, Some(1))]);

        let mut p = SleepPairing::new(subject());
        p.sleep(Some(1));
        p.sleep(Some(2));
        assert_eq!(pairs(&p.finish()), [(Some(1), None), (Some(2), None)]);

        let mut p = SleepPairing::new(subject());
        p.sleep(Some(1));
        p.sleep(Some(2));
        p.wake(Some(3));
        assert_eq!(pairs(&p.finish()), [(Some(1), None), (Some(2), Some(3))]);

        assert!(SleepPairing::new(subject()).finish().is_empty());
    }

    fn header(names: &[&str]) -> Vec<Cell> {
        names.iter().map(|n| Cell::text(*n)).collect()
    }

    fn date(day: f64, month: f64) -> [Cell; 3] {
        [Cell::Number(day), Cell::Number(month), Cell::Number(2019.)]
    }

    fn sleep_sheet(rows: Vec<([Cell; 3], &str, &str)>) -> Sheet {
        let mut cells = vec![vec![], vec![], vec![]];
        cells.push(header(&[DAY, MONTH, YEAR, SLEEP_TIME, WAKE_TIME]));
        for ([day, month, year], sleep, wake) in rows {
            cells.push(vec![day, month, year, Cell::text(sleep), Cell::text(wake)]);
        }
        Sheet::new(cells)
    }

    #[test]
    fn sleep_rows() {
        let tz = parse_tz("America/New_York").unwrap();
        let select = || Cell::text(SELECT_FROM_LIST);
        let sheet = sleep_sheet(vec![
            // asleep 22:00 on the 14th, woke 06:30 on the 15th
            (date(14., 1.), "22:00:00", ""),
            (date(15., 1.), "", "06:30:00"),
            // both on one row: the sleep is handled first
            (date(15., 1.), "23:00:00", "07:00:00"),
            // no date, ignored
            ([Cell::Empty, Cell::Empty, Cell::Empty], "23:00:00", ""),
            (date(16., 1.), "23:30:00", ""),
            ([select(), select(), Cell::Empty], "", ""),
            (date(20., 1.), "", "08:00:00"),
        ]);
        let intervals = extract_sleep(&sheet, subject(), tz).unwrap();
        assert_eq!(
            pairs(&intervals),
            [
                (Some(1547521200), Some(1547551800)),
                (Some(1547611200), Some(1547553600)),
                (Some(1547699400), None),
            ]
        );
    }

    #[test]
    fn sleep_needs_its_columns() {
        let tz = parse_tz("America/New_York").unwrap();
        let sheet = Sheet::new(vec![vec![], vec![], vec![], header(&[DAY, MONTH, YEAR])]);
        assert!(extract_sleep(&sheet, subject(), tz).is_err());
    }

    #[test]
    fn medication_rows() {
        let tz = parse_tz("America/New_York").unwrap();
        let mut cells = vec![vec![], vec![], vec![]];
        cells.push(header(&[DAY, MONTH, YEAR, MEDS_TIME, PD_MEDS, OTHER_MEDS]));
        let [d, m, y] = date(15., 1.);
        cells.push(vec![d, m, y, Cell::text("08:30:00"), Cell::text("Sinemet"), Cell::Empty]);
        // time not in hh:mm:ss
        let [d, m, y] = date(15., 1.);
        cells.push(vec![d, m, y, Cell::text("8:30"), Cell::text("Sinemet"), Cell::Empty]);
        // no year
        cells.push(vec![
            Cell::Number(15.),
            Cell::Number(1.),
            Cell::text("<Select from list>"),
            Cell::text("09:30:00"),
            Cell::Empty,
            Cell::text("Aspirin"),
        ]);
        // 30th of February
        let [d, m, y] = date(30., 2.);
        cells.push(vec![d, m, y, Cell::text("09:30:00"), Cell::Empty, Cell::text("Aspirin")]);
        let events = extract_medications(&Sheet::new(cells), subject(), tz).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 1547559000);
        assert_eq!(events[0].pd_related_medications.as_deref(), Some("Sinemet"));
        assert_eq!(events[0].other_medications, None);
    }
}
