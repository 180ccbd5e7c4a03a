//! The two controlled (in-clinic) sessions and the diary kept during them.
use crate::{
    datetime::{anchored_timestamp, cell_date, is_time_of_day},
    sheet::Sheet,
    subject::SubjectId,
    table::{opt, Column, ColumnType, Record},
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use qu::ick_use::*;

/// Session number, controlled session sheet, in-clinic diary sheet.
pub const SESSION_SHEETS: [(u8, &str, &str); 2] = [
    (1, "1st Controlled_Session", "1st In Clinic Subject Diary"),
    (2, "2nd Controlled_Session", "2nd In Clinic Subject Diary"),
];

// The session date is C5:C7, the session details H6:H13 and the comments M6.
const DATE_COL: usize = 2;
const DATE_ROWS: (usize, usize, usize) = (4, 5, 6);
const DETAIL_COL: usize = 7;
const FIRST_DETAIL_ROW: usize = 5;
const COMMENTS: (usize, usize) = (5, 12);

/// The in-clinic diary's header row.
const DIARY_HEADER_ROW: usize = 3;
const DIARY_TIME: &str = "Time (hh:mm - 24 hour format)";
const DIARY_ACTIVITY: &str = "Activity";
const DIARY_COMMENTS: &str = "Comments";

#[derive(Debug, Clone, PartialEq)]
pub struct ControlledSession {
    pub subject_id: SubjectId,
    pub session: u8,
    /// Times in this session are on this day.
    pub date: Option<NaiveDate>,
    pub clinical_assessment_timestamp: Option<i64>,
    pub medication_intake_time: Option<i64>,
    pub medication_name: Option<String>,
    pub medication_dosage: Option<String>,
    pub timezone: Option<String>,
    pub stopwatch_start_time: Option<i64>,
    pub fox_insight_app_start_time: Option<i64>,
    pub geneactiv_start_time: Option<i64>,
    pub general_comments: Option<String>,
}

impl ControlledSession {
    pub fn extract(sheet: &Sheet, subject_id: SubjectId, session: u8, tz: Tz) -> Self {
        let (day, month, year) = DATE_ROWS;
        let date = cell_date(
            sheet.cell(day, DATE_COL),
            sheet.cell(month, DATE_COL),
            sheet.cell(year, DATE_COL),
        );
        let detail = |idx: usize| sheet.cell(FIRST_DETAIL_ROW + idx, DETAIL_COL);
        let time = |idx: usize| anchored_timestamp(tz, date, detail(idx));
        ControlledSession {
            subject_id,
            session,
            date,
            clinical_assessment_timestamp: time(0),
            medication_intake_time: time(1),
            medication_name: detail(2).as_text(),
            medication_dosage: detail(3).as_text(),
            timezone: detail(4).as_text(),
            stopwatch_start_time: time(5),
            fox_insight_app_start_time: time(6),
            geneactiv_start_time: time(7),
            general_comments: sheet.cell(COMMENTS.0, COMMENTS.1).as_text(),
        }
    }
}

impl Record for ControlledSession {
    fn columns() -> Vec<Column> {
        vec![
            Column::string("subject_id", 6),
            Column::new("session", ColumnType::Integer),
            Column::new("clinical_assessment_timestamp", ColumnType::Integer),
            Column::new("medication_intake_time", ColumnType::Integer),
            Column::string("medication_name", 250),
            Column::string("medication_dosage", 100),
            Column::string("timezone", 50),
            Column::new("stopwatch_start_time", ColumnType::Integer),
            Column::new("fox_insight_app_start_time", ColumnType::Integer),
            Column::new("geneActiv_start_time", ColumnType::Integer),
            Column::new("general_comments", ColumnType::LargeText),
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.subject_id.to_string(),
            self.session.to_string(),
            opt(&self.clinical_assessment_timestamp),
            opt(&self.medication_intake_time),
            opt(&self.medication_name),
            opt(&self.medication_dosage),
            opt(&self.timezone),
            opt(&self.stopwatch_start_time),
            opt(&self.fox_insight_app_start_time),
            opt(&self.geneactiv_start_time),
            opt(&self.general_comments),
        ]
    }
}

/// Something the subject did during a controlled session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicDiaryEntry {
    pub subject_id: SubjectId,
    pub session: u8,
    pub timestamp: Option<i64>,
    pub activity: Option<String>,
    pub comments: Option<String>,
}

impl ClinicDiaryEntry {
    /// Every row with a time of day, on the day of `session`.
    pub fn extract(sheet: &Sheet, session: &ControlledSession, tz: Tz) -> Result<Vec<Self>> {
        let time_col = sheet.column(DIARY_HEADER_ROW, DIARY_TIME)?;
        let activity_col = sheet.find_column(DIARY_HEADER_ROW, DIARY_ACTIVITY);
        let comments_col = sheet.find_column(DIARY_HEADER_ROW, DIARY_COMMENTS);
        let text = |row: usize, col: Option<usize>| {
            col.and_then(|col| sheet.cell(row, col).as_text())
        };

        let mut entries = vec![];
        for row in DIARY_HEADER_ROW + 1..sheet.height() {
            let time = sheet.cell(row, time_col);
            if !is_time_of_day(time) {
                continue;
            }
            entries.push(ClinicDiaryEntry {
                subject_id: session.subject_id,
                session: session.session,
                timestamp: anchored_timestamp(tz, session.date, time),
                activity: text(row, activity_col),
                comments: text(row, comments_col),
            });
        }
        Ok(entries)
    }
}

impl Record for ClinicDiaryEntry {
    fn columns() -> Vec<Column> {
        vec![
            Column::string("subject_id", 6),
            Column::new("session", ColumnType::Integer),
            Column::new("timestamp", ColumnType::Integer),
            Column::string("activity", 250),
            Column::new("comments", ColumnType::LargeText),
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.subject_id.to_string(),
            self.session.to_string(),
            opt(&self.timestamp),
            opt(&self.activity),
            opt(&self.comments),
        ]
    }
}
