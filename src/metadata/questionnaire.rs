//! The subject questionnaire: one column of answers, one answer per row.
//!
//! The questionnaire's layout is fixed, so every field is read from a known row. Dates are split
//! over three rows (day, month, year) and the last levodopa dose adds a fourth (time of day).
use crate::{
    datetime::{cells_timestamp, iso_date},
    sheet::Sheet,
    subject::SubjectId,
    table::{Column, ColumnType, Record},
};
use chrono_tz::Tz;

pub const SHEET: &str = "Subject_Questionnaire";
/// Answers are in column B.
const ANSWER_COL: usize = 1;

const SHORT: ColumnType = ColumnType::String { max_size: 100 };

/// Where a field's value comes from. Rows are 0-based sheet rows.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Source {
    Cell(usize),
    /// Rendered as `YYYY-MM-DD` if all three parts are present.
    IsoDate {
        day: usize,
        month: usize,
        year: usize,
    },
    /// Epoch seconds.
    Timestamp {
        day: usize,
        month: usize,
        year: usize,
        time: usize,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub source: Source,
    pub column_type: ColumnType,
}

const fn field(name: &'static str, source: Source, column_type: ColumnType) -> Field {
    Field {
        name,
        source,
        column_type,
    }
}

const fn cell(name: &'static str, row: usize, column_type: ColumnType) -> Field {
    field(name, Source::Cell(row), column_type)
}

pub const QUESTIONNAIRE_FIELDS: &[Field] = &[
    cell("cohort", 5, SHORT),
    cell("gender", 6, SHORT),
    cell("birth_year", 7, ColumnType::Integer),
    cell("dominant_hand", 8, SHORT),
    cell("upper_limb_length", 9, ColumnType::Double),
    cell("upper_arm_length", 10, ColumnType::Double),
    cell("lower_arm_length", 11, ColumnType::Double),
    cell("lower_limb_length", 12, ColumnType::Double),
    cell("thigh_length", 13, ColumnType::Double),
    cell("shank_length", 14, ColumnType::Double),
    cell("height", 15, ColumnType::Double),
    cell("weight", 16, ColumnType::Double),
    field(
        "visit_date",
        Source::IsoDate {
            day: 18,
            month: 19,
            year: 20,
        },
        ColumnType::String { max_size: 10 },
    ),
    cell("diagnosis_day", 23, ColumnType::Integer),
    cell("diagnosis_month", 24, SHORT),
    cell("diagnosis_year", 25, ColumnType::Integer),
    cell("pd_most_affected_side", 26, SHORT),
    cell("gait_impediments", 27, SHORT),
    cell("posture_instability", 28, SHORT),
    cell("tremor", 29, SHORT),
    cell("bradykinesia", 30, SHORT),
    cell("disrupted_sleep", 31, SHORT),
    cell("freeze_of_gait", 32, SHORT),
    cell("dyskinesia", 33, SHORT),
    cell("rigidity", 34, SHORT),
    cell("other_symptoms", 35, ColumnType::LargeText),
    field(
        "last_levodopa_dose_timestamp",
        Source::Timestamp {
            day: 38,
            month: 39,
            year: 40,
            time: 41,
        },
        ColumnType::Integer,
    ),
    cell("regular_medication", 42, ColumnType::LargeText),
    cell("geneActive_num", 45, SHORT),
    cell("pebble_num", 46, SHORT),
    cell("geneActive_hand", 47, SHORT),
    cell("pebble_hand", 48, SHORT),
    cell("smartphone_location", 49, SHORT),
    cell("recording_start", 50, SHORT),
    cell("recording_end", 51, SHORT),
    cell("timezone", 52, SHORT),
    cell("updrs_time", 55, SHORT),
    cell("updrs_score_p1", 56, ColumnType::Integer),
    cell("updrs_score_p2", 57, ColumnType::Integer),
    cell("updrs_score_p3", 58, ColumnType::Integer),
    cell("updrs_score_p4", 59, ColumnType::Integer),
    cell("h_and_y_score", 60, ColumnType::Double),
    cell("updrs_second_visit_time", 63, SHORT),
    cell("updrs_second_visit_score_p3", 64, ColumnType::Integer),
];

/// One subject's questionnaire answers, in [`QUESTIONNAIRE_FIELDS`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectQuestionnaire {
    pub subject_id: SubjectId,
    pub values: Vec<Option<String>>,
}

impl SubjectQuestionnaire {
    pub fn extract(sheet: &Sheet, subject_id: SubjectId, tz: Tz) -> Self {
        let answer = |row| sheet.cell(row, ANSWER_COL);
        let values = QUESTIONNAIRE_FIELDS
            .iter()
            .map(|field| match field.source {
                Source::Cell(row) => answer(row).as_text(),
                Source::IsoDate { day, month, year } => {
                    iso_date(answer(day), answer(month), answer(year))
                }
                Source::Timestamp {
                    day,
                    month,
                    year,
                    time,
                } => cells_timestamp(tz, answer(day), answer(month), answer(year), answer(time))
                    .map(|ts| ts.to_string()),
            })
            .collect();
        SubjectQuestionnaire { subject_id, values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        let idx = QUESTIONNAIRE_FIELDS.iter().position(|f| f.name == name)?;
        self.values.get(idx)?.as_deref()
    }
}

impl Record for SubjectQuestionnaire {
    fn columns() -> Vec<Column> {
        let mut columns = vec![Column::string("subject_id", 6)];
        columns.extend(
            QUESTIONNAIRE_FIELDS
                .iter()
                .map(|f| Column::new(f.name, f.column_type)),
        );
        columns
    }

    fn row(&self) -> Vec<String> {
        let mut row = vec![self.subject_id.to_string()];
        row.extend(self.values.iter().map(|v| v.clone().unwrap_or_default()));
        row
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{datetime::parse_tz, sheet::Cell, subject::Site};
    use chrono::NaiveTime;
    use std::collections::BTreeSet;

    fn sheet(answers: &[(usize, Cell)]) -> Sheet {
        let mut rows = vec![vec![Cell::Empty; 2]; 66];
        for (row, value) in answers {
            rows[*row][ANSWER_COL] = value.clone();
        }
        Sheet::new(rows)
    }

    #[test]
    fn field_map_is_consistent() {
        assert_eq!(QUESTIONNAIRE_FIELDS.len(), 44);
        let names = QUESTIONNAIRE_FIELDS
            .iter()
            .map(|f| f.name)
            .collect::<BTreeSet<_>>();
        assert_eq!(names.len(), QUESTIONNAIRE_FIELDS.len());
        let mut rows = BTreeSet::new();
        for field in QUESTIONNAIRE_FIELDS {
            let used = match field.source {
                Source::Cell(row) => vec![row],
                Source::IsoDate { day, month, year } => vec![day, month, year],
                Source::Timestamp {
                    day,
                    month,
                    year,
                    time,
                } => vec![day, month, year, time],
            };
            for row in used {
                assert!(rows.insert(row), "row {} used twice", row);
            }
        }
    }

    #[test]
    fn extracts_answers() {
        let sheet = sheet(&[
            (5, Cell::text("PD")),
            (6, Cell::text("Unknown")),
            (7, Cell::Number(1950.)),
            (15, Cell::Number(172.5)),
            (18, Cell::Number(3.)),
            (19, Cell::Number(4.)),
            (20, Cell::Number(2018.)),
            (38, Cell::Number(15.)),
            (39, Cell::Number(1.)),
            (40, Cell::Number(2019.)),
            (41, Cell::Time(NaiveTime::from_hms_opt(8, 30, 0).unwrap())),
            (64, Cell::Number(31.)),
        ]);
        let tz = parse_tz("America/New_York").unwrap();
        let q = SubjectQuestionnaire::extract(&sheet, SubjectId::new(3, Site::Bos), tz);
        assert_eq!(q.get("cohort"), Some("PD"));
        assert_eq!(q.get("gender"), None);
        assert_eq!(q.get("birth_year"), Some("1950"));
        assert_eq!(q.get("height"), Some("172.5"));
        assert_eq!(q.get("visit_date"), Some("2018-04-03"));
        assert_eq!(q.get("last_levodopa_dose_timestamp"), Some("1547559000"));
        assert_eq!(q.get("updrs_second_visit_score_p3"), Some("31"));

        let row = q.row();
        assert_eq!(row.len(), SubjectQuestionnaire::columns().len());
        assert_eq!(row[0], "3_BOS");
    }

    #[test]
    fn partial_dates_are_missing() {
        let sheet = sheet(&[
            (18, Cell::Number(3.)),
            (19, Cell::text("<Select from list>")),
            (20, Cell::Number(2018.)),
            (38, Cell::Number(15.)),
            (39, Cell::Number(1.)),
            (40, Cell::Number(2019.)),
        ]);
        let tz = parse_tz("America/New_York").unwrap();
        let q = SubjectQuestionnaire::extract(&sheet, SubjectId::new(9, Site::Nyc), tz);
        assert_eq!(q.get("visit_date"), None);
        assert_eq!(q.get("last_levodopa_dose_timestamp"), None);
    }
}
