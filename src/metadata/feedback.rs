//! The feedback survey filled in at the end of the study.
use crate::{
    sheet::{Cell, Sheet},
    subject::{first_number, SubjectId},
    table::{opt, Column, ColumnType, Record},
};
use once_cell::sync::Lazy;
use qu::ick_use::*;
use regex::Regex;

pub const SHEET: &str = "Feedback_Questionnaire";

/// Questions in column A, answers in column B, starting after the header row.
const HEADER_ROW: usize = 2;
const QUESTION_COL: usize = 0;
const ANSWER_COL: usize = 1;

/// Questions 1 to 6 are answered on a numbered scale.
const SCALE_QUESTIONS: usize = 6;
/// "No answer" for the free text questions.
const NO_ANSWER: &str = "--";

/// Column names, by question number.
pub const FEEDBACK_FIELDS: [&str; 9] = [
    "charge_smartphone",
    "charge_pebble",
    "experience_watches",
    "experience_devices",
    "clearness_diary",
    "accuracy_diary",
    "additional_feedback_device_phone",
    "additional_feedback_diary",
    "additional_feedback_experiment",
];

static QUESTION_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d+)").unwrap());

/// One subject's survey answers. Always one per subject, even if nothing was answered.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackResponse {
    pub subject_id: SubjectId,
    pub scale: [Option<i64>; SCALE_QUESTIONS],
    pub text: [Option<String>; FEEDBACK_FIELDS.len() - SCALE_QUESTIONS],
}

impl FeedbackResponse {
    pub fn new(subject_id: SubjectId) -> Self {
        FeedbackResponse {
            subject_id,
            scale: Default::default(),
            text: Default::default(),
        }
    }

    pub fn extract(sheet: &Sheet, subject_id: SubjectId) -> Self {
        let mut response = FeedbackResponse::new(subject_id);
        for row in HEADER_ROW + 1..sheet.height() {
            let Some(question) = question_number(sheet.cell(row, QUESTION_COL)) else {
                continue;
            };
            let answer = sheet.cell(row, ANSWER_COL);
            match question {
                1..=SCALE_QUESTIONS => response.scale[question - 1] = scale_answer(answer),
                n if n > SCALE_QUESTIONS && n <= FEEDBACK_FIELDS.len() => {
                    response.text[n - SCALE_QUESTIONS - 1] = text_answer(answer)
                }
                n => event!(
                    Level::WARN,
                    "{}: ignoring answer to unknown feedback question {}",
                    subject_id,
                    n
                ),
            }
        }
        response
    }
}

/// The number a question starts with, e.g. 3 for "3. How was ...".
fn question_number(cell: &Cell) -> Option<usize> {
    if let Cell::Number(_) = cell {
        return usize::try_from(cell.as_int()?).ok();
    }
    let text = cell.as_text()?;
    QUESTION_NUMBER.captures(&text)?.get(1)?.as_str().parse().ok()
}

/// Scale answers are either a number or text starting with one ("4 - Often").
fn scale_answer(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Number(_) => cell.as_int(),
        _ => first_number(&cell.as_text()?).map(i64::from),
    }
}

fn text_answer(cell: &Cell) -> Option<String> {
    cell.as_text().filter(|text| text != NO_ANSWER)
}

impl Record for FeedbackResponse {
    fn columns() -> Vec<Column> {
        let mut columns = vec![Column::string("subject_id", 6)];
        let (scale, text) = FEEDBACK_FIELDS.split_at(SCALE_QUESTIONS);
        columns.extend(scale.iter().map(|name| Column::new(*name, ColumnType::Integer)));
        columns.extend(text.iter().map(|name| Column::new(*name, ColumnType::LargeText)));
        columns
    }

    fn row(&self) -> Vec<String> {
        let mut row = vec![self.subject_id.to_string()];
        row.extend(self.scale.iter().map(opt));
        row.extend(self.text.iter().map(opt));
        row
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::subject::Site;

    fn survey(rows: Vec<(Cell, Cell)>) -> Sheet {
        let mut cells = vec![vec![], vec![], vec![Cell::text("Question"), Cell::text("Answer")]];
        cells.extend(rows.into_iter().map(|(q, a)| vec![q, a]));
        Sheet::new(cells)
    }

    #[test]
    fn answers() {
        let sheet = survey(vec![
            (Cell::text("1. Did you charge the phone?"), Cell::text("4 - Often")),
            (Cell::text("2. Did you charge the watch?"), Cell::text("<Select from list>")),
            (Cell::text("3) Watches"), Cell::Number(2.)),
            (Cell::Empty, Cell::text("stray answer")),
            (Cell::text("Section heading"), Cell::text("ignored")),
            (Cell::text("7. Anything about the devices?"), Cell::text("--")),
            (Cell::text("8. Anything about the diary?"), Cell::text("Too long")),
            (Cell::text("12. Unexpected"), Cell::text("ignored")),
            (Cell::text("0. Consent"), Cell::text("ignored")),
        ]);
        let response = FeedbackResponse::extract(&sheet, SubjectId::new(5, Site::Nyc));
        assert_eq!(response.scale, [Some(4), None, Some(2), None, None, None]);
        assert_eq!(response.text, [None, Some("Too long".to_string()), None]);
        let row = response.row();
        assert_eq!(row.len(), FeedbackResponse::columns().len());
        assert_eq!(row[..4], ["5_NYC", "4", "", "2"]);
    }

    #[test]
    fn two_digit_questions_are_not_question_one() {
        assert_eq!(question_number(&Cell::text("10. More")), Some(10));
        assert_eq!(question_number(&Cell::Number(9.)), Some(9));
        assert_eq!(question_number(&Cell::text("Thanks!")), None);
        assert_eq!(question_number(&Cell::text("0. Consent")), Some(0));
    }

    #[test]
    fn empty_survey_still_gives_a_row() {
        let response = FeedbackResponse::extract(&survey(vec![]), SubjectId::new(5, Site::Nyc));
        assert_eq!(response, FeedbackResponse::new(SubjectId::new(5, Site::Nyc)));
    }
}
