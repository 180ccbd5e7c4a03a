//! Subject metadata, from one questionnaire workbook per subject.
//!
//! Each workbook has a sheet per instrument: the subject questionnaire, the two controlled
//! sessions with their in-clinic diaries, the home medication and sleep diaries, and the feedback
//! survey. Every sheet becomes rows in its own table.
pub mod diary;
pub mod feedback;
pub mod questionnaire;
pub mod session;

pub use self::{
    diary::{MedicationEvent, SleepInterval, SleepPairing},
    feedback::FeedbackResponse,
    questionnaire::{SubjectQuestionnaire, QUESTIONNAIRE_FIELDS},
    session::{ClinicDiaryEntry, ControlledSession},
};

use crate::{
    config::{Config, METADATA},
    sheet::Workbook,
    store::DataStore,
    subject::SubjectId,
    table::Table,
};
use chrono_tz::Tz;
use qu::ick_use::*;
use std::path::Path;

/// File extensions of the workbooks.
const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

/// Every sheet read from a workbook.
pub fn sheet_names() -> Vec<&'static str> {
    let mut names = vec![
        questionnaire::SHEET,
        diary::MEDS_SHEET,
        diary::SLEEP_SHEET,
        feedback::SHEET,
    ];
    for (_, session_sheet, diary_sheet) in session::SESSION_SHEETS {
        names.push(session_sheet);
        names.push(diary_sheet);
    }
    names
}

/// Everything extracted from one subject's workbook.
#[derive(Debug, Clone)]
pub struct SubjectMetadata {
    pub questionnaire: SubjectQuestionnaire,
    pub sessions: Vec<ControlledSession>,
    pub clinic_diary: Vec<ClinicDiaryEntry>,
    pub medications: Vec<MedicationEvent>,
    pub sleep: Vec<SleepInterval>,
    pub feedback: FeedbackResponse,
}

impl SubjectMetadata {
    /// Extract a subject's metadata.
    ///
    /// The questionnaire, home diaries and feedback survey must be present. The controlled
    /// session sheets were added to the workbook part way through the study and are skipped if
    /// missing.
    pub fn extract(workbook: &Workbook, subject_id: SubjectId, tz: Tz) -> Result<Self> {
        let questionnaire =
            SubjectQuestionnaire::extract(workbook.sheet(questionnaire::SHEET)?, subject_id, tz);

        let mut sessions = vec![];
        let mut clinic_diary = vec![];
        for (number, session_sheet, diary_sheet) in session::SESSION_SHEETS {
            let Some(sheet) = workbook.get(session_sheet) else {
                event!(
                    Level::DEBUG,
                    "{}: no `{}` worksheet",
                    subject_id,
                    session_sheet
                );
                continue;
            };
            let session = ControlledSession::extract(sheet, subject_id, number, tz);
            if let Some(sheet) = workbook.get(diary_sheet) {
                clinic_diary.extend(
                    ClinicDiaryEntry::extract(sheet, &session, tz)
                        .with_context(|| format!("in `{}` worksheet", diary_sheet))?,
                );
            }
            sessions.push(session);
        }

        let meds_sheet = workbook.sheet(diary::MEDS_SHEET)?;
        let medications = diary::extract_medications(meds_sheet, subject_id, tz)
            .with_context(|| format!("in `{}` worksheet", diary::MEDS_SHEET))?;
        let sleep = diary::extract_sleep(workbook.sheet(diary::SLEEP_SHEET)?, subject_id, tz)
            .with_context(|| format!("in `{}` worksheet", diary::SLEEP_SHEET))?;
        let feedback = FeedbackResponse::extract(workbook.sheet(feedback::SHEET)?, subject_id);

        Ok(SubjectMetadata {
            questionnaire,
            sessions,
            clinic_diary,
            medications,
            sleep,
            feedback,
        })
    }
}

/// The metadata of every subject, table by table.
#[derive(Debug, Clone, Default)]
pub struct MetadataTables {
    pub questionnaires: Vec<SubjectQuestionnaire>,
    pub sessions: Vec<ControlledSession>,
    pub clinic_diary: Vec<ClinicDiaryEntry>,
    pub medications: Vec<MedicationEvent>,
    pub sleep: Vec<SleepInterval>,
    pub feedback: Vec<FeedbackResponse>,
}

impl MetadataTables {
    pub fn push(&mut self, subject: SubjectMetadata) {
        self.questionnaires.push(subject.questionnaire);
        self.sessions.extend(subject.sessions);
        self.clinic_diary.extend(subject.clinic_diary);
        self.medications.extend(subject.medications);
        self.sleep.extend(subject.sleep);
        self.feedback.push(subject.feedback);
    }

    pub fn tables(&self) -> Vec<Table> {
        vec![
            Table::from_records("Subject Questionnaire", &self.questionnaires),
            Table::from_records("Controlled Session", &self.sessions),
            Table::from_records("Subject Diary", &self.clinic_diary),
            Table::from_records("Medication Diary", &self.medications),
            Table::from_records("Sleep Diary", &self.sleep),
            Table::from_records("Feedback Survey", &self.feedback),
        ]
    }
}

fn is_workbook(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Extract the metadata of every subject with a workbook in the metadata dataset.
pub fn curate_metadata(store: &impl DataStore, config: &Config) -> Result<MetadataTables> {
    let tz = config.tz()?;
    let folder = config.dataset(METADATA)?;
    let sheets = sheet_names();
    let mut tables = MetadataTables::default();
    for file in store.files(folder)? {
        if !is_workbook(&file.name) {
            event!(
                Level::WARN,
                "skipping \"{}\" in metadata folder, not a workbook",
                file.name
            );
            continue;
        }
        let subject_id = SubjectId::from_metadata_file(&file.name)?;
        event!(
            Level::INFO,
            "extracting metadata for subject {} from \"{}\"",
            subject_id,
            file.name
        );
        let fetched = store.fetch(&file.id)?;
        let workbook = Workbook::open(&fetched.path, &sheets)?;
        let subject = SubjectMetadata::extract(&workbook, subject_id, tz)
            .with_context(|| format!("extracting metadata from \"{}\"", file.name))?;
        tables.push(subject);
    }
    Ok(tables)
}
