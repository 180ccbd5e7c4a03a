//! Task scores.
//!
//! Clinicians score each task for each phenotype and body region. The scores arrive as one wide
//! row per task with a `{phenotype}_{BodyRegion}` column per combination, and are stored long,
//! one row per score.
use crate::{
    config::{Config, TASKS_AND_SCORES, TASKS_AND_SCORES_HOME},
    store::DataStore,
    subject::{translate_subject_id, SubjectId},
    table::{Column, ColumnType, Record, Table},
    tsv::Tsv,
};
use qu::ick_use::*;
use serde::Deserialize;
use std::cmp::Ordering;

pub const PHENOTYPES: [&str; 3] = ["tremor", "dyskinesia", "bradykinesia"];

/// Columns renamed when the home scores are passed through.
const HOME_RENAMES: [(&str, &str); 3] = [
    ("time_start", "timestamp_start"),
    ("time_end", "timestamp_end"),
    ("time_since_last_med_intake", "seconds_since_last_med_intake"),
];

/// Which body regions were scored.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreLayout {
    /// Both legs scored together.
    #[default]
    CombinedLowerLimbs,
    /// Each limb scored separately.
    PerLimb,
}

impl ScoreLayout {
    pub fn body_regions(self) -> &'static [&'static str] {
        match self {
            ScoreLayout::CombinedLowerLimbs => &["RightUpperLimb", "LeftUpperLimb", "LowerLimbs"],
            ScoreLayout::PerLimb => &[
                "RightUpperLimb",
                "LeftUpperLimb",
                "RightLowerLimb",
                "LeftLowerLimb",
            ],
        }
    }

    /// The score columns of the wide table, phenotype by phenotype.
    pub fn value_columns(self) -> Vec<String> {
        PHENOTYPES
            .iter()
            .flat_map(|phenotype| {
                self.body_regions()
                    .iter()
                    .map(move |region| format!("{}_{}", phenotype, region))
            })
            .collect()
    }
}

/// One score for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRecord {
    pub subject_id: SubjectId,
    pub visit: String,
    pub session: String,
    pub task_id: String,
    pub task_code: String,
    pub timestamp_start: String,
    pub timestamp_end: String,
    pub phenotype: String,
    pub body_region: String,
    /// Empty when the task wasn't scored for this phenotype and region.
    pub score: String,
}

impl Record for ScoreRecord {
    fn columns() -> Vec<Column> {
        vec![
            Column::string("subject_id", 6),
            Column::new("visit", ColumnType::Integer),
            Column::new("session", ColumnType::Integer),
            Column::new("task_id", ColumnType::Integer),
            Column::string("task_code", 50),
            Column::new("timestamp_start", ColumnType::Double),
            Column::new("timestamp_end", ColumnType::Double),
            Column::string("phenotype", 20),
            Column::string("body_region", 20),
            Column::new("score", ColumnType::Double),
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.subject_id.to_string(),
            self.visit.clone(),
            self.session.clone(),
            self.task_id.clone(),
            self.task_code.clone(),
            self.timestamp_start.clone(),
            self.timestamp_end.clone(),
            self.phenotype.clone(),
            self.body_region.clone(),
            self.score.clone(),
        ]
    }
}

/// Positions of the id columns in the wide table.
struct IdColumns {
    subject_id: usize,
    visit: usize,
    session: usize,
    task_id: usize,
    task_code: usize,
    timestamp_start: usize,
    timestamp_end: usize,
}

impl IdColumns {
    fn find(wide: &Tsv) -> Result<Self> {
        Ok(IdColumns {
            subject_id: wide.column(&["subject_id"])?,
            visit: wide.column(&["visit"])?,
            session: wide.column(&["session"])?,
            task_id: wide.column(&["task_id"])?,
            task_code: wide.column(&["task_code"])?,
            timestamp_start: wide.column(&["timestamp_start", "time_start"])?,
            timestamp_end: wide.column(&["timestamp_end", "time_end"])?,
        })
    }
}

/// Turn the wide score table into one record per score.
///
/// Every wide row gives exactly one record per value column, scored or not. Records are sorted by
/// subject, visit, session and start time (the order is stable, so the value columns of one task
/// stay in order), and only then is the numeric subject id translated.
pub fn reshape(wide: &Tsv, layout: ScoreLayout) -> Result<Vec<ScoreRecord>> {
    let ids = IdColumns::find(wide)?;
    let values = layout
        .value_columns()
        .into_iter()
        .map(|name| {
            let col = wide.column(&[name.as_str()])?;
            let (phenotype, region) = name
                .split_once('_')
                .with_context(|| format!("score column `{}` has no body region", name))?;
            Ok((col, phenotype.to_string(), region.to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut long = Vec::with_capacity(wide.rows.len() * values.len());
    for (row_idx, row) in wide.rows.iter().enumerate() {
        let raw_id = cell(row, ids.subject_id);
        let subject = parse_raw_subject(&raw_id)
            .with_context(|| format!("row {} of the score table", row_idx + 1))?;
        for (col, phenotype, region) in values.iter() {
            long.push((
                subject,
                ScoreRecord {
                    subject_id: SubjectId::from_score_id(subject)?,
                    visit: cell(row, ids.visit),
                    session: cell(row, ids.session),
                    task_id: cell(row, ids.task_id),
                    task_code: cell(row, ids.task_code),
                    timestamp_start: cell(row, ids.timestamp_start),
                    timestamp_end: cell(row, ids.timestamp_end),
                    phenotype: phenotype.clone(),
                    body_region: region.clone(),
                    score: missing_as_empty(cell(row, *col)),
                },
            ));
        }
    }

    long.sort_by(|(a_id, a), (b_id, b)| {
        a_id.cmp(b_id)
            .then_with(|| numeric_cmp(&a.visit, &b.visit))
            .then_with(|| numeric_cmp(&a.session, &b.session))
            .then_with(|| numeric_cmp(&a.timestamp_start, &b.timestamp_start))
    });
    Ok(long.into_iter().map(|(_, record)| record).collect())
}

/// Fetch and reshape the in-clinic scores.
pub fn curate_scores(store: &impl DataStore, config: &Config) -> Result<Table> {
    let id = config.dataset(TASKS_AND_SCORES)?;
    event!(Level::INFO, "reshaping task scores from \"{}\"", id);
    let file = store.fetch(id)?;
    let wide = Tsv::load(&file.path)?;
    let records = reshape(&wide, config.scores.layout)
        .with_context(|| format!("reshaping task scores from \"{}\"", id))?;
    Ok(Table::from_records("Task Scores", &records))
}

/// Pass the home scores through with canonical subject ids and column names.
pub fn home_scores(mut scores: Tsv) -> Result<Table> {
    for header in scores.headers.iter_mut() {
        if let Some((_, to)) = HOME_RENAMES.iter().find(|(from, _)| *from == header.as_str()) {
            *header = to.to_string();
        }
    }
    let subject_col = scores.column(&["subject_id"])?;
    for (row_idx, row) in scores.rows.iter_mut().enumerate() {
        if let Some(cell) = row.get_mut(subject_col) {
            let raw = parse_raw_subject(cell)
                .with_context(|| format!("row {} of the home score table", row_idx + 1))?;
            *cell = translate_subject_id(raw)?;
        }
    }
    Ok(Table::infer("Task Scores (Home)", scores.headers, scores.rows))
}

/// The home scores, if the study has any.
pub fn curate_home_scores(store: &impl DataStore, config: &Config) -> Result<Option<Table>> {
    let Some(id) = config.optional_dataset(TASKS_AND_SCORES_HOME) else {
        return Ok(None);
    };
    event!(Level::INFO, "passing through home task scores from \"{}\"", id);
    let file = store.fetch(id)?;
    home_scores(Tsv::load(&file.path)?).map(Some)
}

/// Subject ids are integers, but may have been written as floats (`12.0`).
fn parse_raw_subject(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(id);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.fract() == 0. && v.is_finite() => Ok(v as i64),
        _ => bail!("\"{}\" is not a numeric subject id", raw),
    }
}

fn cell(row: &[String], col: usize) -> String {
    row.get(col).cloned().unwrap_or_default()
}

fn missing_as_empty(value: String) -> String {
    if value == "nan" || value == "NaN" {
        String::new()
    } else {
        value
    }
}

/// Compare as numbers, with values that aren't numbers last.
fn numeric_cmp(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.total_cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => Ordering::Equal,
    }
}
