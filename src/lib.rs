//! Curation jobs for a wearable sensor study of people with Parkinson's disease.
//!
//! Each job reads raw files from a [`DataStore`], builds one or more [`Table`]s and stores them
//! back. The jobs are independent: the raw sensor inventory ([`inventory`]), the task score
//! reshaper ([`scores`]) and the subject metadata extractor ([`metadata`]).
pub mod config;
pub mod curate;
pub mod datetime;
pub mod inventory;
pub mod metadata;
pub mod scores;
pub mod sheet;
pub mod store;
pub mod subject;
pub mod table;
pub mod tsv;
mod util;

pub use anyhow::{Context, Error};

pub use crate::{
    config::Config,
    curate::{curate, print_summary, Stage, TableSummary},
    store::{DataStore, LocalStore},
    subject::{translate_subject_id, Site, SubjectId},
    table::{parse_float_to_int, Table},
    util::header,
};

pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
