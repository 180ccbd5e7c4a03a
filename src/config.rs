//! Curation configuration.
//!
//! Where things live in the store is not baked into the code. Each job reads a toml file naming
//! the datasets it uses, the raw sensor folders to inventory, and the study's time zone.
use crate::{datetime::parse_tz, scores::ScoreLayout};
use chrono_tz::Tz;
use qu::ick_use::*;
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Dataset holding one questionnaire workbook per subject.
pub const METADATA: &str = "metadata";
/// Dataset holding the wide table of in-clinic task scores.
pub const TASKS_AND_SCORES: &str = "tasks_and_scores";
/// Optional dataset holding the home task scores.
pub const TASKS_AND_SCORES_HOME: &str = "tasks_and_scores_home";
/// Optional dataset mapping (subject, device) to the wrist a device was worn on.
pub const DEVICE_SIDES: &str = "device_sides";

fn default_timezone() -> String {
    "America/New_York".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Where curated tables are stored.
    pub project: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub store: StoreConfig,
    /// Logical dataset name to store id.
    pub datasets: BTreeMap<String, String>,
    #[serde(default)]
    pub scores: ScoresConfig,
    #[serde(default)]
    pub raw_data: Vec<RawDataSource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Root of the local mirror of the store.
    pub root: PathBuf,
    /// Where stored tables are written.
    pub output: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoresConfig {
    #[serde(default)]
    pub layout: ScoreLayout,
}

/// One device folder to inventory.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDataSource {
    /// Key into `datasets`.
    pub dataset: String,
    pub device: String,
    /// Where the device was worn, if the same for every subject.
    #[serde(default)]
    pub position: Option<String>,
    /// Download every file to find its first and last timestamp. Slow for large studies.
    #[serde(default = "default_true")]
    pub timestamp_range: bool,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Config> {
            let text = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&text)?;
            config.validate()?;
            Ok(config)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("loading config from \"{}\"", path.display()))
    }

    /// Check the config refers to things that exist.
    pub fn validate(&self) -> Result {
        self.tz()?;
        self.dataset(METADATA)?;
        self.dataset(TASKS_AND_SCORES)?;
        for source in &self.raw_data {
            self.dataset(&source.dataset)?;
        }
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        parse_tz(&self.timezone)
    }

    /// The store id of a dataset.
    pub fn dataset(&self, name: &str) -> Result<&str> {
        self.datasets
            .get(name)
            .map(String::as_str)
            .with_context(|| format!("no dataset called \"{}\" in config", name))
    }

    /// The store id of a dataset that may not be configured.
    pub fn optional_dataset(&self, name: &str) -> Option<&str> {
        self.datasets.get(name).map(String::as_str)
    }
}
