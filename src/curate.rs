//! Run curation stages and store the tables they build.
use crate::{
    config::Config, inventory::curate_raw_data, metadata::curate_metadata, scores, store::DataStore,
    table::Table,
};
use itertools::Itertools;
use qu::ick_use::*;
use serde::Serialize;

#[derive(Debug, Copy, Clone, Eq, PartialEq, clap::ValueEnum)]
pub enum Stage {
    /// Inventory of the raw sensor files.
    RawData,
    /// In-clinic task scores, and home task scores if configured.
    Scores,
    /// Everything from the subject workbooks.
    Metadata,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::RawData, Stage::Scores, Stage::Metadata];

    /// Build the tables for this stage. A dry run makes no changes to the store.
    pub fn run(
        self,
        store: &mut impl DataStore,
        config: &Config,
        dry_run: bool,
    ) -> Result<Vec<Table>> {
        Ok(match self {
            Stage::RawData => vec![curate_raw_data(store, config, dry_run)?],
            Stage::Scores => {
                let mut tables = vec![scores::curate_scores(&*store, config)?];
                tables.extend(scores::curate_home_scores(&*store, config)?);
                tables
            }
            Stage::Metadata => curate_metadata(&*store, config)?.tables(),
        })
    }
}

/// One line of the report printed after a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub rows: usize,
    pub columns: usize,
    pub stored: bool,
}

/// Run `stages` in order, storing each table under the project unless `dry_run` is set.
pub fn curate(
    store: &mut impl DataStore,
    config: &Config,
    stages: &[Stage],
    dry_run: bool,
) -> Result<Vec<TableSummary>> {
    let mut summary = vec![];
    for stage in stages {
        event!(Level::INFO, "running {:?} stage", stage);
        let tables = stage
            .run(store, config, dry_run)
            .with_context(|| format!("in {:?} stage", stage))?;
        event!(
            Level::INFO,
            "{:?} stage built {}",
            stage,
            tables.iter().map(|t| &t.name).join(", ")
        );
        for table in tables {
            summary.push(store_table(store, &config.project, table, dry_run)?);
        }
    }
    Ok(summary)
}

/// Clean and check a table, then store it.
pub fn store_table(
    store: &mut impl DataStore,
    project: &str,
    mut table: Table,
    dry_run: bool,
) -> Result<TableSummary> {
    table.clean_numeric_cols();
    table
        .validate()
        .with_context(|| format!("table \"{}\" is not valid", table.name))?;
    if dry_run {
        event!(Level::INFO, "dry run, not storing \"{}\"", table.name);
    } else {
        store
            .store_table(project, &table)
            .with_context(|| format!("storing \"{}\"", table.name))?;
    }
    Ok(TableSummary {
        table: table.name,
        rows: table.rows.len(),
        columns: table.columns.len(),
        stored: !dry_run,
    })
}

pub fn print_summary(summary: &[TableSummary]) -> Result {
    crate::header("Curated tables");
    println!("{}", term_data_table::Table::from_serde(summary.iter())?);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::{RawDataSource, ScoresConfig, StoreConfig, METADATA, TASKS_AND_SCORES},
        store::test::MockStore,
        table::{Column, ColumnType},
    };

    fn config() -> Config {
        Config {
            project: "project".into(),
            timezone: "America/New_York".into(),
            store: StoreConfig {
                root: "store".into(),
                output: "output".into(),
            },
            datasets: [
                (METADATA, "metadata"),
                (TASKS_AND_SCORES, "scores.tsv"),
                ("pebble", "pebble"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            scores: ScoresConfig::default(),
            raw_data: vec![RawDataSource {
                dataset: "pebble".into(),
                device: "Pebble".into(),
                position: None,
                timestamp_range: false,
            }],
        }
    }

    fn store() -> MockStore {
        let mut store = MockStore::default();
        let subject = store.folder("pebble", "3");
        store.file(&subject, "day1.tsv", 10);
        store.file(&subject, "day2.tsv", 11);
        store
    }

    #[test]
    fn stores_tables_in_project() {
        let mut store = store();
        let summary = curate(&mut store, &config(), &[Stage::RawData], false).unwrap();
        assert_eq!(
            summary,
            [TableSummary {
                table: "Sensor Measurements".into(),
                rows: 2,
                columns: 8,
                stored: true,
            }]
        );
        assert_eq!(store.stored.len(), 1);
        assert_eq!(store.stored[0].0, "project");
        assert_eq!(store.copy_batches, [2]);
    }

    #[test]
    fn dry_run_stores_nothing() {
        let mut store = store();
        let summary =
            curate(&mut store, &config(), &[Stage::RawData, Stage::Metadata], true).unwrap();
        assert!(store.stored.is_empty());
        assert!(store.copy_batches.is_empty());
        // the raw data table and the six (empty) metadata tables
        assert_eq!(summary.len(), 7);
        assert!(summary.iter().all(|s| !s.stored));
        assert!(summary[1..].iter().all(|s| s.rows == 0));
    }

    #[test]
    fn dry_run_keeps_source_handles() {
        let mut store = store();
        let tables = Stage::RawData.run(&mut store, &config(), true).unwrap();
        let col = tables[0].column_index("data_file_handle_id").unwrap();
        let handles = tables[0]
            .rows
            .iter()
            .map(|row| row[col].as_str())
            .collect::<Vec<_>>();
        assert_eq!(handles, ["10", "11"]);
        assert!(store.copy_batches.is_empty());

        let tables = Stage::RawData.run(&mut store, &config(), false).unwrap();
        assert_eq!(tables[0].rows[0][col], "1000010");
        assert_eq!(store.copy_batches, [2]);
    }

    #[test]
    fn numbers_cleaned_before_storing() {
        let mut store = MockStore::default();
        let mut table = Table::new("t", vec![Column::new("n", ColumnType::Integer)]);
        table.rows = vec![vec!["3.0".into()], vec!["nan".into()]];
        store_table(&mut store, "project", table, false).unwrap();
        assert_eq!(store.stored[0].1.rows, [["3"], [""]]);
    }

    #[test]
    fn invalid_tables_are_not_stored() {
        let mut store = MockStore::default();
        let mut table = Table::new("t", vec![Column::string("s", 2)]);
        table.rows = vec![vec!["too long".into()]];
        assert!(store_table(&mut store, "project", table, false).is_err());
        assert!(store.stored.is_empty());
    }
}
