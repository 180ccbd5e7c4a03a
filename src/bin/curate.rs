use clap::Parser;
use qu::ick_use::*;
use sensor_study_curation::{curate, print_summary, Config, LocalStore, Stage};
use std::path::PathBuf;

#[derive(Parser)]
struct Opt {
    /// The curation config.
    #[clap(long, default_value = "curation.toml")]
    config: PathBuf,
    /// Build and check the tables, but don't store them.
    #[clap(long)]
    dry_run: bool,
    /// Only run these stages. Runs every stage if not given.
    #[clap(long, value_enum)]
    stage: Vec<Stage>,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = Config::load(&opt.config)?;
    let mut store = LocalStore::open(&config.store.root, &config.store.output)?;
    let stages = if opt.stage.is_empty() {
        Stage::ALL.to_vec()
    } else {
        opt.stage
    };
    let summary = curate(&mut store, &config, &stages, opt.dry_run)?;
    print_summary(&summary)?;
    Ok(())
}
