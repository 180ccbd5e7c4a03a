use clap::Parser;
use qu::ick_use::*;
use sensor_study_curation::{curate, print_summary, Config, LocalStore, Stage};
use std::path::PathBuf;

#[derive(Parser)]
struct Opt {
    #[clap(long, default_value = "curation.toml")]
    config: PathBuf,
    #[clap(long)]
    dry_run: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = Config::load(&opt.config)?;
    event!(Level::INFO, "score layout: {:?}", config.scores.layout);
    let mut store = LocalStore::open(&config.store.root, &config.store.output)?;
    let summary = curate(&mut store, &config, &[Stage::Scores], opt.dry_run)?;
    print_summary(&summary)?;
    Ok(())
}
