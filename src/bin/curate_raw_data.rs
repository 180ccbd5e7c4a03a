use clap::Parser;
use qu::ick_use::*;
use sensor_study_curation::{curate, header, print_summary, Config, LocalStore, Stage};
use std::path::PathBuf;

#[derive(Parser)]
struct Opt {
    #[clap(long, default_value = "curation.toml")]
    config: PathBuf,
    #[clap(long)]
    dry_run: bool,
    /// Also list every file handle copied.
    #[clap(long, short)]
    show_copies: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let config = Config::load(&opt.config)?;
    let mut store = LocalStore::open(&config.store.root, &config.store.output)?;
    let summary = curate(&mut store, &config, &[Stage::RawData], opt.dry_run)?;
    print_summary(&summary)?;

    if opt.show_copies {
        header("File handle copies");
        println!(
            "{}",
            term_data_table::Table::from_serde(store.copies().iter())?
        );
    }
    Ok(())
}
