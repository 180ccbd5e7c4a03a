use clap::Parser;
use qu::ick_use::*;
use sensor_study_curation::{
    curate, header, metadata::sheet_names, print_summary, Config, LocalStore, Stage,
};
use std::path::PathBuf;

#[derive(Parser)]
struct Opt {
    #[clap(long, default_value = "curation.toml")]
    config: PathBuf,
    #[clap(long)]
    dry_run: bool,
    /// Print the worksheets read from each workbook and exit.
    #[clap(long)]
    list_sheets: bool,
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    if opt.list_sheets {
        header("Worksheets");
        for name in sheet_names() {
            println!("{}", name);
        }
        return Ok(());
    }
    let config = Config::load(&opt.config)?;
    let mut store = LocalStore::open(&config.store.root, &config.store.output)?;
    let summary = curate(&mut store, &config, &[Stage::Metadata], opt.dry_run)?;
    print_summary(&summary)?;
    Ok(())
}
