use anyhow::Result;
use indicatif::MultiProgress;
use jsonpool::{discover_json_files, set_global_multiprogress, IngestOptions, JsonIngest};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DATA_ROOT: &str = "./data";

fn main() -> Result<()> {
    let mp = Arc::new(MultiProgress::new());
    set_global_multiprogress(mp.clone());

    let mut files: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if files.is_empty() {
        files = discover_json_files(Path::new(DATA_ROOT), None);
    }

    let output = JsonIngest::from_options(IngestOptions::from_env())
        .progress(true)
        .progress_label("Reading JSON files")
        .run(files)?;

    // Print through the MultiProgress so lines don't tear the bar.
    for failure in &output.failures {
        mp.println(failure.to_string())?;
    }
    println!(
        "Collected {} records ({} failed files)",
        output.record_count(),
        output.failure_count()
    );

    Ok(())
}
