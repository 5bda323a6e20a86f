use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List `*.json` files directly inside `dir`, sorted by path.
/// When `name_filter` is given, only file names matching it are kept.
/// A missing directory yields an empty list.
pub fn discover_json_files(dir: &Path, name_filter: Option<&Regex>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if !dir.exists() {
        return files;
    }
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let ent = match entry {
            Ok(ent) => ent,
            Err(e) => {
                tracing::warn!("skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !ent.file_type().is_file() {
            continue;
        }
        let Some(name) = ent.file_name().to_str() else { continue };
        if !name.ends_with(".json") {
            continue;
        }
        if let Some(re) = name_filter {
            if !re.is_match(name) {
                continue;
            }
        }
        files.push(ent.path().to_path_buf());
    }
    files.sort();
    files
}
