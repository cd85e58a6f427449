use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Names of the executables found in a `PATH`-style list, sorted and deduped.
pub fn path_executables(paths: &str) -> Vec<String> {
    let mut commands = Vec::new();
    for dir in paths.split(':').filter(|dir| !dir.is_empty()) {
        let Ok(entries) = fs::read_dir(dir) else {
            continue;
        };
        for entry in entries.filter_map(|r| r.ok()) {
            if is_executable(&entry.path()) {
                if let Some(name) = entry.file_name().to_str() {
                    commands.push(name.to_string());
                }
            }
        }
    }
    commands.sort();
    commands.dedup();
    commands
}

pub fn is_executable(path: &Path) -> bool {
    match path.metadata() {
        Ok(metadata) => metadata.is_file() && metadata.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}
