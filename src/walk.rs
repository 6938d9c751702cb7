//! YAML file discovery shared by the config store and the registry loader

use std::io;
use std::path::{Path, PathBuf};

/// Every `*.yaml` file under `root`, sorted for a stable load order.
///
/// Symlinked directories are not descended into, so a link pointing back up
/// the tree cannot loop. Symlinks to files are listed. `on_error` turns an
/// I/O failure into the caller's error type along with the path it hit.
pub(crate) fn yaml_files<E>(root: &Path, on_error: impl Fn(PathBuf, io::Error) -> E) -> Result<Vec<PathBuf>, E> {
    let mut files = Vec::new();
    collect(root, &mut files).map_err(|(path, source)| on_error(path, source))?;
    files.sort();
    Ok(files)
}

fn collect(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), (PathBuf, io::Error)> {
    let failed = |source| (dir.to_path_buf(), source);
    for entry in std::fs::read_dir(dir).map_err(failed)? {
        let entry = entry.map_err(failed)?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|source| (path.clone(), source))?;

        if file_type.is_dir() {
            collect(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "yaml") && (file_type.is_file() || path.is_file()) {
            files.push(path);
        }
    }
    Ok(())
}
