use crate::error::AppError;
use crate::index_store::Index;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Index key for a stored image path.
pub fn index_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Image files under `images_dir` that the index does not know about,
/// e.g. left behind by a run that crashed before saving the index.
pub fn find_orphans(
    images_dir: &Path,
    allowed_extensions: &HashSet<String>,
    index: &Index,
) -> Result<Vec<PathBuf>, AppError> {
    log::info!("Looking for unindexed images in {:?}", images_dir);

    let mut orphans = Vec::new();
    if !images_dir.exists() {
        log::debug!("Image directory {:?} does not exist yet.", images_dir);
        return Ok(orphans);
    }

    for entry in WalkDir::new(images_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            log::trace!("Skipping non-file entry: {:?}", entry.path());
            continue;
        }

        let path = entry.path();
        let allowed = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| allowed_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false);
        if !allowed {
            log::trace!("Skipping file due to unsupported extension: {:?}", path);
            continue;
        }

        if !index.contains(&index_key(path)) {
            log::debug!("Unindexed image: {:?}", path);
            orphans.push(path.to_path_buf());
        }
    }

    log::info!("Found {} unindexed images.", orphans.len());
    Ok(orphans)
}
