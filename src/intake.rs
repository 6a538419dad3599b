//! Zip intake: exports arrive as archives and are unpacked into the source
//! root, either via the one-shot `unpack` command or from the watched inbox.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Extracts a `.zip` archive into `destination`, creating it if needed.
/// Returns the number of extracted files. A corrupt archive is an error
/// carrying the archive path.
pub fn unpack_archive(archive: &Path, destination: &Path) -> Result<usize> {
    let file = fs::File::open(archive)
        .with_context(|| format!("Failed to open archive: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(file)
        .with_context(|| format!("Not a valid zip archive: {}", archive.display()))?;

    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create directory: {}", destination.display()))?;

    let mut files = 0;
    for i in 0..zip.len() {
        if zip.by_index(i)?.is_file() {
            files += 1;
        }
    }

    zip.extract(destination)
        .with_context(|| format!("Failed to extract {}", archive.display()))?;
    log::info!(
        "extracted {} ({} files) into {}",
        archive.display(),
        files,
        destination.display()
    );

    Ok(files)
}
