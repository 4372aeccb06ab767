//! Export of live pages and their images to a plain directory

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::db::StoreContext;
use crate::error::{Result, WikiError};

/// What an export wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub directory: PathBuf,
    pub pages: usize,
    pub images: usize,
}

/// Write every live page's markdown to `dir/{filename}` and every image of a
/// live page to `dir/{page_id}_{image_id}.{ext}`.
///
/// The directory is created if missing. Existing files with the same names
/// are overwritten; nothing else in the directory is touched.
#[tracing::instrument(skip(store))]
pub fn export_to_directory(store: &StoreContext, dir: &Path) -> Result<ExportReport> {
    fs::create_dir_all(dir).map_err(|e| {
        WikiError::Other(format!(
            "failed to create export directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut report = ExportReport {
        directory: dir.to_path_buf(),
        ..Default::default()
    };

    for page in store.live_pages()? {
        let path = dir.join(&page.filename);
        fs::write(&path, page.markdown.as_bytes())?;
        tracing::trace!(page_id = page.id, path = %path.display(), "exported page");
        report.pages += 1;
    }

    for image in store.live_page_images()? {
        let name = format!(
            "{}_{}.{}",
            image.page_id,
            image.id,
            image.export_extension()
        );
        fs::write(dir.join(name), &image.data)?;
        report.images += 1;
    }

    tracing::debug!(
        pages = report.pages,
        images = report.images,
        "export complete"
    );
    Ok(report)
}
