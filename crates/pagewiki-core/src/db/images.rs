use std::collections::BTreeSet;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::document::Document;
use crate::error::{Result, WikiError};
use crate::map_db_err;
use crate::page::{parse_timestamp, PageId};

/// An image to attach to a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub original_filename: String,
    pub file_extension: String,
}

impl NewImage {
    /// Build from a file name and its bytes, guessing the MIME type from the
    /// extension
    pub fn from_file_name(file_name: &str, data: Vec<u8>) -> Self {
        let path = std::path::Path::new(file_name);
        let file_extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        NewImage {
            mime_type,
            data,
            width: None,
            height: None,
            original_filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_extension,
        }
    }
}

/// A stored image attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAttachment {
    pub id: i64,
    pub page_id: PageId,
    pub mime_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub original_filename: String,
    pub file_extension: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl ImageAttachment {
    /// `data:` URL with the bytes base64-encoded
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            STANDARD.encode(&self.data)
        )
    }

    /// Byte size of the stored data
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Extension for an exported copy, falling back to the MIME subtype
    pub fn export_extension(&self) -> String {
        if !self.file_extension.is_empty() {
            return self.file_extension.clone();
        }
        mime_guess::get_mime_extensions_str(&self.mime_type)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| "bin".to_string())
    }
}

const IMAGE_COLUMNS: &str = "id, page_id, mime_type, data, width, height, original_filename, \
     file_extension, created_at";

fn image_from_row(row: &Row) -> rusqlite::Result<ImageAttachment> {
    Ok(ImageAttachment {
        id: row.get(0)?,
        page_id: row.get(1)?,
        mime_type: row.get(2)?,
        data: row.get(3)?,
        width: row.get(4)?,
        height: row.get(5)?,
        original_filename: row.get(6)?,
        file_extension: row.get(7)?,
        created_at: parse_timestamp(row.get(8)?),
    })
}

fn ids_for_page_in(conn: &Connection, page_id: PageId) -> Result<BTreeSet<i64>> {
    let mut stmt = conn
        .prepare("SELECT id FROM image_attachments WHERE page_id = ?1")
        .map_err(map_db_err!("list page images"))?;
    let rows = stmt
        .query_map(params![page_id], |row| row.get(0))
        .map_err(map_db_err!("list page images"))?;
    rows.collect::<rusqlite::Result<BTreeSet<i64>>>()
        .map_err(map_db_err!("list page images"))
}

impl super::StoreContext {
    /// Attach an image to a page, returning the new attachment id
    pub fn create_image(&self, page_id: PageId, image: &NewImage) -> Result<i64> {
        let id = self.write("attach image", |conn| {
            conn.execute(
                "INSERT INTO image_attachments
                     (page_id, mime_type, data, width, height, original_filename, file_extension)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    page_id,
                    image.mime_type,
                    image.data,
                    image.width,
                    image.height,
                    image.original_filename,
                    image.file_extension,
                ],
            )
            .map_err(|e| WikiError::db_operation(&format!("attach image to page {}", page_id), e))?;
            Ok(conn.last_insert_rowid())
        })?;
        tracing::debug!(
            page_id,
            image_id = id,
            bytes = image.data.len(),
            "attached image"
        );
        Ok(id)
    }

    /// Fetch an attachment by id. Absence is `Ok(None)`.
    pub fn fetch_image(&self, id: i64) -> Result<Option<ImageAttachment>> {
        self.read(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {} FROM image_attachments WHERE id = ?1",
                    IMAGE_COLUMNS
                ),
                params![id],
                image_from_row,
            )
            .optional()
            .map_err(|e| WikiError::db_operation(&format!("fetch image {}", id), e))
        })
    }

    pub fn delete_image(&self, id: i64) -> Result<bool> {
        let changed = self.write("delete image", |conn| {
            conn.execute("DELETE FROM image_attachments WHERE id = ?1", params![id])
                .map_err(|e| WikiError::db_operation(&format!("delete image {}", id), e))
        })?;
        Ok(changed > 0)
    }

    /// Ids of every attachment stored for a page
    pub fn image_ids_for_page(&self, page_id: PageId) -> Result<BTreeSet<i64>> {
        self.read(|conn| ids_for_page_in(conn, page_id))
    }

    /// Attachments of a page, without loading anything lazily
    pub fn images_for_page(&self, page_id: PageId) -> Result<Vec<ImageAttachment>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM image_attachments WHERE page_id = ?1 ORDER BY id ASC",
                    IMAGE_COLUMNS
                ))
                .map_err(map_db_err!("load page images"))?;
            let rows = stmt
                .query_map(params![page_id], image_from_row)
                .map_err(map_db_err!("load page images"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_db_err!("load page images"))
        })
    }

    /// Delete the page's attachments that `referenced` no longer mentions.
    ///
    /// Returns the ids removed. Call when a document is loaded or closed, not
    /// while it is being edited, or undo would lose images.
    #[tracing::instrument(skip(self, referenced))]
    pub fn reconcile_images(
        &self,
        page_id: PageId,
        referenced: &BTreeSet<i64>,
    ) -> Result<Vec<i64>> {
        let removed = self.write("reconcile images", |conn| {
            let stored = ids_for_page_in(conn, page_id)?;
            let unreferenced: Vec<i64> = stored.difference(referenced).copied().collect();
            for id in &unreferenced {
                conn.execute("DELETE FROM image_attachments WHERE id = ?1", params![id])
                    .map_err(|e| WikiError::db_operation(&format!("delete image {}", id), e))?;
            }
            Ok(unreferenced)
        })?;
        if !removed.is_empty() {
            tracing::debug!(
                page_id,
                removed = removed.len(),
                "removed unreferenced images"
            );
        }
        Ok(removed)
    }

    /// Reconcile a page's attachments against the images `document` embeds
    pub fn reconcile_with_document(
        &self,
        page_id: PageId,
        document: &impl Document,
    ) -> Result<Vec<i64>> {
        let projection = document.project()?;
        self.reconcile_images(page_id, &projection.image_ids)
    }

    /// Every attachment belonging to a live page, for export
    pub fn live_page_images(&self) -> Result<Vec<ImageAttachment>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT i.id, i.page_id, i.mime_type, i.data, i.width, i.height,
                            i.original_filename, i.file_extension, i.created_at
                     FROM image_attachments i
                     JOIN pages p ON p.id = i.page_id
                     WHERE p.archived_at IS NULL
                     ORDER BY i.page_id ASC, i.id ASC",
                )
                .map_err(map_db_err!("load images for export"))?;
            let rows = stmt
                .query_map([], image_from_row)
                .map_err(map_db_err!("load images for export"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_db_err!("load images for export"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_image_guesses_mime_from_extension() {
        let image = NewImage::from_file_name("photos/Beach Day.PNG", vec![1, 2, 3]);
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.file_extension, "png");
        assert_eq!(image.original_filename, "Beach Day.PNG");

        let unknown = NewImage::from_file_name("blob", vec![]);
        assert_eq!(unknown.mime_type, "application/octet-stream");
        assert_eq!(unknown.file_extension, "");
    }

    #[test]
    fn test_data_url() {
        let image = ImageAttachment {
            id: 1,
            page_id: 0,
            mime_type: "image/gif".to_string(),
            data: b"GIF89a".to_vec(),
            width: None,
            height: None,
            original_filename: String::new(),
            file_extension: String::new(),
            created_at: None,
        };
        assert_eq!(image.data_url(), "data:image/gif;base64,R0lGODlh");
        assert_eq!(image.export_extension(), "gif");
    }
}
