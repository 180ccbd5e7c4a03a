//! The data store the curation jobs read from and write to.
//!
//! The store is organised as folders of files, each file entity pointing at a file handle (the
//! stored content). Curated tables are stored back into the same store. The jobs only depend on
//! the [`DataStore`] trait; [`LocalStore`] implements it over a directory tree.
mod local;
pub use local::{CopyRecord, LocalStore};

use crate::table::Table;
use qu::ick_use::*;
use std::path::PathBuf;

/// The store won't accept more copy requests than this in one call.
pub const COPY_BATCH_SIZE: usize = 100;

/// Identifies stored file content (as opposed to the entity that refers to it).
pub type FileHandleId = u64;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EntityKind {
    Folder,
    File,
}

/// A child of a folder.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Entity {
    pub name: String,
    pub id: String,
    pub kind: EntityKind,
}

/// A file entity, downloaded.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub path: PathBuf,
    pub data_file_handle_id: FileHandleId,
}

/// Ask for a copy of a file handle, to be associated with an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CopyRequest {
    pub file_handle_id: FileHandleId,
    /// The file entity the original handle is reachable from.
    pub associate_object_id: String,
    pub content_type: String,
    /// `None` keeps the original file name.
    pub file_name: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CopyResult {
    pub original_file_handle_id: FileHandleId,
    pub new_file_handle_id: FileHandleId,
}

pub trait DataStore {
    /// List the direct children of a folder.
    fn children(&self, parent: &str) -> Result<Vec<Entity>>;

    /// Get the file handle of a file entity without downloading it.
    fn file_handle(&self, id: &str) -> Result<FileHandleId>;

    /// Download a file entity.
    fn fetch(&self, id: &str) -> Result<FetchedFile>;

    /// Copy file handles. At most [`COPY_BATCH_SIZE`] requests at a time; results come back in
    /// request order.
    fn copy_file_handles(&mut self, requests: &[CopyRequest]) -> Result<Vec<CopyResult>>;

    /// Store a curated table under `parent`.
    fn store_table(&mut self, parent: &str, table: &Table) -> Result;

    /// The sub-folders of a folder, in listing order.
    fn folders(&self, parent: &str) -> Result<Vec<Entity>> {
        Ok(self
            .children(parent)?
            .into_iter()
            .filter(|e| e.kind == EntityKind::Folder)
            .collect())
    }

    /// The files in a folder, in listing order.
    fn files(&self, parent: &str) -> Result<Vec<Entity>> {
        Ok(self
            .children(parent)?
            .into_iter()
            .filter(|e| e.kind == EntityKind::File)
            .collect())
    }
}

/// Copy any number of file handles, batching requests to the store's limit.
///
/// Returns the new handle for each request, in request order. Fails if the store doesn't answer
/// every request or answers them out of order.
pub fn copy_file_handles(
    store: &mut impl DataStore,
    requests: &[CopyRequest],
) -> Result<Vec<FileHandleId>> {
    let mut new_handles = Vec::with_capacity(requests.len());
    for (batch_idx, batch) in requests.chunks(COPY_BATCH_SIZE).enumerate() {
        event!(
            Level::INFO,
            "copying file handles {} to {}",
            batch_idx * COPY_BATCH_SIZE,
            batch_idx * COPY_BATCH_SIZE + batch.len()
        );
        let results = store.copy_file_handles(batch)?;
        ensure!(
            results.len() == batch.len(),
            "asked for {} file handle copies, got {}",
            batch.len(),
            results.len()
        );
        for (request, result) in batch.iter().zip(results) {
            ensure!(
                request.file_handle_id == result.original_file_handle_id,
                "copy of file handle {} came back as a copy of {}",
                request.file_handle_id,
                result.original_file_handle_id
            );
            new_handles.push(result.new_file_handle_id);
        }
    }
    Ok(new_handles)
}
