//! Page sequence store
//!
//! Holds the ordered list of page filenames for one source folder plus the
//! undo stack of deleted pages. Every mutation is written through to the
//! settings store before it returns.

mod deleted;
mod sort;

pub use deleted::{DeletedPage, DeletedStack, decode_order, encode_order};
pub use sort::{is_image_file, numeric_key, sort_pages};

use crate::settings::SettingsStore;
use crate::types::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// List the image files in `folder`, in natural page order
pub fn scan_folder(folder: &Path) -> Result<Vec<String>> {
    if !folder.is_dir() {
        return Err(FormatError::FolderNotFound(folder.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            log::warn!("Skipping non UTF-8 file name {:?}", name);
            continue;
        };
        if is_image_file(name) {
            files.push(name.to_string());
        }
    }

    sort_pages(&mut files);
    Ok(files)
}

/// Merge a persisted page order with what is currently on disk.
///
/// Persisted entries whose files are gone are dropped. Files on disk that
/// the persisted order does not mention are appended in natural order,
/// unless they were deleted by the user. With no persisted order the
/// result is simply `on_disk` minus deleted files.
///
/// The persisted order never holds deleted entries, so a filename present
/// in both is a surviving copy of a duplicated page and is kept.
pub fn restore_order(on_disk: &[String], persisted: &[String], deleted: &DeletedStack) -> Vec<String> {
    let present: HashSet<&str> = on_disk.iter().map(String::as_str).collect();

    let mut order: Vec<String> = if persisted.is_empty() {
        Vec::new()
    } else {
        persisted
            .iter()
            .filter(|name| present.contains(name.as_str()))
            .cloned()
            .collect()
    };

    let known: HashSet<String> = order.iter().cloned().collect();
    let mut discovered: Vec<String> = on_disk
        .iter()
        .filter(|name| !known.contains(*name) && !deleted.contains(name))
        .cloned()
        .collect();
    sort_pages(&mut discovered);
    order.extend(discovered);
    order
}

/// Ordered, persisted page list for one source folder
#[derive(Debug)]
pub struct PageSequenceStore<S: SettingsStore> {
    folder: PathBuf,
    pages: Vec<String>,
    deleted: DeletedStack,
    store: S,
}

impl<S: SettingsStore> PageSequenceStore<S> {
    /// Open the folder recorded in the settings store
    pub fn open(store: S) -> Result<Self> {
        let settings = store.load()?;
        if settings.input_folder.trim().is_empty() {
            return Err(FormatError::Config("No input folder selected".to_string()));
        }
        let folder = settings.input_folder();
        Self::load(
            folder,
            &settings.image_sequence,
            &settings.deleted_items,
            store,
        )
    }

    /// Rebuild the sequence for `folder` from its persisted form
    pub fn load(
        folder: impl Into<PathBuf>,
        persisted_order: &str,
        persisted_deleted: &str,
        store: S,
    ) -> Result<Self> {
        let folder = folder.into();
        let on_disk = scan_folder(&folder)?;
        let deleted = DeletedStack::from_persisted(persisted_deleted);
        let pages = restore_order(&on_disk, &decode_order(persisted_order), &deleted);

        log::info!(
            "Loaded {} pages from {} ({} deleted)",
            pages.len(),
            folder.display(),
            deleted.len()
        );

        Ok(Self {
            folder,
            pages,
            deleted,
            store,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn deleted(&self) -> &DeletedStack {
        &self.deleted
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Switch to another source folder; the undo stack is discarded
    pub fn set_folder(&mut self, folder: impl Into<PathBuf>) -> Result<()> {
        let folder = folder.into();
        let pages = scan_folder(&folder)?;

        self.folder = folder;
        self.pages = pages;
        self.deleted.clear();

        let mut settings = self.store.load()?;
        settings.input_folder = self.folder.to_string_lossy().into_owned();
        settings.image_sequence = encode_order(&self.pages);
        settings.deleted_items = self.deleted.to_persisted();
        self.store.save(&settings)?;

        log::info!(
            "Switched to {} with {} pages",
            self.folder.display(),
            self.pages.len()
        );
        Ok(())
    }

    /// Pick up files added to the folder since the sequence was loaded
    pub fn refresh(&mut self) -> Result<usize> {
        let on_disk = scan_folder(&self.folder)?;
        let present: HashSet<&str> = on_disk.iter().map(String::as_str).collect();
        self.pages.retain(|name| present.contains(name.as_str()));

        let known: HashSet<&str> = self.pages.iter().map(String::as_str).collect();
        let mut discovered: Vec<String> = on_disk
            .iter()
            .filter(|name| !known.contains(name.as_str()) && !self.deleted.contains(name))
            .cloned()
            .collect();
        sort_pages(&mut discovered);

        let found = discovered.len();
        self.pages.extend(discovered);
        self.persist()?;
        Ok(found)
    }

    /// Move the pages at `indices` as one block next to `target`.
    ///
    /// The block lands before `target` when the target lies below it and
    /// after `target` when the target lies above it. Returns `false`
    /// without changing anything when `target` falls inside the span of
    /// the block.
    pub fn reorder(&mut self, indices: &[usize], target: usize) -> Result<bool> {
        let indices = self.normalize_indices(indices)?;
        self.check_index(target)?;
        let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
            return Ok(false);
        };

        if (first..=last).contains(&target) {
            log::debug!("Reorder target {target} lies inside moved span {first}..={last}");
            return Ok(false);
        }

        let mut block = Vec::with_capacity(indices.len());
        for &idx in indices.iter().rev() {
            block.push(self.pages.remove(idx));
        }
        block.reverse();

        let insert_at = if target < first {
            target
        } else {
            target + 1 - block.len()
        };

        let tail = self.pages.split_off(insert_at);
        self.pages.extend(block);
        self.pages.extend(tail);

        self.persist()?;
        Ok(true)
    }

    /// Remove the pages at `indices`, remembering each for undo
    pub fn delete(&mut self, indices: &[usize]) -> Result<Vec<String>> {
        let indices = self.normalize_indices(indices)?;

        let mut removed = Vec::with_capacity(indices.len());
        for &idx in indices.iter().rev() {
            let filename = self.pages.remove(idx);
            self.deleted.push(filename.clone(), idx);
            removed.push(filename);
        }
        removed.reverse();

        if !removed.is_empty() {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Restore the most recently deleted page
    pub fn undo_delete(&mut self) -> Result<Option<DeletedPage>> {
        let Some(entry) = self.deleted.pop() else {
            return Ok(None);
        };

        let idx = entry.index.min(self.pages.len());
        self.pages.insert(idx, entry.filename.clone());
        self.persist()?;
        Ok(Some(entry))
    }

    /// Insert a copy of each selected page right after it
    pub fn duplicate(&mut self, indices: &[usize]) -> Result<()> {
        let indices = self.normalize_indices(indices)?;

        for (shift, &idx) in indices.iter().enumerate() {
            let at = idx + shift;
            let copy = self.pages[at].clone();
            self.pages.insert(at + 1, copy);
        }

        if !indices.is_empty() {
            self.persist()?;
        }
        Ok(())
    }

    /// Copy external images into the folder and insert them at `position`.
    ///
    /// Name collisions get `_1`, `_2`, ... appended before the extension.
    /// Every path is checked before anything is copied; if a copy fails the
    /// files already copied are removed and the sequence is left unchanged.
    pub fn add_custom(&mut self, paths: &[PathBuf], position: usize) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(paths.len());
        for path in paths {
            names.push(checked_image_name(path)?);
        }

        let mut added: Vec<String> = Vec::with_capacity(paths.len());
        for (path, name) in paths.iter().zip(names) {
            let dest_name = unique_name(&self.folder, name);
            if let Err(e) = std::fs::copy(path, self.folder.join(&dest_name)) {
                self.remove_copies(&added);
                return Err(e.into());
            }
            log::info!("Copied {} as {}", path.display(), dest_name);
            added.push(dest_name);
        }

        if added.is_empty() {
            return Ok(added);
        }

        let position = position.min(self.pages.len());
        self.pages.splice(position..position, added.iter().cloned());
        self.persist()?;
        Ok(added)
    }

    fn remove_copies(&self, copied: &[String]) {
        for name in copied {
            if let Err(e) = std::fs::remove_file(self.folder.join(name)) {
                log::warn!("Could not remove copied page {}: {}", name, e);
            }
        }
    }

    fn persist(&mut self) -> Result<()> {
        self.store
            .save_sequence(&encode_order(&self.pages), &self.deleted.to_persisted())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.pages.len() {
            return Err(FormatError::IndexOutOfRange {
                index,
                len: self.pages.len(),
            });
        }
        Ok(())
    }

    /// Sorted, de-duplicated, bounds-checked copy of `indices`
    fn normalize_indices(&self, indices: &[usize]) -> Result<Vec<usize>> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        for &idx in &sorted {
            self.check_index(idx)?;
        }
        Ok(sorted)
    }
}

/// File name of an image to add, rejecting non-files and unsupported types
fn checked_image_name(path: &Path) -> Result<&str> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Err(FormatError::Config(format!(
            "Invalid image path: {}",
            path.display()
        )));
    };
    if !is_image_file(name) {
        return Err(FormatError::Config(format!(
            "Not a supported image file: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(FormatError::Config(format!(
            "Image file not found: {}",
            path.display()
        )));
    }
    Ok(name)
}

/// First free file name in `folder` derived from `name`
fn unique_name(folder: &Path, name: &str) -> String {
    if !folder.join(name).exists() {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, format!(".{ext}")),
        None => (name, String::new()),
    };

    let mut n = 1;
    loop {
        let candidate = format!("{stem}_{n}{ext}");
        if !folder.join(&candidate).exists() {
            return candidate;
        }
        n += 1;
    }
}
