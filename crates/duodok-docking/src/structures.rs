//! Structure store for uploaded and built-in receptor/antibody files.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use duodok_common::entities::DEFAULT_SELECTION_PREFIX;
use duodok_common::{DuodokError, Result, StructureCategory, StructureFile, StructureOrigin};

use crate::config::StoreLayout;

/// Folder-backed catalog of structures, one folder per category and origin.
#[derive(Debug, Clone)]
pub struct StructureStore {
    layout: StoreLayout,
}

impl StructureStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Create every category folder if missing.
    pub async fn init(&self) -> Result<()> {
        for dir in [
            &self.layout.receptor_dir,
            &self.layout.default_receptor_dir,
            &self.layout.antibody_dir,
            &self.layout.default_antibody_dir,
        ] {
            fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    fn dir(&self, category: StructureCategory, origin: StructureOrigin) -> &Path {
        match (category, origin) {
            (StructureCategory::Receptor, StructureOrigin::Default) => &self.layout.default_receptor_dir,
            (StructureCategory::Receptor, StructureOrigin::User) => &self.layout.receptor_dir,
            (StructureCategory::Antibody, StructureOrigin::Default) => &self.layout.default_antibody_dir,
            (StructureCategory::Antibody, StructureOrigin::User) => &self.layout.antibody_dir,
        }
    }

    /// Structures in one folder, sorted by identifier.
    ///
    /// User listings drop any identifier that also exists as a default so the
    /// combined catalog never offers the same name twice. A missing folder is
    /// an empty listing.
    pub async fn list(
        &self,
        category: StructureCategory,
        origin: StructureOrigin,
    ) -> Result<Vec<StructureFile>> {
        let mut files = self.scan(category, origin).await?;
        if origin == StructureOrigin::User {
            let defaults = self.scan(category, StructureOrigin::Default).await?;
            files.retain(|f| !defaults.iter().any(|d| d.identifier == f.identifier));
        }
        Ok(files)
    }

    /// Defaults first, then de-duplicated user uploads.
    pub async fn list_structures(&self, category: StructureCategory) -> Result<Vec<StructureFile>> {
        let mut all = self.list(category, StructureOrigin::Default).await?;
        all.extend(self.list(category, StructureOrigin::User).await?);
        Ok(all)
    }

    async fn scan(&self, category: StructureCategory, origin: StructureOrigin) -> Result<Vec<StructureFile>> {
        let dir = self.dir(category, origin);
        let mut entries = match fs::read_dir(dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.layout.extension.as_str()) {
                continue;
            }
            let Some(identifier) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            files.push(StructureFile { category, origin, identifier, path });
        }
        files.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        debug!(%category, ?origin, count = files.len(), "Scanned {}", dir.display());
        Ok(files)
    }

    /// Write an upload into the category's user folder, overwriting any
    /// previous upload with the same identifier.
    pub async fn save(
        &self,
        category: StructureCategory,
        identifier: &str,
        bytes: &[u8],
    ) -> Result<StructureFile> {
        self.validate_identifier(identifier)?;

        let dir = self.dir(category, StructureOrigin::User);
        fs::create_dir_all(dir).await?;
        let path = dir.join(identifier);
        fs::write(&path, bytes).await?;

        info!(%category, identifier, bytes = bytes.len(), "Stored structure upload");
        Ok(StructureFile {
            category,
            origin: StructureOrigin::User,
            identifier: identifier.to_string(),
            path,
        })
    }

    /// Map a selection string (`default_<name>` or `<name>`) to a stored file.
    ///
    /// Only what the catalog offers can be selected: an upload hidden behind a
    /// default of the same name is not resolvable.
    pub async fn resolve(&self, category: StructureCategory, selection: &str) -> Result<StructureFile> {
        let (origin, identifier) = match selection.strip_prefix(DEFAULT_SELECTION_PREFIX) {
            Some(rest) => (StructureOrigin::Default, rest),
            None => (StructureOrigin::User, selection),
        };

        self.list(category, origin)
            .await?
            .into_iter()
            .find(|f| f.identifier == identifier)
            .ok_or_else(|| {
                DuodokError::InvalidSelection(format!("no {category} structure named {selection:?}"))
            })
    }

    /// Resolve many selections, keeping the first occurrence of repeats.
    pub async fn resolve_all(
        &self,
        category: StructureCategory,
        selections: &[String],
    ) -> Result<Vec<StructureFile>> {
        let mut resolved: Vec<StructureFile> = Vec::with_capacity(selections.len());
        for selection in selections {
            let file = self.resolve(category, selection).await?;
            if !resolved.iter().any(|f| f.path == file.path) {
                resolved.push(file);
            }
        }
        Ok(resolved)
    }

    fn validate_identifier(&self, identifier: &str) -> Result<()> {
        let invalid = |reason: &str| {
            Err(DuodokError::InvalidIdentifier(identifier.to_string(), reason.to_string()))
        };
        if identifier.is_empty() {
            return invalid("empty name");
        }
        if identifier.contains('/') || identifier.contains('\\') || identifier.contains("..") {
            return invalid("must be a plain file name");
        }
        let ext = PathBuf::from(identifier)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_string);
        if ext.as_deref() != Some(self.layout.extension.as_str()) {
            return invalid(&format!("expected a .{} file", self.layout.extension));
        }
        Ok(())
    }
}
