//! Filesystem-backed workspace.
//!
//! Tracks every file under a root that matches the include globs and none
//! of the exclude globs. Restores stage new contents next to their targets
//! first and only then rename them into place; if a rename fails the files
//! already replaced are put back from an in-memory copy and any directory
//! the restore created is removed again.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::FileState;
use crate::domain::ports::WorkspaceStore;

const STAGING_SUFFIX: &str = ".warden-staged";

/// Default paths never tracked.
pub const DEFAULT_EXCLUDES: &[&str] = &[".git/**", "target/**", ".warden/**", "**/*.warden-staged"];

/// Workspace rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
}

impl FsWorkspace {
    /// Track every file under `root` except the default excludes.
    pub fn new(root: impl Into<PathBuf>) -> DomainResult<Self> {
        Self::with_patterns(root, &["**/*"], DEFAULT_EXCLUDES)
    }

    /// Track files under `root` matching `include` and none of `exclude`.
    pub fn with_patterns(
        root: impl Into<PathBuf>,
        include: &[impl AsRef<str>],
        exclude: &[impl AsRef<str>],
    ) -> DomainResult<Self> {
        Ok(Self {
            root: root.into(),
            include: build_set(include)?,
            exclude: build_set(exclude)?,
        })
    }

    /// Directory the workspace is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_tracked(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    fn capture_blocking(&self) -> DomainResult<FileState> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| DomainError::StorageUnavailable(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if !self.is_tracked(relative) {
                continue;
            }
            let bytes = fs::read(entry.path())
                .map_err(|e| storage_error(entry.path(), &e))?;
            files.insert(relative.to_path_buf(), bytes);
        }
        Ok(FileState { files })
    }

    fn restore_blocking(&self, target: &FileState) -> DomainResult<()> {
        let current = self.capture_blocking()?;

        // Stage every changed file next to its destination.
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::new();
        let mut created: Vec<PathBuf> = Vec::new();
        for (relative, bytes) in &target.files {
            if current.files.get(relative) == Some(bytes) {
                continue;
            }
            let dest = self.root.join(relative);
            let temp = staging_path(&dest);
            let result = dest
                .parent()
                .map_or(Ok(()), |dir| create_parents(dir, &mut created))
                .and_then(|()| fs::write(&temp, bytes));
            if let Err(err) = result {
                discard_staged(&staged);
                let _ = fs::remove_file(&temp);
                remove_created(&created);
                return Err(storage_error(&dest, &err));
            }
            staged.push((temp, dest));
        }

        let removals: Vec<PathBuf> = current
            .files
            .keys()
            .filter(|p| !target.files.contains_key(*p))
            .map(|p| self.root.join(p))
            .collect();

        // Commit: renames and removals. On failure, put back what changed.
        let mut touched: Vec<PathBuf> = Vec::new();
        for (temp, dest) in &staged {
            if let Err(err) = fs::rename(temp, dest) {
                discard_staged(&staged);
                self.reapply(&current, &touched);
                remove_created(&created);
                return Err(storage_error(dest, &err));
            }
            touched.push(dest.clone());
        }
        for path in &removals {
            if let Err(err) = fs::remove_file(path) {
                self.reapply(&current, &touched);
                remove_created(&created);
                return Err(storage_error(path, &err));
            }
            touched.push(path.clone());
        }

        debug!(
            root = %self.root.display(),
            written = staged.len(),
            removed = removals.len(),
            "Workspace restored"
        );
        Ok(())
    }

    /// Best-effort return of `touched` paths to their contents in `backup`.
    fn reapply(&self, backup: &FileState, touched: &[PathBuf]) {
        for path in touched {
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let result = match backup.files.get(relative) {
                Some(bytes) => fs::write(path, bytes),
                None => fs::remove_file(path),
            };
            if let Err(err) = result {
                warn!(path = %path.display(), error = %err, "Could not re-apply backup");
            }
        }
    }
}

#[async_trait]
impl WorkspaceStore for FsWorkspace {
    async fn capture(&self) -> DomainResult<FileState> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.capture_blocking())
            .await
            .map_err(|e| DomainError::StorageUnavailable(e.to_string()))?
    }

    async fn restore(&self, state: &FileState) -> DomainResult<()> {
        let this = self.clone();
        let state = state.clone();
        tokio::task::spawn_blocking(move || this.restore_blocking(&state))
            .await
            .map_err(|e| DomainError::StorageUnavailable(e.to_string()))?
    }
}

fn build_set(patterns: &[impl AsRef<str>]) -> DomainResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern.as_ref()).map_err(|e| {
            DomainError::ValidationFailed(format!("invalid glob '{}': {e}", pattern.as_ref()))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| DomainError::ValidationFailed(e.to_string()))
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

/// Create `dir` and its missing ancestors, recording each one created in
/// top-down order.
fn create_parents(dir: &Path, created: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let missing: Vec<&Path> = dir.ancestors().take_while(|p| !p.exists()).collect();
    for path in missing.into_iter().rev() {
        fs::create_dir(path)?;
        created.push(path.to_path_buf());
    }
    Ok(())
}

/// Remove directories recorded by [`create_parents`], deepest first. Only
/// empty directories go.
fn remove_created(created: &[PathBuf]) {
    for dir in created.iter().rev() {
        if let Err(err) = fs::remove_dir(dir) {
            warn!(path = %dir.display(), error = %err, "Could not remove created directory");
        }
    }
}

fn discard_staged(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        let _ = fs::remove_file(temp);
    }
}

fn storage_error(path: &Path, err: &std::io::Error) -> DomainError {
    DomainError::StorageUnavailable(format!("{}: {err}", path.display()))
}
