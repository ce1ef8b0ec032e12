//! Host-supplied file primitives.
//!
//! The engine never touches the filesystem directly; the host hands it a
//! [`WorkspaceIo`] rooted somewhere, and every path the engine sees is
//! workspace-relative. [`FsWorkspace`] is the standard implementation;
//! tests point it at a temp directory.

use crate::{EngineError, EngineResult};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// File access at workspace-relative paths.
#[async_trait]
pub trait WorkspaceIo: Send + Sync {
    /// The workspace root.
    fn root(&self) -> &Path;

    /// Resolves a relative path against the root, rejecting absolute
    /// paths and traversal.
    fn resolve(&self, path: &str) -> EngineResult<PathBuf>;

    /// Reads a file as UTF-8.
    async fn read_file(&self, path: &str) -> EngineResult<String>;

    /// Writes a file, creating parent directories as needed.
    async fn write_file(&self, path: &str, content: &str) -> EngineResult<()>;

    /// Whether the file exists.
    async fn exists(&self, path: &str) -> bool;
}

/// Filesystem-backed workspace.
pub struct FsWorkspace {
    root: PathBuf,
}

impl FsWorkspace {
    /// Creates a workspace rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl WorkspaceIo for FsWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> EngineResult<PathBuf> {
        let rel = Path::new(path);
        if rel.is_absolute() {
            return Err(EngineError::PathEscapesWorkspace(path.to_string()));
        }
        for component in rel.components() {
            match component {
                Component::ParentDir | Component::Prefix(_) | Component::RootDir => {
                    return Err(EngineError::PathEscapesWorkspace(path.to_string()));
                }
                Component::Normal(_) | Component::CurDir => {}
            }
        }
        Ok(self.root.join(rel))
    }

    async fn read_file(&self, path: &str) -> EngineResult<String> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::read_to_string(full).await?)
    }

    async fn write_file(&self, path: &str, content: &str) -> EngineResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(full, content).await?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(full) => tokio::fs::try_exists(full).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
