//! Workspace manager: scoped and size-bounded scratch directories.
//!
//! ## `with_workspace` protocol
//!
//! 1. Validate every auxiliary path (relative, no `..`).
//! 2. Sum the bytes under the auxiliary paths; over the cap → fail before
//!    any filesystem mutation.
//! 3. Allocate `<scratch_root>/flashtex-XXXXXX` (random suffix).
//! 4. Copy the auxiliary paths in, preserving their relative layout.
//! 5. Write the snippet to the main entry.
//! 6. Run the body.
//! 7. Remove the directory. A removal failure beats any body result.
//!
//! Directory symlinks inside the context are neither sized nor copied;
//! symlinked files are followed.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tempfile::{Builder, TempDir};

use flashtex_core::RenderContext;

use crate::error::{io_err, RenderError};

/// Hard cap on the combined size of all auxiliary files (1 MiB).
pub const CONTEXT_SIZE_CAP: u64 = 1024 * 1024;

const WORKSPACE_PREFIX: &str = "flashtex-";
const IMAGE_NAME: &str = "converted.svg";

/// A live scratch directory. Only reachable inside [`with_workspace`].
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    main_entry: PathBuf,
    document: PathBuf,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the snippet source was written.
    pub fn main_entry(&self) -> &Path {
        &self.main_entry
    }

    /// Where the compiler is expected to leave its document.
    pub fn document_path(&self) -> &Path {
        &self.document
    }

    /// Where the converter is asked to write the image.
    pub fn image_path(&self) -> PathBuf {
        self.dir.path().join(IMAGE_NAME)
    }
}

// ---------------------------------------------------------------------------
// with_workspace
// ---------------------------------------------------------------------------

/// Run `body` inside a fresh workspace populated from `context` and `source`.
///
/// The workspace is removed on every exit path. If removal fails the result
/// is [`RenderError::WorkspaceCleanup`], even when `body` succeeded.
pub fn with_workspace<T, F>(
    context: &RenderContext,
    scratch_root: &Path,
    source: &str,
    body: F,
) -> Result<T, RenderError>
where
    F: FnOnce(&Workspace) -> Result<T, RenderError>,
{
    validate_relative(Path::new(&context.main_entry))?;
    for rel in &context.auxiliary_paths {
        validate_relative(rel)?;
    }

    let size = context_size(context)?;
    tracing::debug!(size, cap = CONTEXT_SIZE_CAP, "context size within cap");

    fs::create_dir_all(scratch_root).map_err(|e| io_err(scratch_root, e))?;
    let dir = Builder::new()
        .prefix(WORKSPACE_PREFIX)
        .tempdir_in(scratch_root)
        .map_err(|e| io_err(scratch_root, e))?;

    let main_entry = dir.path().join(&context.main_entry);
    let document = dir
        .path()
        .join(format!("{}.pdf", context.main_entry_stem()));
    let workspace = Workspace {
        dir,
        main_entry,
        document,
    };
    tracing::debug!(path = %workspace.path().display(), "workspace allocated");

    let result = populate(&workspace, context, source).and_then(|()| body(&workspace));

    let path = workspace.path().to_path_buf();
    workspace
        .dir
        .close()
        .map_err(|source| RenderError::WorkspaceCleanup {
            path: path.clone(),
            source,
        })?;
    tracing::debug!(path = %path.display(), "workspace removed");

    result
}

fn populate(workspace: &Workspace, context: &RenderContext, source: &str) -> Result<(), RenderError> {
    for (rel, from) in context.sources() {
        let to = workspace.path().join(rel);
        let meta = fs::metadata(&from).map_err(|e| io_err(&from, e))?;
        if meta.is_dir() {
            copy_tree(&from, &to)?;
        } else {
            copy_file(&from, &to)?;
        }
    }

    let main = workspace.main_entry();
    if let Some(parent) = main.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    fs::write(main, source).map_err(|e| io_err(main, e))
}

// ---------------------------------------------------------------------------
// Size guard
// ---------------------------------------------------------------------------

/// Total bytes of every file under the context's auxiliary paths.
///
/// Stops walking as soon as the running total passes [`CONTEXT_SIZE_CAP`]
/// and returns [`RenderError::ContextTooLarge`].
pub fn context_size(context: &RenderContext) -> Result<u64, RenderError> {
    let mut total = 0;
    for (_, path) in context.sources() {
        accumulate_size(&path, &mut total)?;
    }
    Ok(total)
}

fn accumulate_size(path: &Path, total: &mut u64) -> Result<(), RenderError> {
    let meta = fs::metadata(path).map_err(|e| io_err(path, e))?;
    if meta.is_file() {
        *total = total.saturating_add(meta.len());
        if *total > CONTEXT_SIZE_CAP {
            return Err(RenderError::ContextTooLarge {
                size: *total,
                cap: CONTEXT_SIZE_CAP,
            });
        }
        return Ok(());
    }
    for entry in fs::read_dir(path).map_err(|e| io_err(path, e))? {
        let entry = entry.map_err(|e| io_err(path, e))?;
        let child = entry.path();
        if is_dir_symlink(&child)? {
            continue;
        }
        accumulate_size(&child, total)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Copy helpers
// ---------------------------------------------------------------------------

fn copy_tree(from: &Path, to: &Path) -> Result<(), RenderError> {
    fs::create_dir_all(to).map_err(|e| io_err(to, e))?;
    for entry in fs::read_dir(from).map_err(|e| io_err(from, e))? {
        let entry = entry.map_err(|e| io_err(from, e))?;
        let child = entry.path();
        if is_dir_symlink(&child)? {
            tracing::debug!(path = %child.display(), "skipping directory symlink");
            continue;
        }
        let target = to.join(entry.file_name());
        if fs::metadata(&child).map_err(|e| io_err(&child, e))?.is_dir() {
            copy_tree(&child, &target)?;
        } else {
            copy_file(&child, &target)?;
        }
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> Result<(), RenderError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| io_err(from, e))?;
    Ok(())
}

fn is_dir_symlink(path: &Path) -> Result<bool, RenderError> {
    let link = fs::symlink_metadata(path).map_err(|e| io_err(path, e))?;
    if !link.file_type().is_symlink() {
        return Ok(false);
    }
    Ok(fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false))
}

fn validate_relative(path: &Path) -> Result<(), RenderError> {
    let mut normal = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => normal += 1,
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(RenderError::InvalidContextPath {
                    path: path.to_path_buf(),
                });
            }
        }
    }
    if normal == 0 {
        return Err(RenderError::InvalidContextPath {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn scratch_entries(root: &Path) -> Vec<PathBuf> {
        match fs::read_dir(root) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => vec![],
        }
    }

    #[test]
    fn writes_source_to_main_entry_and_removes_workspace() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let ctx = RenderContext::new(root.path(), vec![], "main.tex");

        let seen = with_workspace(&ctx, scratch.path(), "hello", |ws| {
            assert_eq!(fs::read_to_string(ws.main_entry()).unwrap(), "hello");
            assert!(ws.path().starts_with(scratch.path()));
            Ok(ws.path().to_path_buf())
        })
        .unwrap();

        assert!(!seen.exists());
        assert!(scratch_entries(scratch.path()).is_empty());
    }

    #[test]
    fn body_error_still_removes_workspace() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let ctx = RenderContext::new(root.path(), vec![], "main.tex");
        let mut seen = None;

        let err = with_workspace(&ctx, scratch.path(), "x", |ws| -> Result<(), _> {
            seen = Some(ws.path().to_path_buf());
            Err(RenderError::CompileFailure {
                expected: ws.document_path().to_path_buf(),
            })
        })
        .unwrap_err();

        assert!(matches!(err, RenderError::CompileFailure { .. }));
        assert!(!seen.unwrap().exists());
    }

    #[test]
    fn failed_removal_is_reported_as_cleanup_failure() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let ctx = RenderContext::new(root.path(), vec![], "main.tex");
        let mut seen = None;

        let err = with_workspace(&ctx, scratch.path(), "x", |ws| {
            seen = Some(ws.path().to_path_buf());
            fs::remove_dir_all(ws.path()).unwrap();
            Ok(())
        })
        .unwrap_err();

        match err {
            RenderError::WorkspaceCleanup { path, .. } => assert_eq!(Some(path), seen),
            other => panic!("expected WorkspaceCleanup, got {other:?}"),
        }
    }

    #[test]
    fn cleanup_failure_wins_over_body_error() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let ctx = RenderContext::new(root.path(), vec![], "main.tex");

        let err = with_workspace(&ctx, scratch.path(), "x", |ws| -> Result<(), _> {
            fs::remove_dir_all(ws.path()).unwrap();
            Err(RenderError::CompileFailure {
                expected: ws.document_path().to_path_buf(),
            })
        })
        .unwrap_err();

        assert!(err.is_fatal(), "got: {err}");
        assert!(matches!(err, RenderError::WorkspaceCleanup { .. }));
    }

    #[test]
    fn document_path_follows_main_entry_stem() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let ctx = RenderContext::new(root.path(), vec![], "cards/card.tex");

        with_workspace(&ctx, scratch.path(), "x", |ws| {
            assert_eq!(ws.document_path(), ws.path().join("card.pdf"));
            assert_eq!(ws.main_entry(), ws.path().join("cards").join("card.tex"));
            assert!(ws.main_entry().is_file());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn workspaces_get_distinct_names() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let ctx = RenderContext::new(root.path(), vec![], "main.tex");

        let outer = with_workspace(&ctx, scratch.path(), "a", |outer| {
            let inner = with_workspace(&ctx, scratch.path(), "a", |inner| {
                Ok(inner.path().to_path_buf())
            })?;
            assert_ne!(inner, outer.path());
            Ok(outer.path().to_path_buf())
        })
        .unwrap();
        assert!(!outer.exists());
    }

    #[test]
    fn rejects_paths_escaping_root() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        for bad in ["../secret", "/etc/passwd", "", "."] {
            let ctx = RenderContext::new(root.path(), vec![PathBuf::from(bad)], "main.tex");
            let err = with_workspace(&ctx, scratch.path(), "x", |_| Ok(())).unwrap_err();
            assert!(
                matches!(err, RenderError::InvalidContextPath { .. }),
                "{bad}: {err}"
            );
        }
        assert!(scratch_entries(scratch.path()).is_empty());
    }

    #[test]
    fn rejects_main_entry_escaping_workspace() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let ctx = RenderContext::new(root.path(), vec![], "../main.tex");
        let err = with_workspace(&ctx, scratch.path(), "x", |_| Ok(())).unwrap_err();
        assert!(matches!(err, RenderError::InvalidContextPath { .. }));
    }

    #[test]
    fn missing_auxiliary_path_is_io_error() {
        let root = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let ctx = RenderContext::new(root.path(), vec![PathBuf::from("nope.sty")], "main.tex");
        let err = with_workspace(&ctx, scratch.path(), "x", |_| Ok(())).unwrap_err();
        assert!(matches!(err, RenderError::Io { .. }), "got: {err}");
        assert!(err.to_string().contains("nope.sty"));
    }

    #[test]
    fn validate_relative_accepts_nested_paths() {
        assert!(validate_relative(Path::new("styles/common.sty")).is_ok());
        assert!(validate_relative(Path::new("./header.tex")).is_ok());
    }
}
