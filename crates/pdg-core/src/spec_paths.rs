use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Deepest level at which a `languages` directory is searched for below a spec home.
pub const MAX_SCAN_DEPTH: usize = 6;

/// Where processor specification files live on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecPathRegistry {
    home: Option<PathBuf>,
    language_dirs: Vec<PathBuf>,
    generation: u64,
}

impl SpecPathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything known and rescan `home` when it is non-empty.
    pub fn reset(&mut self, home: Option<&Path>) {
        self.home = None;
        self.language_dirs.clear();
        self.generation += 1;

        let Some(home) = home.filter(|h| !h.as_os_str().is_empty()) else {
            debug!(generation = self.generation, "spec paths cleared");
            return;
        };

        self.language_dirs = scan_language_dirs(home);
        self.home = Some(home.to_path_buf());
        info!(
            home = %home.display(),
            dirs = self.language_dirs.len(),
            generation = self.generation,
            "spec paths rescanned"
        );
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn language_dirs(&self) -> &[PathBuf] {
        &self.language_dirs
    }

    /// Bumped on every reset; engines built against an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.language_dirs.is_empty()
    }

    /// Every `.ldefs` language definition file across the known directories.
    pub fn language_definitions(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self
            .language_dirs
            .iter()
            .flat_map(|dir| std::fs::read_dir(dir).into_iter().flatten())
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_ldefs(path))
            .collect();
        files.sort();
        files
    }
}

fn is_ldefs(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "ldefs")
}

/// Directories named `languages` holding at least one `.ldefs` file.
fn scan_language_dirs(root: &Path) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(MAX_SCAN_DEPTH)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_dir() && entry.file_name() == "languages")
        .filter(|entry| {
            std::fs::read_dir(entry.path())
                .map(|mut it| it.any(|f| f.map_or(false, |f| is_ldefs(&f.path()))))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();
    dirs.sort();
    dirs
}

/// Process-scoped handle to the registry. Clones share state.
///
/// Resetting while a decompilation is in flight is not supported; hosts serialize configuration
/// changes against command execution.
#[derive(Debug, Clone, Default)]
pub struct SpecPaths {
    inner: Arc<RwLock<SpecPathRegistry>>,
}

impl SpecPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self, home: Option<&Path>) {
        self.write().reset(home);
    }

    pub fn read(&self) -> RwLockReadGuard<'_, SpecPathRegistry> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SpecPathRegistry> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn ghidra_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let x86 = dir.path().join("Ghidra/Processors/x86/data/languages");
        let arm = dir.path().join("Ghidra/Processors/ARM/data/languages");
        let empty = dir.path().join("Ghidra/Processors/Toy/data/languages");
        fs::create_dir_all(&x86).unwrap();
        fs::create_dir_all(&arm).unwrap();
        fs::create_dir_all(&empty).unwrap();
        fs::write(x86.join("x86.ldefs"), "<language_definitions/>").unwrap();
        fs::write(arm.join("ARM.ldefs"), "<language_definitions/>").unwrap();
        fs::write(empty.join("README"), "nothing here").unwrap();
        dir
    }

    #[test]
    fn test_reset_scans_language_dirs() {
        let tree = ghidra_tree();
        let mut registry = SpecPathRegistry::new();
        registry.reset(Some(tree.path()));

        assert_eq!(registry.language_dirs().len(), 2);
        assert_eq!(registry.home(), Some(tree.path()));
        let names: Vec<_> = registry
            .language_definitions()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["ARM.ldefs", "x86.ldefs"]);
    }

    #[test]
    fn test_reset_with_empty_home_clears() {
        let tree = ghidra_tree();
        let mut registry = SpecPathRegistry::new();
        registry.reset(Some(tree.path()));
        assert_eq!(registry.generation(), 1);

        registry.reset(Some(Path::new("")));
        assert!(registry.is_empty());
        assert_eq!(registry.home(), None);
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn test_handle_clones_share_state() {
        let tree = ghidra_tree();
        let paths = SpecPaths::new();
        let clone = paths.clone();

        clone.reset(Some(tree.path()));
        assert_eq!(paths.read().language_dirs().len(), 2);
    }
}
