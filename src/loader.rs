// ABOUTME: Reads `<name>.sst` source files for `use` and the program entry point

use crate::config::MODULE_EXTENSION;
use crate::error::{Result, SstError};
use std::path::{Path, PathBuf};

/// The module file I/O collaborator. `use m;` and the program entry point
/// both go through this: only "read a file by name" matters, there is no
/// sandboxing or capability scoping.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<String>;
}

/// Reads `./<name>.sst` relative to a fixed root directory (the process's
/// working directory, by default).
#[derive(Debug, Clone)]
pub struct FsModuleLoader {
    root: PathBuf,
}

impl FsModuleLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsModuleLoader { root: root.into() }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", name, MODULE_EXTENSION))
    }
}

impl Default for FsModuleLoader {
    fn default() -> Self {
        FsModuleLoader::new(Path::new("."))
    }
}

impl ModuleLoader for FsModuleLoader {
    fn load(&self, name: &str) -> Result<String> {
        let path = self.path_for(name);
        std::fs::read_to_string(&path)
            .map_err(|e| SstError::io(format!("cannot open module '{}': {}", path.display(), e)))
    }
}
