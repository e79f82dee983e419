use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::domain::ast::SourceUnit;
use crate::error::{Result, SolgraphError};
use crate::ports::SourceParser;

/// Loads a root file and everything it imports, transitively.
pub struct SourceLoader<'p> {
    parser: &'p dyn SourceParser,
    include_paths: Vec<PathBuf>,
}

impl<'p> SourceLoader<'p> {
    pub fn new(parser: &'p dyn SourceParser, include_paths: Vec<PathBuf>) -> Self {
        Self {
            parser,
            include_paths,
        }
    }

    /// Parse `root` and its imports. Units come back in discovery order with
    /// the root first; every file is parsed once.
    pub fn load(&self, root: &Path) -> Result<Vec<SourceUnit>> {
        let root = canonical(root)?;
        let root_dir = root.parent().map(Path::to_path_buf).unwrap_or_default();

        let mut seen: HashSet<PathBuf> = HashSet::new();
        seen.insert(root.clone());
        let mut frontier = vec![root];
        let mut units = Vec::new();

        while !frontier.is_empty() {
            // Each frontier is parsed in parallel; collecting keeps the order.
            let parsed: Vec<Result<(PathBuf, SourceUnit)>> = frontier
                .par_iter()
                .map(|path| self.load_one(path).map(|unit| (path.clone(), unit)))
                .collect();

            let mut next = Vec::new();
            for result in parsed {
                let (path, unit) = result?;
                for import in &unit.imports {
                    match self.resolve_import(&path, &root_dir, &import.path) {
                        Some(found) => {
                            if seen.insert(found.clone()) {
                                next.push(found);
                            }
                        }
                        None => log::warn!(
                            "cannot find import \"{}\" from {}; its definitions are treated as missing",
                            import.path,
                            path.display()
                        ),
                    }
                }
                units.push(unit);
            }
            frontier = next;
        }

        log::info!("loaded {} source files", units.len());
        Ok(units)
    }

    fn load_one(&self, path: &Path) -> Result<SourceUnit> {
        let display = path.display().to_string();
        let source = fs::read_to_string(path).map_err(|source| SolgraphError::Io {
            path: display.clone(),
            source,
        })?;
        self.parser.parse(&display, &source)
    }

    /// `./` and `../` imports are relative to the importing file; anything else
    /// is looked up in the root file's directory, then in each include path.
    fn resolve_import(&self, importer: &Path, root_dir: &Path, import: &str) -> Option<PathBuf> {
        if import.starts_with("./") || import.starts_with("../") {
            let dir = importer.parent()?;
            return dir.join(import).canonicalize().ok();
        }
        std::iter::once(root_dir)
            .chain(self.include_paths.iter().map(PathBuf::as_path))
            .find_map(|dir| dir.join(import).canonicalize().ok())
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|source| SolgraphError::Io {
        path: path.display().to_string(),
        source,
    })
}
