use crate::error::Result;
use crate::loader::SourceFormat;
use log::{debug, warn};
use std::path::PathBuf;
use walkdir::WalkDir;

/// Definition file scanner.
///
/// Walks a DSL root and collects every `.yaml`, `.yml` and `.json` file.
/// Hidden directories (those starting with `.`) are skipped. The result is
/// sorted so repeated runs load files, and therefore register models, in the
/// same order.
///
/// # Example
///
/// ```no_run
/// use openapi_from_models::scanner::FileScanner;
/// use std::path::PathBuf;
///
/// let result = FileScanner::new(PathBuf::from("./api")).scan().unwrap();
/// println!("Found {} definition files", result.definition_files.len());
/// ```
pub struct FileScanner {
    root_path: PathBuf,
}

/// Result of a scan.
pub struct ScanResult {
    /// Definition files in lexicographic path order
    pub definition_files: Vec<PathBuf>,
    /// Paths that could not be read
    pub warnings: Vec<String>,
}

impl FileScanner {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Scan the root. A root that is itself a file is returned as the only entry.
    ///
    /// # Errors
    ///
    /// Fails when the root does not exist.
    pub fn scan(&self) -> Result<ScanResult> {
        // Surface a missing root as an IO error instead of a warning
        std::fs::metadata(&self.root_path)?;

        let mut definition_files = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(&self.root_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 {
                    return true;
                }
                !e.file_name().to_string_lossy().starts_with('.')
            })
        {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if entry.file_type().is_file() && SourceFormat::from_path(path).is_some() {
                        definition_files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    let warning = format!("Failed to access path: {}", e);
                    warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        definition_files.sort();
        debug!(
            "Found {} definition files under {}",
            definition_files.len(),
            self.root_path.display()
        );

        Ok(ScanResult {
            definition_files,
            warnings,
        })
    }
}
