//! Parsers for sales import files

mod wide_csv;

pub use wide_csv::WideCsvParser;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::types::{ProductRow, Result, SalescastError};

/// A parser for one import file format
pub trait SalesParser: Send + Sync {
    /// Parser identifier
    fn name(&self) -> &str;

    /// Glob pattern for files this parser reads, relative to a directory
    fn file_pattern(&self) -> &str;

    /// Parse a single file
    fn parse_file(&self, path: &Path) -> Result<Vec<ProductRow>>;

    /// All matching files beneath `dir`, sorted
    fn find_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let pattern = dir.join(self.file_pattern());
        let pattern_str = pattern.to_string_lossy();

        let mut files: Vec<PathBuf> = glob::glob(&pattern_str)
            .map_err(|e| SalescastError::Parse(format!("bad pattern {}: {}", pattern_str, e)))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    /// Parse a file, or every matching file when `path` is a directory.
    /// Rows keep file order.
    fn parse_path(&self, path: &Path) -> Result<Vec<ProductRow>> {
        if !path.is_dir() {
            return self.parse_file(path);
        }

        let files = self.find_files(path)?;
        log::info!(
            "{}: {} files under {}",
            self.name(),
            files.len(),
            path.display()
        );

        let parsed = files
            .par_iter()
            .map(|file| self.parse_file(file))
            .collect::<Result<Vec<_>>>()?;
        Ok(parsed.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SAMPLE: &str = "Family,Product Name,Product ID,Price,2023-07\nElectronics,Smartwatch,1,199.99,30\n";

    #[test]
    fn test_find_files_recursive_sorted() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("2023")).unwrap();
        fs::write(temp.path().join("b.csv"), SAMPLE).unwrap();
        fs::write(temp.path().join("2023").join("a.csv"), SAMPLE).unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let files = WideCsvParser::new().find_files(temp.path()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "csv"));
    }

    #[test]
    fn test_parse_path_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.csv"), SAMPLE).unwrap();
        fs::write(
            temp.path().join("b.csv"),
            SAMPLE.replace(",1,199.99", ",2,99.00"),
        )
        .unwrap();

        let rows = WideCsvParser::new().parse_path(temp.path()).unwrap();

        let ids: Vec<i64> = rows.iter().map(|r| r.product_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_parse_path_single_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("sales.csv");
        fs::write(&file, SAMPLE).unwrap();

        let rows = WideCsvParser::new().parse_path(&file).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_parse_path_missing_file() {
        let result = WideCsvParser::new().parse_path(Path::new("/nonexistent/sales.csv"));
        assert!(matches!(result, Err(SalescastError::Io(_))));
    }
}
