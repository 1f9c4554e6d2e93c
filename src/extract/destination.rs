//! Destinations for the outcome of an operation.
//!
//! A committed outcome sends its units to `success` and the input to
//! `original`; a failed one sends only the input to `failure`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::{OutputUnit, SourceInput};

use super::transaction::Outcome;

/// Receives the outcome of each operation.
pub trait Destination {
    fn deliver(&mut self, outcome: Outcome) -> Result<()>;
}

/// Keeps every delivered item in memory, grouped by route.
#[derive(Debug, Default)]
pub struct MemoryDestination {
    pub success: Vec<OutputUnit>,
    pub original: Vec<SourceInput>,
    pub failure: Vec<(SourceInput, String)>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Destination for MemoryDestination {
    fn deliver(&mut self, outcome: Outcome) -> Result<()> {
        match outcome {
            Outcome::Committed { units, original } => {
                self.success.extend(units);
                self.original.push(original);
            }
            Outcome::Failed {
                original, message, ..
            } => self.failure.push((original, message)),
        }
        Ok(())
    }
}

/// Writes outcomes below a root directory.
///
/// ```text
/// root/
/// ├── success/   doc_page1_image1.tiff, doc_page1_image1.tiff.json, ...
/// ├── original/  doc.pdf
/// └── failure/   doc.pdf, doc.pdf.error.txt
/// ```
///
/// Units of one outcome are staged first and moved into `success` only once
/// all of them have been written.
#[derive(Debug, Clone)]
pub struct DirectoryDestination {
    root: PathBuf,
    sidecars: bool,
}

impl DirectoryDestination {
    pub const SUCCESS: &'static str = "success";
    pub const ORIGINAL: &'static str = "original";
    pub const FAILURE: &'static str = "failure";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sidecars: true,
        }
    }

    /// Write a JSON file with the attributes of each unit next to it.
    pub fn with_sidecars(mut self, enabled: bool) -> Self {
        self.sidecars = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn route(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write_success(&self, units: &[OutputUnit], source: &SourceInput) -> Result<()> {
        let success = self.route(Self::SUCCESS);
        fs::create_dir_all(&success)?;

        let staging = self.root.join(format!(".staging-{}", source.stem()));
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let result = self
            .stage(units, source, &staging)
            .and_then(|names| publish(&staging, &success, &names));

        if let Err(e) = fs::remove_dir_all(&staging) {
            log::warn!("Could not remove {}: {}", staging.display(), e);
        }
        result
    }

    fn stage(&self, units: &[OutputUnit], source: &SourceInput, dir: &Path) -> Result<Vec<String>> {
        let mut names = Vec::with_capacity(units.len() * 2);
        for unit in units {
            let name = unit.suggested_filename(source.stem());
            fs::write(dir.join(&name), &unit.payload)?;

            if self.sidecars {
                let sidecar = format!("{}.json", name);
                let json = serde_json::to_vec_pretty(unit)
                    .map_err(|e| Error::Other(format!("attribute sidecar: {}", e)))?;
                fs::write(dir.join(&sidecar), json)?;
                names.push(sidecar);
            }
            names.push(name);
        }
        Ok(names)
    }

    fn write_input(&self, route: &str, source: &SourceInput) -> Result<PathBuf> {
        let dir = self.route(route);
        fs::create_dir_all(&dir)?;
        let path = dir.join(&source.name);
        fs::write(&path, &source.data)?;
        Ok(path)
    }
}

/// Move staged files into `success`. On error, files already moved are
/// removed again so no partial set stays visible.
fn publish(staging: &Path, success: &Path, names: &[String]) -> Result<()> {
    for (i, name) in names.iter().enumerate() {
        if let Err(e) = fs::rename(staging.join(name), success.join(name)) {
            for published in &names[..i] {
                let path = success.join(published);
                if let Err(undo) = fs::remove_file(&path) {
                    log::warn!("Could not roll back {}: {}", path.display(), undo);
                }
            }
            return Err(e.into());
        }
    }
    Ok(())
}

impl Destination for DirectoryDestination {
    fn deliver(&mut self, outcome: Outcome) -> Result<()> {
        match outcome {
            Outcome::Committed { units, original } => {
                self.write_success(&units, &original)?;
                self.write_input(Self::ORIGINAL, &original)?;
                log::debug!(
                    "Wrote {} units for {} to {}",
                    units.len(),
                    original.name,
                    self.root.display()
                );
            }
            Outcome::Failed {
                original,
                kind,
                message,
            } => {
                let path = self.write_input(Self::FAILURE, &original)?;
                let mut report = path.into_os_string();
                report.push(".error.txt");
                fs::write(report, format!("{} error: {}\n", kind, message))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn text_unit(page: u32, text: &str) -> OutputUnit {
        let mut attrs = BTreeMap::new();
        attrs.insert("page".to_string(), page.to_string());
        OutputUnit::new(text.as_bytes().to_vec(), "text/plain", attrs)
    }

    #[test]
    fn test_memory_destination_routes() {
        let mut dest = MemoryDestination::new();
        dest.deliver(Outcome::Committed {
            units: vec![text_unit(1, "a"), text_unit(2, "b")],
            original: SourceInput::new("a.pdf", vec![1]),
        })
        .unwrap();
        dest.deliver(Outcome::Failed {
            original: SourceInput::new("b.pdf", vec![2]),
            kind: ErrorKind::Decode,
            message: "broken".into(),
        })
        .unwrap();

        assert_eq!(dest.success.len(), 2);
        assert_eq!(dest.original.len(), 1);
        assert_eq!(dest.failure.len(), 1);
        assert_eq!(dest.failure[0].1, "broken");
    }

    #[test]
    fn test_directory_destination_success() {
        let tmp = TempDir::new().unwrap();
        let mut dest = DirectoryDestination::new(tmp.path());
        dest.deliver(Outcome::Committed {
            units: vec![text_unit(1, "one\n"), text_unit(2, "two\n")],
            original: SourceInput::new("report.pdf", b"%PDF-1.4".to_vec()),
        })
        .unwrap();

        let success = tmp.path().join("success");
        assert_eq!(fs::read_to_string(success.join("report_page1.txt")).unwrap(), "one\n");
        assert_eq!(fs::read_to_string(success.join("report_page2.txt")).unwrap(), "two\n");

        let sidecar = fs::read_to_string(success.join("report_page2.txt.json")).unwrap();
        let parsed: OutputUnit = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(parsed.page(), Some(2));
        assert!(parsed.payload.is_empty());

        assert_eq!(
            fs::read(tmp.path().join("original").join("report.pdf")).unwrap(),
            b"%PDF-1.4"
        );
        assert!(!tmp.path().join("failure").exists());
        assert!(!tmp.path().join(".staging-report").exists());
    }

    #[test]
    fn test_directory_destination_failure() {
        let tmp = TempDir::new().unwrap();
        let mut dest = DirectoryDestination::new(tmp.path()).with_sidecars(false);
        dest.deliver(Outcome::Failed {
            original: SourceInput::new("bad.pdf", b"junk".to_vec()),
            kind: ErrorKind::Decode,
            message: "Unknown file format: not a valid PDF".into(),
        })
        .unwrap();

        let failure = tmp.path().join("failure");
        assert_eq!(fs::read(failure.join("bad.pdf")).unwrap(), b"junk");
        let report = fs::read_to_string(failure.join("bad.pdf.error.txt")).unwrap();
        assert!(report.starts_with("decode error:"));
        assert!(!tmp.path().join("success").exists());
        assert!(!tmp.path().join("original").exists());
    }

    #[test]
    fn test_directory_destination_rolls_back_partial_success() {
        let tmp = TempDir::new().unwrap();
        // A directory in the way makes the second move fail.
        fs::create_dir_all(tmp.path().join("success").join("report_page2.txt")).unwrap();

        let mut dest = DirectoryDestination::new(tmp.path()).with_sidecars(false);
        let result = dest.deliver(Outcome::Committed {
            units: vec![text_unit(1, "one\n"), text_unit(2, "two\n")],
            original: SourceInput::new("report.pdf", b"%PDF-1.4".to_vec()),
        });

        assert!(result.is_err());
        assert!(!tmp.path().join("success").join("report_page1.txt").exists());
        assert!(!tmp.path().join("original").exists());
        assert!(!tmp.path().join(".staging-report").exists());
    }
}
