//! Transaction controller.
//!
//! One extraction pass is all-or-nothing: output units accumulate in a
//! [`Transaction`] and are released together on commit, or dropped together
//! on failure. The source input is handed back in both cases.

use crate::config::ExtractConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::model::{OutputUnit, SourceInput};
use crate::parser::PdfDocument;

use super::assembler::OutputAssembler;
use super::destination::Destination;
use super::walker::PageWalker;

/// Terminal state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Running,
    Committed,
    Failed,
}

/// Result of one operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Every unit of the pass, plus the untouched input
    Committed {
        units: Vec<OutputUnit>,
        original: SourceInput,
    },
    /// No units; the input is routed to failure
    Failed {
        original: SourceInput,
        kind: ErrorKind,
        message: String,
    },
}

impl Outcome {
    pub fn state(&self) -> TransactionState {
        match self {
            Outcome::Committed { .. } => TransactionState::Committed,
            Outcome::Failed { .. } => TransactionState::Failed,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed { .. })
    }

    /// The source input, whichever way the operation ended.
    pub fn original(&self) -> &SourceInput {
        match self {
            Outcome::Committed { original, .. } | Outcome::Failed { original, .. } => original,
        }
    }

    /// Committed units; empty for a failed operation.
    pub fn units(&self) -> &[OutputUnit] {
        match self {
            Outcome::Committed { units, .. } => units,
            Outcome::Failed { .. } => &[],
        }
    }

    /// Failure message, if the operation failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Committed { .. } => None,
            Outcome::Failed { message, .. } => Some(message),
        }
    }
}

/// Pending output of one operation.
#[derive(Debug)]
pub struct Transaction {
    source: SourceInput,
    pending: Vec<OutputUnit>,
}

impl Transaction {
    /// Start a transaction for `source`.
    pub fn begin(source: SourceInput) -> Self {
        log::debug!("Begin transaction for {}", source.name);
        Self {
            source,
            pending: Vec::new(),
        }
    }

    pub fn source(&self) -> &SourceInput {
        &self.source
    }

    /// Always `Running`; `commit` and `fail` consume the transaction.
    pub fn state(&self) -> TransactionState {
        TransactionState::Running
    }

    /// Number of units accumulated so far.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Add a unit to the pending set.
    pub fn push(&mut self, unit: OutputUnit) {
        self.pending.push(unit);
    }

    /// Release every pending unit alongside the source input.
    pub fn commit(self) -> Outcome {
        log::info!(
            "Committed {} output units for {}",
            self.pending.len(),
            self.source.name
        );
        Outcome::Committed {
            units: self.pending,
            original: self.source,
        }
    }

    /// Discard every pending unit and route the source input to failure.
    pub fn fail(self, err: &Error) -> Outcome {
        let message = err.to_string();
        log::error!("{}: {}", self.source.name, message);
        if !self.pending.is_empty() {
            log::debug!("Discarding {} pending units", self.pending.len());
        }
        Outcome::Failed {
            original: self.source,
            kind: err.kind(),
            message,
        }
    }

    /// Load, walk and assemble, pushing every unit.
    fn extract(&mut self, config: &ExtractConfig) -> Result<()> {
        let doc = PdfDocument::load(&self.source.data)?;
        let assembler = OutputAssembler::new(config, &self.source);

        for item in PageWalker::new(&doc, config) {
            let unit = assembler.assemble(item?)?;
            self.pending.push(unit);
        }
        Ok(())
    }
}

/// Run one complete operation on `input`.
pub fn process(input: SourceInput, config: &ExtractConfig) -> Outcome {
    let mut transaction = Transaction::begin(input);
    match transaction.extract(config) {
        Ok(()) => transaction.commit(),
        Err(e) => transaction.fail(&e),
    }
}

/// Run one operation and hand its outcome to `destination`.
pub fn process_into(
    input: SourceInput,
    config: &ExtractConfig,
    destination: &mut dyn Destination,
) -> Result<()> {
    destination.deliver(process(input, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn unit(page: u32) -> OutputUnit {
        let mut attrs = BTreeMap::new();
        attrs.insert("page".to_string(), page.to_string());
        OutputUnit::new(vec![], "text/plain", attrs)
    }

    #[test]
    fn test_commit_releases_all_units() {
        let mut tx = Transaction::begin(SourceInput::new("a.pdf", vec![1]));
        tx.push(unit(1));
        tx.push(unit(2));
        assert_eq!(tx.pending(), 2);

        let outcome = tx.commit();
        assert_eq!(outcome.state(), TransactionState::Committed);
        assert_eq!(outcome.units().len(), 2);
        assert_eq!(outcome.original().data, vec![1]);
    }

    #[test]
    fn test_fail_discards_units() {
        let mut tx = Transaction::begin(SourceInput::new("a.pdf", vec![1]));
        tx.push(unit(1));

        let outcome = tx.fail(&Error::ImageDecode {
            page: 1,
            image: 2,
            message: "bad".into(),
        });
        assert_eq!(outcome.state(), TransactionState::Failed);
        assert!(outcome.units().is_empty());
        assert_eq!(outcome.error_message(), Some("Page 1, image 2: bad"));
        assert!(matches!(
            outcome,
            Outcome::Failed {
                kind: ErrorKind::Extraction,
                ..
            }
        ));
    }

    #[test]
    fn test_process_non_pdf_fails_with_decode_kind() {
        let input = SourceInput::new("notes.txt", b"plain text".to_vec());
        let outcome = process(input.clone(), &ExtractConfig::text());
        match outcome {
            Outcome::Failed { original, kind, .. } => {
                assert_eq!(original, input);
                assert_eq!(kind, ErrorKind::Decode);
            }
            other => panic!("expected failure, got {:?}", other.state()),
        }
    }
}
