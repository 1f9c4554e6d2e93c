//! Extraction pipeline: page walking, per-page strategies, output assembly
//! and the all-or-nothing transaction around them.

pub mod assembler;
pub mod destination;
pub mod images;
pub mod text;
pub mod transaction;
pub mod walker;

pub use assembler::{OutputAssembler, TEXT_MIME_TYPE};
pub use destination::{Destination, DirectoryDestination, MemoryDestination};
pub use transaction::{process, process_into, Outcome, Transaction, TransactionState};
pub use walker::{walk, PageOrdinal, PageWalker};
