//! File-as-queue durable storage: the filesystem doubles as both queue and
//! durable log, so no in-memory buffer and no index file are needed.
//!
//! Grounded on `KodrAus-emit`'s `emitter/file` crate (`ActiveFileSet`,
//! `ActiveFile`) for the rolling-file-set and crash-safe append mechanics;
//! see `DESIGN.md` for the full grounding ledger.

pub mod file;
pub mod orchestrator;
pub mod reader;
pub mod writer;

pub use file::StoredFile;
pub use orchestrator::FilesOrchestrator;
pub use reader::{Batch, Reader};
pub use writer::Writer;
