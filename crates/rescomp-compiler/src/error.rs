//! Compilation errors.
//!
//! One enum covers every stage of the pipeline. Scan-time errors
//! (unparseable units, duplicate IDs) abort the whole compilation, as
//! do load, mangle, codegen and archive failures. No stage partially
//! commits output on failure.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Compilation result type.
pub type Result<T> = std::result::Result<T, Error>;

/// A resolved source position, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    pub file: PathBuf,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.col)
    }
}

/// Errors that can occur during resource compilation.
#[derive(Debug, Error)]
pub enum Error {
    /// An input unit could not be read from disk.
    #[error("cannot read input {}: {source}", .path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An input unit could not be parsed. `details` carries one
    /// `file:line:col: message` line per parse error.
    #[error("cannot parse {}:\n{details}", .unit.display())]
    Parse { unit: PathBuf, details: String },

    /// An included unit was not found in any include directory.
    #[error("include \"{path}\" (from {}) not found; tried: {}", .from.display(), format_dirs(.tried))]
    IncludeNotFound {
        path: String,
        from: PathBuf,
        tried: Vec<PathBuf>,
    },

    /// A unit transitively includes itself.
    #[error("include cycle through {}", .path.display())]
    IncludeCycle { path: PathBuf },

    /// The same resource ID was bound twice in one compilation.
    #[error("duplicate resource ID {id}: redefined at {second}, first defined at {first}")]
    DuplicateId {
        id: u64,
        first: SourceLoc,
        second: SourceLoc,
    },

    /// A bound resource file was not found in any search directory.
    #[error("resource \"{path}\" not found; tried: {}", format_dirs(.tried))]
    ResourceNotFound { path: String, tried: Vec<PathBuf> },

    /// A resource file failed to read after it was found.
    #[error("cannot read resource {}: {source}", .path.display())]
    ResourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The size symbol is a u32; larger resources cannot be embedded.
    #[error("resource ID {id} is {len} bytes, which exceeds the 32-bit size limit")]
    ResourceTooLarge { id: u64, len: u64 },

    /// The configured template path cannot be decorated into linkable
    /// symbol names.
    #[error("cannot mangle symbol names for resource ID {id}: {detail}")]
    Mangle { id: u64, detail: String },

    /// A raw-embed symbol name that cannot appear in an object file.
    #[error("\"{name}\" is not a valid C identifier")]
    InvalidSymbolName { name: String },

    /// The requested target architecture has no code generator.
    #[error("unsupported target architecture \"{name}\" (supported: {})", .supported.join(", "))]
    TargetUnsupported {
        name: String,
        supported: &'static [&'static str],
    },

    /// Object-file lowering failed.
    #[error("object emission failed: {detail}")]
    Codegen { detail: String },

    /// The output artifact could not be written.
    #[error("cannot write output {}: {source}", .path.display())]
    OutputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output extension selects neither object nor archive mode.
    #[error("invalid output file type: {} (expected .o/.obj or .a/.lib)", .path.display())]
    InvalidOutputExtension { path: PathBuf },

    /// Archive packing failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Archiver failures, split by which file could not be handled.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The object member to be added could not be opened.
    #[error("cannot open archive member {}: {source}", .path.display())]
    MemberOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive itself could not be written.
    #[error("cannot write archive {}: {source}", .path.display())]
    WriteArchive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn format_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
