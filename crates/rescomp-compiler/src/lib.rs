//! Resource compilation pipeline.
//!
//! Compiles resource manifests into a native linkable artifact: each
//! binding of an integer ID to a file path becomes two exported data
//! symbols in a relocatable object (optionally wrapped in a static
//! archive): the file's bytes and their 32-bit length, under
//! deterministically decorated names a consuming program references at
//! link time.
//!
//! Pipeline stages, in order:
//!
//! 1. [`frontend`]: unit loading, parsing, include resolution
//! 2. [`scan`]: binding recognition and ID uniqueness
//! 3. [`loader`]: resource bytes via the search path
//! 4. [`symbols`]: decorated symbol names
//! 5. [`module`]: in-memory module accumulation
//! 6. [`emit`]: relocatable object generation
//! 7. [`archive`]: static-library packing
//!
//! [`pipeline::compile`] drives all of it for one invocation.
//! [`pipeline::embed`] is the manifest-free entry point: one raw file
//! exported under undecorated C-linkage names, with a companion
//! header.

pub mod archive;
pub mod emit;
pub mod error;
pub mod frontend;
pub mod loader;
pub mod module;
pub mod pipeline;
pub mod scan;
pub mod symbols;

pub use emit::TargetArch;
pub use error::{ArchiveError, Error, Result, SourceLoc};
pub use frontend::{SourceUnit, UnitSource};
pub use module::{Module, ResourceRecord};
pub use pipeline::{compile, embed, EmbedOptions, EmbedSummary, Options, Summary};
pub use scan::{Registry, ResourceBinding, DEFAULT_TEMPLATE};
pub use symbols::{SymbolPair, SymbolResolver};
