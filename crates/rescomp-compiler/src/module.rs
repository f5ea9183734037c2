//! In-memory module accumulation.
//!
//! Exactly one [`Module`] exists per invocation. It is filled by the
//! pipeline while scanning and loading, then consumed read-only by the
//! object emitter.

use crate::emit::TargetArch;
use crate::error::{Error, Result};
use crate::symbols::SymbolPair;

/// One loaded, resolved resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub id: u64,
    pub begin_symbol: String,
    pub size_symbol: String,
    pub bytes: Vec<u8>,
}

impl ResourceRecord {
    /// Build a record, enforcing the 32-bit size-symbol limit.
    pub fn new(id: u64, symbols: SymbolPair, bytes: Vec<u8>) -> Result<Self> {
        ensure_embeddable(id, bytes.len() as u64)?;
        Ok(Self {
            id,
            begin_symbol: symbols.begin,
            size_symbol: symbols.size,
            bytes,
        })
    }

    /// The value emitted under the size symbol.
    pub fn size_value(&self) -> u32 {
        self.bytes.len() as u32
    }
}

/// The size symbol is a u32; a resource of `len` bytes must fit it.
fn ensure_embeddable(id: u64, len: u64) -> Result<()> {
    if len > u64::from(u32::MAX) {
        return Err(Error::ResourceTooLarge { id, len });
    }
    Ok(())
}

/// The module being compiled: resource records plus a target.
#[derive(Debug)]
pub struct Module {
    arch: TargetArch,
    records: Vec<ResourceRecord>,
}

impl Module {
    pub fn new(arch: TargetArch) -> Self {
        Self {
            arch,
            records: Vec::new(),
        }
    }

    /// Insert a record.
    ///
    /// Symbol names are derived 1:1 from IDs already proven unique by
    /// the registry, so a collision here is a compiler bug.
    pub fn add(&mut self, record: ResourceRecord) {
        debug_assert!(
            !self
                .records
                .iter()
                .any(|r| r.begin_symbol == record.begin_symbol),
            "symbol collision for resource ID {}",
            record.id
        );
        self.records.push(record);
    }

    pub fn arch(&self) -> TargetArch {
        self.arch
    }

    pub fn records(&self) -> &[ResourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All exported symbol names, in record order, begin before size.
    pub fn symbol_names(&self) -> Vec<String> {
        self.records
            .iter()
            .flat_map(|r| [r.begin_symbol.clone(), r.size_symbol.clone()])
            .collect()
    }
}
