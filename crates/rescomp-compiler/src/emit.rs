//! Object-file emission.
//!
//! Lowers the module into a single relocatable object in the host
//! platform's native container format. The output is data only: per
//! resource, the byte array and its `u32` length are appended to the
//! read-only data section under their decorated names. No code, no
//! relocations.

use object::write::{Object, StandardSection, Symbol, SymbolSection};
use object::{Architecture, BinaryFormat, Endianness, SymbolFlags, SymbolKind, SymbolScope};
use tracing::debug;

use crate::error::{Error, Result};
use crate::module::Module;

/// Target architectures with a code generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArch {
    X86_64,
    I686,
    Aarch64,
    Riscv64,
}

impl TargetArch {
    /// Accepted architecture names, for diagnostics.
    pub const SUPPORTED: &'static [&'static str] = &[
        "x86-64", "x86_64", "x86", "i686", "aarch64", "arm64", "riscv64",
    ];

    /// Resolve a textual architecture name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "x86-64" | "x86_64" => Ok(Self::X86_64),
            "x86" | "i686" => Ok(Self::I686),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            "riscv64" => Ok(Self::Riscv64),
            _ => Err(Error::TargetUnsupported {
                name: name.to_owned(),
                supported: Self::SUPPORTED,
            }),
        }
    }

    /// The architecture this compiler itself runs on.
    pub fn host() -> Result<Self> {
        Self::parse(std::env::consts::ARCH)
    }

    /// Short tag used in derived output file names.
    pub fn file_tag(self) -> &'static str {
        match self {
            Self::X86_64 => "x64",
            Self::I686 => "x86",
            Self::Aarch64 => "aarch64",
            Self::Riscv64 => "riscv64",
        }
    }

    fn to_object(self) -> Architecture {
        match self {
            Self::X86_64 => Architecture::X86_64,
            Self::I686 => Architecture::I386,
            Self::Aarch64 => Architecture::Aarch64,
            Self::Riscv64 => Architecture::Riscv64,
        }
    }
}

/// The host platform's native relocatable object format.
fn host_format() -> BinaryFormat {
    if cfg!(target_os = "macos") {
        BinaryFormat::MachO
    } else if cfg!(target_os = "windows") {
        BinaryFormat::Coff
    } else {
        BinaryFormat::Elf
    }
}

/// Lower the module into object-file bytes.
///
/// Every failure from the writer surfaces as a codegen error; a
/// truncated object is never produced.
pub fn emit(module: &Module) -> Result<Vec<u8>> {
    let mut obj = Object::new(host_format(), module.arch().to_object(), Endianness::Little);
    let section = obj.section_id(StandardSection::ReadOnlyData);

    for record in module.records() {
        let begin = obj.add_symbol(Symbol {
            name: record.begin_symbol.clone().into_bytes(),
            value: 0,
            size: 0,
            kind: SymbolKind::Data,
            scope: SymbolScope::Dynamic,
            weak: false,
            section: SymbolSection::Undefined,
            flags: SymbolFlags::None,
        });
        obj.add_symbol_data(begin, section, &record.bytes, 1);

        let size = obj.add_symbol(Symbol {
            name: record.size_symbol.clone().into_bytes(),
            value: 0,
            size: 0,
            kind: SymbolKind::Data,
            scope: SymbolScope::Dynamic,
            weak: false,
            section: SymbolSection::Undefined,
            flags: SymbolFlags::None,
        });
        obj.add_symbol_data(size, section, &record.size_value().to_le_bytes(), 4);

        debug!(
            id = record.id,
            begin = %record.begin_symbol,
            size = %record.size_symbol,
            len = record.bytes.len(),
            "lowered resource"
        );
    }

    obj.write().map_err(|e| Error::Codegen {
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ResourceRecord;
    use crate::symbols::SymbolResolver;
    use object::{Object as _, ObjectSection, ObjectSymbol};

    fn test_module(resources: &[(u64, Vec<u8>)]) -> Module {
        let resolver = SymbolResolver::new(vec!["resman".into(), "Resource".into()]);
        let mut module = Module::new(TargetArch::X86_64);
        for (id, bytes) in resources {
            let pair = resolver.resolve(*id).unwrap();
            module.add(ResourceRecord::new(*id, pair, bytes.clone()).unwrap());
        }
        module
    }

    fn symbol_payload<'a>(file: &'a object::File, name: &str, len: usize) -> Vec<u8> {
        let sym = file
            .symbols()
            .find(|s| s.name().is_ok_and(|n| n == name))
            .unwrap_or_else(|| panic!("symbol {name} not found"));
        assert!(sym.is_definition());
        let section = file.section_by_index(sym.section_index().unwrap()).unwrap();
        let data = section.data().unwrap();
        let off = (sym.address() - section.address()) as usize;
        data[off..off + len].to_vec()
    }

    #[test]
    fn arch_names_resolve() {
        assert_eq!(TargetArch::parse("x86-64").unwrap(), TargetArch::X86_64);
        assert_eq!(TargetArch::parse("x86_64").unwrap(), TargetArch::X86_64);
        assert_eq!(TargetArch::parse("arm64").unwrap(), TargetArch::Aarch64);
        assert_eq!(TargetArch::parse("i686").unwrap(), TargetArch::I686);
    }

    #[test]
    fn unknown_arch_is_reported_not_a_crash() {
        let err = TargetArch::parse("mips").unwrap_err();
        match err {
            Error::TargetUnsupported { name, supported } => {
                assert_eq!(name, "mips");
                assert!(supported.contains(&"x86-64"));
            }
            other => panic!("expected TargetUnsupported, got {other}"),
        }
    }

    #[test]
    fn two_resources_emit_four_data_symbols() {
        let module = test_module(&[(1, vec![1, 2, 3, 4]), (2, vec![0; 10])]);
        let bytes = emit(&module).unwrap();

        let file = object::File::parse(&*bytes).unwrap();
        let defined: Vec<_> = file
            .symbols()
            .filter(|s| s.is_definition() && s.kind() == object::SymbolKind::Data)
            .collect();
        assert_eq!(defined.len(), 4);
    }

    #[test]
    fn size_symbol_holds_exact_byte_length() {
        let module = test_module(&[(1, vec![1, 2, 3, 4]), (2, vec![0xAB; 10])]);
        let bytes = emit(&module).unwrap();
        let file = object::File::parse(&*bytes).unwrap();

        let size1 = symbol_payload(&file, "_ZN6resman8ResourceILy1EE12storage_sizeE", 4);
        assert_eq!(size1, 4u32.to_le_bytes());
        let size2 = symbol_payload(&file, "_ZN6resman8ResourceILy2EE12storage_sizeE", 4);
        assert_eq!(size2, 10u32.to_le_bytes());
    }

    #[test]
    fn begin_symbol_holds_exact_bytes_no_terminator() {
        let payload = vec![0x01, 0x02, 0x03, 0x04];
        let module = test_module(&[(1, payload.clone())]);
        let bytes = emit(&module).unwrap();
        let file = object::File::parse(&*bytes).unwrap();

        let begin = symbol_payload(&file, "_ZN6resman8ResourceILy1EE13storage_beginE", 4);
        assert_eq!(begin, payload);
    }

    #[test]
    fn empty_module_still_emits_a_valid_object() {
        let module = test_module(&[]);
        let bytes = emit(&module).unwrap();
        let file = object::File::parse(&*bytes).unwrap();
        assert_eq!(
            file.symbols()
                .filter(|s| s.kind() == object::SymbolKind::Data)
                .count(),
            0
        );
    }

    #[test]
    fn cross_emission_targets_the_requested_arch() {
        let resolver = SymbolResolver::new(vec!["resman".into(), "Resource".into()]);
        let mut module = Module::new(TargetArch::Aarch64);
        let pair = resolver.resolve(1).unwrap();
        module.add(ResourceRecord::new(1, pair, vec![1]).unwrap());

        let bytes = emit(&module).unwrap();
        let file = object::File::parse(&*bytes).unwrap();
        assert_eq!(file.architecture(), object::Architecture::Aarch64);
    }
}
