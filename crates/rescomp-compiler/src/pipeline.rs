//! The compilation driver.
//!
//! One invocation: parse every input unit, scan them all (collecting
//! every scan-time diagnostic before giving up), then load, resolve,
//! build the module, emit the object, and route the output. A missing
//! resource file aborts the whole build; nothing is partially
//! committed on failure.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::emit::{self, TargetArch};
use crate::error::Error;
use crate::frontend::{self, UnitSource};
use crate::loader::SearchPath;
use crate::module::{Module, ResourceRecord};
use crate::scan::{self, Registry, ResourceBinding, DEFAULT_TEMPLATE};
use crate::symbols::{self, SymbolPair, SymbolResolver};

/// What the output extension selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    /// `.o` / `.obj`: emit the object and keep it.
    Object,
    /// `.a` / `.lib`: emit to a temporary object, pack, discard it.
    Archive,
}

/// Everything one invocation needs, as parsed by the CLI.
#[derive(Debug, Clone)]
pub struct Options {
    pub inputs: Vec<UnitSource>,
    pub output: PathBuf,
    /// Target architecture name; `None` means the host.
    pub march: Option<String>,
    /// `-R` entries, in order.
    pub resource_dirs: Vec<PathBuf>,
    /// `-I` entries, in order.
    pub include_dirs: Vec<PathBuf>,
    /// Qualified template path the scanner matches on.
    pub template: Vec<String>,
}

impl Options {
    pub fn new(inputs: Vec<UnitSource>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            march: None,
            resource_dirs: Vec::new(),
            include_dirs: Vec::new(),
            template: DEFAULT_TEMPLATE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// What a successful compilation produced.
#[derive(Debug)]
pub struct Summary {
    pub resources: usize,
    pub output: PathBuf,
}

/// Run the whole pipeline.
///
/// Scan-time problems are collected across all inputs so one run
/// reports everything; later stages fail on the first error.
pub fn compile(opts: &Options) -> Result<Summary, Vec<Error>> {
    let arch = match &opts.march {
        Some(name) => TargetArch::parse(name),
        None => TargetArch::host(),
    }
    .map_err(|e| vec![e])?;
    let mode = output_mode(&opts.output).map_err(|e| vec![e])?;

    // Parse and scan every independent input, keeping all diagnostics.
    let mut errors = Vec::new();
    let mut units = Vec::new();
    for input in &opts.inputs {
        match frontend::load_unit(input, &opts.include_dirs) {
            Ok(mut loaded) => units.append(&mut loaded),
            Err(e) => errors.push(e),
        }
    }

    let mut registry = Registry::new();
    let mut bindings: Vec<(ResourceBinding, PathBuf)> = Vec::new();
    for unit in &units {
        match scan::scan_unit(unit, &opts.template, &mut registry) {
            Ok(found) => {
                let dir = unit.dir();
                bindings.extend(found.into_iter().map(|b| (b, dir.clone())));
            }
            Err(e) => errors.push(e),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }
    if bindings.is_empty() {
        warn!("no resource bindings found in any input");
    }

    // Resolve, load and accumulate; from here the first error aborts.
    let resolver = SymbolResolver::new(opts.template.clone());
    let mut module = Module::new(arch);
    for (binding, declaring_dir) in &bindings {
        let result: Result<(), Error> = (|| {
            let symbols = resolver.resolve(binding.id)?;
            info!(
                id = binding.id,
                begin = %symbols.begin,
                size = %symbols.size,
                "resolved symbols"
            );
            let search = SearchPath::new(&opts.resource_dirs, declaring_dir);
            let bytes = search.load(&binding.path)?;
            let record = ResourceRecord::new(binding.id, symbols, bytes)?;
            module.add(record);
            Ok(())
        })();
        if let Err(e) = result {
            return Err(vec![e]);
        }
    }

    let object_bytes = emit::emit(&module).map_err(|e| vec![e])?;
    route_output(opts, mode, &module, &object_bytes).map_err(|e| vec![e])?;

    info!(
        resources = module.len(),
        output = %opts.output.display(),
        "compilation finished"
    );
    Ok(Summary {
        resources: module.len(),
        output: opts.output.clone(),
    })
}

/// One raw file embedded under a caller-chosen C-linkage name.
#[derive(Debug, Clone)]
pub struct EmbedOptions {
    pub input: PathBuf,
    /// C identifier for the byte array; the length goes out as
    /// `<symbol>_size`.
    pub symbol: String,
    /// Target architecture name; `None` means the host.
    pub march: Option<String>,
}

/// The three artifacts a raw embed produces.
#[derive(Debug)]
pub struct EmbedSummary {
    pub object: PathBuf,
    pub archive: PathBuf,
    pub header: PathBuf,
}

/// Embed one raw file, bypassing the manifest front end.
///
/// The file's bytes are exported undecorated as `SYMBOL` and
/// `SYMBOL_size`, in an object, a single-member archive, and a
/// companion C++ header declaring both. Output names derive from the
/// input name and a target tag (`logo.bin` on x86-64 becomes
/// `logo.bin_x64.o`, `logo.bin_x64.a` and `logo.bin.h`); every
/// artifact is committed only once fully written.
pub fn embed(opts: &EmbedOptions) -> Result<EmbedSummary, Error> {
    if !symbols::is_identifier(&opts.symbol) {
        return Err(Error::InvalidSymbolName {
            name: opts.symbol.clone(),
        });
    }
    let arch = match &opts.march {
        Some(name) => TargetArch::parse(name),
        None => TargetArch::host(),
    }?;

    let bytes = std::fs::read(&opts.input).map_err(|source| Error::ResourceRead {
        path: opts.input.clone(),
        source,
    })?;

    let pair = SymbolPair {
        begin: opts.symbol.clone(),
        size: format!("{}_size", opts.symbol),
    };
    let mut module = Module::new(arch);
    module.add(ResourceRecord::new(0, pair, bytes)?);
    let object_bytes = emit::emit(&module)?;

    let (object, archive, header) = embed_names(&opts.input, arch);
    commit_write(&object, &object_bytes)?;
    commit_write(&header, header_text(&opts.symbol).as_bytes())?;
    crate::archive::pack(&object, &archive, &module.symbol_names())?;

    info!(
        object = %object.display(),
        archive = %archive.display(),
        header = %header.display(),
        "embed finished"
    );
    Ok(EmbedSummary {
        object,
        archive,
        header,
    })
}

/// Derive the object, archive and header paths from the input name.
fn embed_names(input: &Path, arch: TargetArch) -> (PathBuf, PathBuf, PathBuf) {
    let (objext, libext) = if cfg!(target_os = "windows") {
        ("obj", "lib")
    } else {
        ("o", "a")
    };
    let tag = arch.file_tag();

    let mut object = input.as_os_str().to_owned();
    object.push(format!("_{tag}.{objext}"));
    let mut archive = input.as_os_str().to_owned();
    archive.push(format!("_{tag}.{libext}"));
    let mut header = input.as_os_str().to_owned();
    header.push(".h");
    (object.into(), archive.into(), header.into())
}

/// The companion header declaring the two embedded symbols.
fn header_text(symbol: &str) -> String {
    format!(
        "#pragma once\n\n\
         #include <cstdint>\n\n\
         extern \"C\" {{\n\
         \textern const char {symbol}[];\n\
         \textern const uint32_t {symbol}_size;\n\
         }}\n"
    )
}

fn output_mode(output: &Path) -> Result<OutputMode, Error> {
    let ext = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("o") | Some("obj") => Ok(OutputMode::Object),
        Some("a") | Some("lib") => Ok(OutputMode::Archive),
        _ => Err(Error::InvalidOutputExtension {
            path: output.to_path_buf(),
        }),
    }
}

/// Write the final artifact.
///
/// Both modes stage the object in a uniquely named temporary file that
/// is only promoted (object mode) or consumed by the archiver (archive
/// mode) on success; any failure discards it instead of leaving a
/// half-built artifact behind.
fn route_output(
    opts: &Options,
    mode: OutputMode,
    module: &Module,
    object_bytes: &[u8],
) -> Result<(), Error> {
    match mode {
        OutputMode::Object => commit_write(&opts.output, object_bytes),
        OutputMode::Archive => {
            let out_dir = destination_dir(&opts.output);
            let staged = tempfile::Builder::new()
                .prefix("rescomp-")
                .suffix(".o")
                .tempfile_in(out_dir)
                .map_err(|source| Error::OutputIo {
                    path: opts.output.clone(),
                    source,
                })?;
            std::fs::write(staged.path(), object_bytes).map_err(|source| Error::OutputIo {
                path: staged.path().to_path_buf(),
                source,
            })?;
            crate::archive::pack(staged.path(), &opts.output, &module.symbol_names())?;
            // Dropping `staged` discards the temporary object.
            Ok(())
        }
    }
}

fn destination_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

/// Write `bytes` to `path` through a uniquely named temporary file in
/// the destination directory, promoted only once fully written.
fn commit_write(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let staged = tempfile::Builder::new()
        .prefix("rescomp-")
        .tempfile_in(destination_dir(path))
        .map_err(|source| Error::OutputIo {
            path: path.to_path_buf(),
            source,
        })?;
    std::fs::write(staged.path(), bytes).map_err(|source| Error::OutputIo {
        path: staged.path().to_path_buf(),
        source,
    })?;
    staged.persist(path).map_err(|e| Error::OutputIo {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}
