//! Manifest unit loading and include resolution.
//!
//! A top-level input is either a file on disk or a synthesized unit
//! (the CLI hands those in for header-only inputs, which become
//! visible only once wrapped in an including unit). Each `include`
//! statement splices in another unit, resolved against the including
//! file's own directory first and then the `-I` directories in order.

use std::path::{Path, PathBuf};

use rescomp_syntax::{Item, ParseError, Unit};
use tracing::debug;

use crate::error::{Error, Result};

/// A top-level input handed to the compiler.
#[derive(Debug, Clone)]
pub struct UnitSource {
    /// Path used for diagnostics and for the declaring-directory entry
    /// of the resource search path.
    pub path: PathBuf,
    /// Synthesized source text. `None` means read `path` from disk.
    pub synthetic_text: Option<String>,
}

impl UnitSource {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            synthetic_text: None,
        }
    }

    pub fn synthetic(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            synthetic_text: Some(text.into()),
        }
    }
}

/// A parsed unit together with its source text, ready for scanning.
#[derive(Debug)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub text: String,
    pub ast: Unit,
}

impl SourceUnit {
    /// Directory containing this unit, the loader's last-resort search
    /// entry for bindings declared here.
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }
}

/// Load one top-level input and everything it includes, transitively.
///
/// Returns one [`SourceUnit`] per involved file so that every binding
/// keeps the location (and directory) of the file that declared it.
pub fn load_unit(input: &UnitSource, include_dirs: &[PathBuf]) -> Result<Vec<SourceUnit>> {
    let text = match &input.synthetic_text {
        Some(text) => text.clone(),
        None => std::fs::read_to_string(&input.path).map_err(|source| Error::ReadInput {
            path: input.path.clone(),
            source,
        })?,
    };

    let mut units = Vec::new();
    let mut chain = Vec::new();
    load_parsed(input.path.clone(), text, include_dirs, &mut chain, &mut units)?;
    Ok(units)
}

/// Parse `text` as the contents of `path`, then recurse into includes.
///
/// `chain` holds the canonicalized paths of the units currently being
/// expanded, for cycle detection.
fn load_parsed(
    path: PathBuf,
    text: String,
    include_dirs: &[PathBuf],
    chain: &mut Vec<PathBuf>,
    units: &mut Vec<SourceUnit>,
) -> Result<()> {
    let ast = rescomp_syntax::parse(&text).map_err(|errors| Error::Parse {
        unit: path.clone(),
        details: render_parse_errors(&path, &text, &errors),
    })?;

    let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
    if chain.contains(&canonical) {
        return Err(Error::IncludeCycle { path });
    }
    chain.push(canonical);

    let unit_dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    for item in &ast.items {
        if let Item::Include(inc) = item {
            let resolved = resolve_include(&inc.path, &unit_dir, include_dirs, &path)?;
            debug!(from = %path.display(), to = %resolved.display(), "include");
            let text =
                std::fs::read_to_string(&resolved).map_err(|source| Error::ReadInput {
                    path: resolved.clone(),
                    source,
                })?;
            load_parsed(resolved, text, include_dirs, chain, units)?;
        }
    }

    chain.pop();
    units.push(SourceUnit { path, text, ast });
    Ok(())
}

/// Resolve an include path: the including unit's directory first, then
/// the `-I` directories in the order given.
fn resolve_include(
    include: &str,
    unit_dir: &Path,
    include_dirs: &[PathBuf],
    from: &Path,
) -> Result<PathBuf> {
    let include_path = Path::new(include);
    if include_path.is_absolute() {
        if include_path.is_file() {
            return Ok(include_path.to_path_buf());
        }
        return Err(Error::IncludeNotFound {
            path: include.to_owned(),
            from: from.to_path_buf(),
            tried: vec![include_path
                .parent()
                .unwrap_or(Path::new("/"))
                .to_path_buf()],
        });
    }

    let mut tried = Vec::new();
    for dir in std::iter::once(unit_dir).chain(include_dirs.iter().map(PathBuf::as_path)) {
        let candidate = dir.join(include_path);
        if candidate.is_file() {
            return Ok(candidate);
        }
        tried.push(dir.to_path_buf());
    }

    Err(Error::IncludeNotFound {
        path: include.to_owned(),
        from: from.to_path_buf(),
        tried,
    })
}

fn render_parse_errors(path: &Path, text: &str, errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| {
            let (line, col) = e.span.line_col(text);
            format!("{}:{}:{}: {}", path.display(), line, col, e)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_a_unit_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("res.res");
        fs::write(&path, r#"const resman::Resource<1> A = "a.bin";"#).unwrap();

        let units = load_unit(&UnitSource::from_file(&path), &[]).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].ast.items.len(), 1);
    }

    #[test]
    fn include_splices_the_other_unit() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("main.res"),
            r#"include "inner.resh"; const resman::Resource<1> A = "a.bin";"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("inner.resh"),
            r#"const resman::Resource<2> B = "b.bin";"#,
        )
        .unwrap();

        let input = UnitSource::from_file(dir.path().join("main.res"));
        let units = load_unit(&input, &[]).unwrap();
        assert_eq!(units.len(), 2);
        // Included unit is fully loaded before the including one.
        assert!(units[0].path.ends_with("inner.resh"));
    }

    #[test]
    fn include_resolves_through_include_dirs() {
        let dir = tempdir().unwrap();
        let incdir = dir.path().join("headers");
        fs::create_dir(&incdir).unwrap();
        fs::write(incdir.join("inner.resh"), "").unwrap();
        fs::write(dir.path().join("main.res"), r#"include "inner.resh";"#).unwrap();

        let input = UnitSource::from_file(dir.path().join("main.res"));
        assert!(matches!(
            load_unit(&input, &[]),
            Err(Error::IncludeNotFound { .. })
        ));
        assert!(load_unit(&input, &[incdir]).is_ok());
    }

    #[test]
    fn include_cycle_is_detected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.res"), r#"include "b.res";"#).unwrap();
        fs::write(dir.path().join("b.res"), r#"include "a.res";"#).unwrap();

        let input = UnitSource::from_file(dir.path().join("a.res"));
        assert!(matches!(
            load_unit(&input, &[]),
            Err(Error::IncludeCycle { .. })
        ));
    }

    #[test]
    fn synthetic_units_are_not_read_from_disk() {
        let units = load_unit(
            &UnitSource::synthetic("virtual.res", r#"const resman::Resource<9> V = "v";"#),
            &[],
        )
        .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].path, PathBuf::from("virtual.res"));
    }

    #[test]
    fn parse_failure_names_the_unit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.res");
        fs::write(&path, "include ;").unwrap();

        let err = load_unit(&UnitSource::from_file(&path), &[]).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("bad.res"));
    }
}
