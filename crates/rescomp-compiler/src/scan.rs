//! Declaration scanning and the resource ID registry.
//!
//! The scanner walks the parsed items of one unit and keeps only
//! declarations that match the binding shape completely: the
//! configured template path, a constant-foldable ID, and a string
//! literal path. Everything else was either already marked skippable
//! by the parser or is filtered here, silently.
//!
//! ID uniqueness is global to one compilation and enforced by the
//! [`Registry`], not by the module: a duplicate aborts scanning of the
//! unit that produced it, in the style of a compiler redefinition
//! diagnostic pointing at both sites.

use indexmap::IndexMap;
use rescomp_syntax::{Item, ResourceDecl, Span};
use tracing::{debug, info};

use crate::error::{Error, Result, SourceLoc};
use crate::frontend::SourceUnit;

/// The default qualified template name recognized as a binding.
pub const DEFAULT_TEMPLATE: &[&str] = &["resman", "Resource"];

/// A recognized resource binding, ready for loading.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBinding {
    pub id: u64,
    /// The bound file path, exactly as written in the declaration.
    pub path: String,
    /// Where the declaration appeared.
    pub loc: SourceLoc,
}

/// Tracks every resource ID seen in one compilation.
///
/// Insertion-ordered so diagnostics and emitted symbols follow
/// declaration order. Owned by a single invocation; never shared.
#[derive(Debug, Default)]
pub struct Registry {
    seen: IndexMap<u64, SourceLoc>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an ID, failing if it was already registered.
    pub fn register(&mut self, id: u64, loc: SourceLoc) -> Result<()> {
        if let Some(first) = self.seen.get(&id) {
            return Err(Error::DuplicateId {
                id,
                first: first.clone(),
                second: loc,
            });
        }
        self.seen.insert(id, loc);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Scan one unit for resource bindings.
///
/// A duplicate ID aborts scanning of this unit; independent units can
/// still be scanned to surface their own diagnostics, but the overall
/// compilation must fail once any duplicate occurred.
pub fn scan_unit(
    unit: &SourceUnit,
    template: &[String],
    registry: &mut Registry,
) -> Result<Vec<ResourceBinding>> {
    let mut bindings = Vec::new();

    for item in &unit.ast.items {
        let Item::Resource(decl) = item else {
            continue;
        };
        let Some(binding) = match_binding(unit, decl, template) else {
            continue;
        };

        registry.register(binding.id, binding.loc.clone())?;
        info!(
            id = binding.id,
            path = %binding.path,
            at = %binding.loc,
            "resource binding"
        );
        bindings.push(binding);
    }

    Ok(bindings)
}

/// Apply the shape filter to one candidate declaration.
fn match_binding(
    unit: &SourceUnit,
    decl: &ResourceDecl,
    template: &[String],
) -> Option<ResourceBinding> {
    if decl.template != template {
        debug!(
            declared = decl.template.join("::"),
            "skipping declaration with non-binding template"
        );
        return None;
    }
    let path = decl.path.as_ref()?;
    let Some(id) = decl.id_expr.fold() else {
        debug!(name = %decl.name, "skipping binding with non-constant ID");
        return None;
    };

    Some(ResourceBinding {
        id,
        path: path.clone(),
        loc: locate(unit, decl.span),
    })
}

fn locate(unit: &SourceUnit, span: Span) -> SourceLoc {
    let (line, col) = span.line_col(&unit.text);
    SourceLoc {
        file: unit.path.clone(),
        line,
        col,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn unit(source: &str) -> SourceUnit {
        SourceUnit {
            path: PathBuf::from("test.res"),
            text: source.to_owned(),
            ast: rescomp_syntax::parse(source).expect("test source should parse"),
        }
    }

    fn template() -> Vec<String> {
        DEFAULT_TEMPLATE.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scans_matching_bindings() {
        let unit = unit(
            r#"
            const resman::Resource<1> A = "a.bin";
            const resman::Resource<0x10 + 2> B = "b.bin";
            "#,
        );
        let mut registry = Registry::new();
        let bindings = scan_unit(&unit, &template(), &mut registry).unwrap();

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].id, 1);
        assert_eq!(bindings[0].path, "a.bin");
        assert_eq!(bindings[0].loc.line, 2);
        assert_eq!(bindings[1].id, 18);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn other_templates_are_skipped() {
        let unit = unit(r#"const other::Thing<1> A = "a.bin";"#);
        let mut registry = Registry::new();
        let bindings = scan_unit(&unit, &template(), &mut registry).unwrap();
        assert!(bindings.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn non_constant_id_is_skipped() {
        let unit = unit(r#"const resman::Resource<BASE + 1> A = "a.bin";"#);
        let mut registry = Registry::new();
        assert!(scan_unit(&unit, &template(), &mut registry)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn non_literal_path_is_skipped() {
        let unit = unit(r#"const resman::Resource<1> A = some_path;"#);
        let mut registry = Registry::new();
        assert!(scan_unit(&unit, &template(), &mut registry)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn duplicate_id_reports_both_locations() {
        let unit = unit(
            r#"
            const resman::Resource<7> A = "a.bin";
            const resman::Resource<7> B = "b.bin";
            "#,
        );
        let mut registry = Registry::new();
        let err = scan_unit(&unit, &template(), &mut registry).unwrap_err();
        match err {
            Error::DuplicateId { id, first, second } => {
                assert_eq!(id, 7);
                assert_eq!(first.line, 2);
                assert_eq!(second.line, 3);
            }
            other => panic!("expected DuplicateId, got {other}"),
        }
    }

    #[test]
    fn duplicate_across_units_in_any_order() {
        let a = unit(r#"const resman::Resource<3> A = "a.bin";"#);
        let b = unit(r#"const resman::Resource<3> B = "b.bin";"#);
        let mut registry = Registry::new();

        scan_unit(&a, &template(), &mut registry).unwrap();
        assert!(matches!(
            scan_unit(&b, &template(), &mut registry),
            Err(Error::DuplicateId { id: 3, .. })
        ));
    }

    #[test]
    fn custom_template_path() {
        let unit = unit(r#"const game::assets::Res<5> A = "a.bin";"#);
        let custom: Vec<String> = ["game", "assets", "Res"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut registry = Registry::new();
        let bindings = scan_unit(&unit, &custom, &mut registry).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].id, 5);
    }
}
