//! Symbol name resolution.
//!
//! The compiler owns its name-decoration scheme end to end instead of
//! imitating a host toolchain. Scheme v1 is the Itanium C++ ABI
//! encoding of the two static storage members of the binding template
//! specialization, with the resource ID as an `unsigned long long`
//! non-type template argument:
//!
//! ```text
//! _ZN 6resman 8Resource ILy<id>EE 13storage_begin E
//! _ZN 6resman 8Resource ILy<id>EE 12storage_size  E
//! ```
//!
//! e.g. `resman::Resource<1>` decorates to
//! `_ZN6resman8ResourceILy1EE13storage_beginE` and
//! `_ZN6resman8ResourceILy1EE12storage_sizeE`. A consuming header that
//! declares `template <unsigned long long N>` storage members under
//! the same qualified name links against these symbols byte for byte.
//!
//! The scheme is deterministic, so symbol uniqueness follows directly
//! from ID uniqueness.

use std::fmt::Write;

use crate::error::{Error, Result};

/// Member name of the embedded byte array.
const BEGIN_MEMBER: &str = "storage_begin";
/// Member name of the embedded length.
const SIZE_MEMBER: &str = "storage_size";

/// The two decorated names emitted for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPair {
    pub begin: String,
    pub size: String,
}

/// Derives decorated symbol names from resource IDs.
///
/// Constructed once per invocation from the qualified template path
/// the scanner matches on, so the scanner and the resolver can never
/// disagree about which template is being decorated.
#[derive(Debug, Clone)]
pub struct SymbolResolver {
    template: Vec<String>,
}

impl SymbolResolver {
    pub fn new(template: Vec<String>) -> Self {
        Self { template }
    }

    /// Compute the begin/size symbol names for `id`.
    ///
    /// Fails if any component of the template path is not a valid
    /// identifier; such a declaration has no externally linkable
    /// decoration.
    pub fn resolve(&self, id: u64) -> Result<SymbolPair> {
        let prefix = self.mangle_prefix(id)?;
        Ok(SymbolPair {
            begin: format!("{prefix}{}{BEGIN_MEMBER}E", BEGIN_MEMBER.len()),
            size: format!("{prefix}{}{SIZE_MEMBER}E", SIZE_MEMBER.len()),
        })
    }

    /// Encode `_ZN <components..> ILy<id>EE`, shared by both members.
    fn mangle_prefix(&self, id: u64) -> Result<String> {
        if self.template.is_empty() {
            return Err(Error::Mangle {
                id,
                detail: "empty template path".to_owned(),
            });
        }

        let mut out = String::from("_ZN");
        for component in &self.template {
            if !is_identifier(component) {
                return Err(Error::Mangle {
                    id,
                    detail: format!("\"{component}\" is not a valid identifier"),
                });
            }
            // Writing to a String cannot fail.
            let _ = write!(out, "{}{}", component.len(), component);
        }
        let _ = write!(out, "ILy{id}EE");
        Ok(out)
    }
}

/// Whether `s` can appear verbatim as a C-linkage symbol name.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
