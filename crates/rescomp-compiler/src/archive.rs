//! Static-archive packing.
//!
//! Wraps exactly one object member into a GNU-format `ar` archive with
//! a ranlib symbol index, the container shape native linkers consume.
//! The writer is deterministic: zero timestamps and owners, so packing
//! the same object twice yields identical archives. The bytes are
//! staged in a temporary file and only promoted to the destination
//! once complete; a failed pack never truncates an existing archive.
//!
//! Layout, in file order:
//!
//! ```text
//! !<arch>\n
//! /       (symbol index: count, member offsets, names)
//! //      (extended name table, only for member names over 15 bytes)
//! member  (the object file)
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ArchiveError;

const MAGIC: &[u8] = b"!<arch>\n";
const HEADER_LEN: usize = 60;
/// Longest member name that fits the header field with its `/` suffix.
const SHORT_NAME_MAX: usize = 15;

/// Pack the object at `member_path` into an archive at `archive_path`.
///
/// `symbols` is the list of names the member exports, in order; they
/// become the archive's symbol index. The destination is made absolute
/// before writing so the result cannot depend on working-directory
/// changes made while the member was produced.
pub fn pack(
    member_path: &Path,
    archive_path: &Path,
    symbols: &[String],
) -> Result<(), ArchiveError> {
    let member_data = std::fs::read(member_path).map_err(|source| ArchiveError::MemberOpen {
        path: member_path.to_path_buf(),
        source,
    })?;
    let member_name = member_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "member.o".to_owned());

    let archive_abs = absolute(archive_path).map_err(|source| ArchiveError::WriteArchive {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let data = build_archive(&member_name, &member_data, symbols);
    let out_dir = archive_abs.parent().unwrap_or(Path::new("/"));
    let staged = tempfile::Builder::new()
        .prefix("rescomp-")
        .suffix(".a")
        .tempfile_in(out_dir)
        .map_err(|source| ArchiveError::WriteArchive {
            path: archive_abs.clone(),
            source,
        })?;
    std::fs::write(staged.path(), data).map_err(|source| ArchiveError::WriteArchive {
        path: staged.path().to_path_buf(),
        source,
    })?;
    staged
        .persist(&archive_abs)
        .map_err(|e| ArchiveError::WriteArchive {
            path: archive_abs.clone(),
            source: e.error,
        })?;

    debug!(
        member = %member_name,
        archive = %archive_abs.display(),
        symbols = symbols.len(),
        "packed archive"
    );
    Ok(())
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn build_archive(member_name: &str, member_data: &[u8], symbols: &[String]) -> Vec<u8> {
    // The symbol index references the member header by its byte offset
    // from the start of the file, so sizes must be settled first.
    let index_len = 4 + 4 * symbols.len() + symbols.iter().map(|s| s.len() + 1).sum::<usize>();

    let long_name = member_name.len() > SHORT_NAME_MAX;
    let ext_data = if long_name {
        format!("{member_name}/\n").into_bytes()
    } else {
        Vec::new()
    };

    let mut member_offset = MAGIC.len() + HEADER_LEN + padded(index_len);
    if long_name {
        member_offset += HEADER_LEN + padded(ext_data.len());
    }

    let mut out = Vec::with_capacity(member_offset + HEADER_LEN + padded(member_data.len()));
    out.extend_from_slice(MAGIC);

    // Symbol index member "/".
    write_header(&mut out, "/", index_len);
    out.extend_from_slice(&(symbols.len() as u32).to_be_bytes());
    for _ in symbols {
        out.extend_from_slice(&(member_offset as u32).to_be_bytes());
    }
    for symbol in symbols {
        out.extend_from_slice(symbol.as_bytes());
        out.push(0);
    }
    pad(&mut out);

    // Extended name table member "//".
    if long_name {
        write_header(&mut out, "//", ext_data.len());
        out.extend_from_slice(&ext_data);
        pad(&mut out);
    }

    // The object member itself. Long names are stored as an offset
    // into the extended name table.
    debug_assert_eq!(out.len(), member_offset);
    let name_field = if long_name {
        "/0".to_owned()
    } else {
        format!("{member_name}/")
    };
    write_header(&mut out, &name_field, member_data.len());
    out.extend_from_slice(member_data);
    pad(&mut out);

    out
}

/// Emit one 60-byte member header: name, mtime, uid, gid, mode, size.
fn write_header(out: &mut Vec<u8>, name_field: &str, size: usize) {
    let header = format!(
        "{name_field:<16}{:<12}{:<6}{:<6}{:<8}{size:<10}`\n",
        0, 0, 0, 100644
    );
    debug_assert_eq!(header.len(), HEADER_LEN);
    out.extend_from_slice(header.as_bytes());
}

fn padded(len: usize) -> usize {
    len + len % 2
}

/// Member data is 2-byte aligned; the pad byte is a newline.
fn pad(out: &mut Vec<u8>) {
    if out.len() % 2 != 0 {
        out.push(b'\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object::read::archive::ArchiveFile;
    use std::fs;
    use tempfile::tempdir;

    fn pack_to_vec(member_name: &str, data: &[u8], symbols: &[&str]) -> Vec<u8> {
        let dir = tempdir().unwrap();
        let member = dir.path().join(member_name);
        fs::write(&member, data).unwrap();
        let archive = dir.path().join("out.a");
        let symbols: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
        pack(&member, &archive, &symbols).unwrap();
        fs::read(&archive).unwrap()
    }

    #[test]
    fn archive_has_magic_and_one_member() {
        let data = pack_to_vec("m.o", b"OBJECTDATA", &["sym_a", "sym_b"]);
        assert!(data.starts_with(MAGIC));

        let archive = ArchiveFile::parse(&*data).unwrap();
        let members: Vec<_> = archive.members().collect::<Result<_, _>>().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name(), b"m.o");
        assert_eq!(members[0].data(&*data).unwrap(), b"OBJECTDATA");
    }

    #[test]
    fn symbol_index_lists_every_symbol() {
        let data = pack_to_vec("m.o", b"X", &["begin_1", "size_1", "begin_2", "size_2"]);
        // The index member precedes the object member, so all names
        // must appear before the member data.
        let member_pos = data.windows(3).position(|w| w == b"m.o").unwrap();
        for name in ["begin_1\0", "size_1\0", "begin_2\0", "size_2\0"] {
            let pos = data
                .windows(name.len())
                .position(|w| w == name.as_bytes())
                .unwrap_or_else(|| panic!("{name:?} missing from index"));
            assert!(pos < member_pos);
        }
    }

    #[test]
    fn index_offsets_point_at_the_member_header() {
        let data = pack_to_vec("m.o", b"PAYLOAD", &["s"]);
        let count = u32::from_be_bytes(data[MAGIC.len() + HEADER_LEN..][..4].try_into().unwrap());
        assert_eq!(count, 1);
        let offset = u32::from_be_bytes(
            data[MAGIC.len() + HEADER_LEN + 4..][..4].try_into().unwrap(),
        ) as usize;
        // A member header starts with its name field and ends "`\n".
        assert_eq!(&data[offset..offset + 4], b"m.o/");
        assert_eq!(&data[offset + 40..offset + 48], b"100644  ");
        assert_eq!(&data[offset + 58..offset + 60], b"`\n");
        assert_eq!(&data[offset + 60..offset + 67], b"PAYLOAD");
    }

    #[test]
    fn failed_pack_commits_nothing() {
        let dir = tempdir().unwrap();
        let member = dir.path().join("m.o");
        fs::write(&member, b"X").unwrap();
        // A directory at the destination makes the final rename fail.
        let out = dir.path().join("out.a");
        fs::create_dir(&out).unwrap();

        let err = pack(&member, &out, &[]).unwrap_err();
        assert!(matches!(err, ArchiveError::WriteArchive { .. }));
        assert!(out.is_dir());

        let stray: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|n| n.starts_with("rescomp-"))
            .collect();
        assert!(stray.is_empty(), "staging leftovers: {stray:?}");
    }

    #[test]
    fn failed_rebuild_keeps_the_previous_archive() {
        let dir = tempdir().unwrap();
        let member = dir.path().join("m.o");
        fs::write(&member, b"GOOD").unwrap();
        let out = dir.path().join("out.a");
        pack(&member, &out, &["s".to_owned()]).unwrap();
        let before = fs::read(&out).unwrap();

        let err = pack(&dir.path().join("absent.o"), &out, &["s".to_owned()]).unwrap_err();
        assert!(matches!(err, ArchiveError::MemberOpen { .. }));
        assert_eq!(fs::read(&out).unwrap(), before);
    }

    #[test]
    fn long_member_names_use_the_extended_name_table() {
        let name = "a-rather-long-member-name.o";
        assert!(name.len() > SHORT_NAME_MAX);
        let data = pack_to_vec(name, b"DATA", &["s1"]);

        let archive = ArchiveFile::parse(&*data).unwrap();
        let members: Vec<_> = archive.members().collect::<Result<_, _>>().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name(), name.as_bytes());
    }

    #[test]
    fn packing_is_deterministic() {
        let a = pack_to_vec("m.o", b"SAME", &["s"]);
        let b = pack_to_vec("m.o", b"SAME", &["s"]);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_member_is_a_member_open_error() {
        let dir = tempdir().unwrap();
        let err = pack(
            &dir.path().join("absent.o"),
            &dir.path().join("out.a"),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, ArchiveError::MemberOpen { .. }));
    }

    #[test]
    fn unwritable_destination_is_a_write_error() {
        let dir = tempdir().unwrap();
        let member = dir.path().join("m.o");
        fs::write(&member, b"X").unwrap();
        let err = pack(&member, &dir.path().join("no-such-dir/out.a"), &[]).unwrap_err();
        assert!(matches!(err, ArchiveError::WriteArchive { .. }));
    }
}
