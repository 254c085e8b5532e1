use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const FRONTMATTER_DELIMITER: &str = "---";
pub const IDENTITY_FIELD: &str = "meeting-id:";
pub const DOCUMENT_EXTENSION: &str = "md";

/// Meeting id → filename (basename) of the document currently carrying it.
pub type IdentityIndex = BTreeMap<String, String>;

/// Read the `meeting-id` tag out of a document's frontmatter.
///
/// Only the frontmatter block is scanned. Anything that prevents reading
/// it (missing file, bad permissions, invalid UTF-8) yields `None`.
pub fn read_identity(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut lines = BufReader::new(file).lines();

    let first = lines.next()?.ok()?;
    if first != FRONTMATTER_DELIMITER {
        return None;
    }

    for line in lines {
        let line = line.ok()?;
        if line == FRONTMATTER_DELIMITER {
            return None;
        }
        if let Some(rest) = line.strip_prefix(IDENTITY_FIELD) {
            let id = rest.trim();
            return (!id.is_empty()).then(|| id.to_string());
        }
    }
    None
}

/// Rebuild the id → filename index from the documents in `dir`.
///
/// The scan is non-recursive and only looks at `.md` files. A directory
/// that does not exist yet produces an empty index. Entries are visited in
/// name order, so when two files claim the same id the later name wins.
pub fn build_index(dir: &Path) -> IdentityIndex {
    let mut index = IdentityIndex::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return index;
    };

    let mut names = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| {
            Path::new(name)
                .extension()
                .and_then(|ext| ext.to_str())
                == Some(DOCUMENT_EXTENSION)
        })
        .collect::<Vec<_>>();
    names.sort();

    for name in names {
        if let Some(id) = read_identity(&dir.join(&name)) {
            index.insert(id, name);
        }
    }
    index
}
