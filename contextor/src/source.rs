//! Displayable source references for stored chunk paths.

/// Suffix of stored documents, dropped from references.
const STORED_SUFFIX: &str = ".txt";

/// Decodes a stored `file_path`: underscores become path separators and the
/// stored-document suffix is removed.
///
/// ```
/// assert_eq!(contextor::decode_source("a_b_c.txt"), "a/b/c");
/// ```
pub fn decode_source(file_path: &str) -> String {
    let decoded = file_path.replace('_', "/");
    match decoded.strip_suffix(STORED_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => decoded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_separators_and_suffix() {
        assert_eq!(decode_source("a_b_c.txt"), "a/b/c");
        assert_eq!(decode_source("docs_getting-started.txt"), "docs/getting-started");
    }

    #[test]
    fn leaves_other_suffixes_alone() {
        assert_eq!(decode_source("notes_v1.md"), "notes/v1.md");
        assert_eq!(decode_source("plain"), "plain");
        assert_eq!(decode_source("x.txt.bak"), "x.txt.bak");
    }
}
