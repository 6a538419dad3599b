//! Filename normalization rules.
//!
//! Export tools (Notion and friends) decorate filenames with date prefixes
//! and 32-hex content GUIDs. These functions strip the decoration and fold an
//! optional parent-folder context into the name, producing a canonical flat
//! filename. Both functions are idempotent: feeding a canonical name back in
//! returns it unchanged.

use regex::Regex;
use std::sync::LazyLock;

/// Date stamp fragment `DD <sep> DD <sep> YYYY <sep>* - <sep>*` where `<sep>`
/// is a run of spaces or underscores. Removed wherever it appears.
static DATE_STAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}[ _]+\d{2}[ _]+\d{4}[ _]*-[ _]*").unwrap());

/// Trailing 32-char lowercase-hex GUID preceded by whitespace.
static GUID_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[a-f0-9]{32}$").unwrap());

/// Cleans a directory name with the folder-rule subset: date stamps and GUID
/// suffixes removed, trimmed, spaces replaced with underscores, underscore
/// runs collapsed and edge underscores stripped. The result is canonical:
/// safe to compare against already-normalized filenames.
pub fn clean_folder_name(raw: &str) -> String {
    let cleaned = DATE_STAMP.replace_all(raw, "");
    let cleaned = GUID_SUFFIX.replace(&cleaned, "");
    let mut cleaned = cleaned.trim().replace(' ', "_");
    while cleaned.contains("__") {
        cleaned = cleaned.replace("__", "_");
    }
    cleaned.trim_matches('_').to_string()
}

/// Computes the canonical filename for `raw_name`, optionally folding in a
/// parent-folder context to disambiguate same-named documents from different
/// source folders.
pub fn canonical_file_name(raw_name: &str, parent_context: Option<&str>) -> String {
    let (base, had_md_suffix) = match raw_name.strip_suffix(".md") {
        Some(stem) => (stem, true),
        None => (raw_name, false),
    };

    let prefix = parent_context
        .map(clean_folder_name)
        .filter(|prefix| !prefix.is_empty());

    let mut joined = match prefix {
        Some(prefix) => {
            let underscored = base.replace(' ', "_");
            if underscored == prefix {
                underscored
            } else if underscored.starts_with(&format!("{}_", prefix)) {
                // The name already carries the folded prefix: clean only the
                // part after it. Rerunning the date rule across the fold
                // boundary could otherwise consume digits the fold itself
                // introduced (a numeric prefix joined to a numeric base can
                // form the date-stamp shape). Spaces and underscores are
                // byte-for-byte interchangeable here, so slicing at the
                // prefix length lands on the separator.
                format!("{}_{}", prefix, clean_base(&base[prefix.len() + 1..]))
            } else {
                let cleaned = clean_base(base);
                let cleaned_underscored = cleaned.replace(' ', "_");
                // Skip the prepend when cleaning exposed the prefix; this is
                // what keeps re-normalization a no-op.
                if cleaned_underscored == prefix
                    || cleaned_underscored.starts_with(&format!("{}_", prefix))
                {
                    cleaned
                } else {
                    format!("{}_{}", prefix, cleaned)
                }
            }
        }
        None => clean_base(base),
    };

    joined = joined.replace(' ', "_");
    while joined.contains("__") {
        joined = joined.replace("__", "_");
    }
    let joined = joined.trim_matches('_');

    if had_md_suffix {
        format!("{}.md", joined)
    } else {
        joined.to_string()
    }
}

/// Filename-rule subset applied to the part of the name the context fold
/// does not own: date stamps out, GUID suffix out, trimmed.
fn clean_base(base: &str) -> String {
    let base = DATE_STAMP.replace_all(base, "");
    let base = GUID_SUFFIX.replace(&base, "");
    base.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_prefix_stripped() {
        assert_eq!(canonical_file_name("12 05 2023 - Notes.md", None), "Notes.md");
        assert_eq!(canonical_file_name("12_05_2023_-_Notes.md", None), "Notes.md");
    }

    #[test]
    fn test_guid_suffix_stripped() {
        assert_eq!(
            canonical_file_name("Page abcdef0123456789abcdef0123456789.md", None),
            "Page.md"
        );
    }

    #[test]
    fn test_guid_without_leading_whitespace_kept() {
        // The GUID rule only fires when the hex run is preceded by whitespace.
        assert_eq!(
            canonical_file_name("Pageabcdef0123456789abcdef0123456789.md", None),
            "Pageabcdef0123456789abcdef0123456789.md"
        );
    }

    #[test]
    fn test_short_hex_run_kept() {
        assert_eq!(canonical_file_name("Page abc123.md", None), "Page_abc123.md");
    }

    #[test]
    fn test_spaces_become_underscores() {
        assert_eq!(canonical_file_name("My Page Name.md", None), "My_Page_Name.md");
    }

    #[test]
    fn test_double_underscores_collapsed() {
        assert_eq!(canonical_file_name("A  B___C.md", None), "A_B_C.md");
    }

    #[test]
    fn test_parent_context_folded_in() {
        assert_eq!(
            canonical_file_name(
                "Intro.md",
                Some("Event Bridge 12345678901234567890123456789012")
            ),
            "Event_Bridge_Intro.md"
        );
    }

    #[test]
    fn test_clean_folder_name() {
        assert_eq!(
            clean_folder_name("Event Bridge 12345678901234567890123456789012"),
            "Event_Bridge"
        );
        assert_eq!(clean_folder_name("12 05 2023 - Archive"), "Archive");
        assert_eq!(clean_folder_name("  plain  "), "plain");
    }

    #[test]
    fn test_clean_folder_name_collapses_runs() {
        assert_eq!(clean_folder_name("Event  Bridge"), "Event_Bridge");
        assert_eq!(clean_folder_name("A _ B"), "A_B");
        assert_eq!(clean_folder_name("_edges_"), "edges");
    }

    #[test]
    fn test_non_md_name_keeps_no_suffix() {
        assert_eq!(canonical_file_name("Some Folder", None), "Some_Folder");
    }

    #[test]
    fn test_idempotence_without_context() {
        let inputs = [
            "12 05 2023 - Notes.md",
            "Page abcdef0123456789abcdef0123456789.md",
            "My Page Name.md",
            "A  B___C.md",
            "_leading and trailing_.md",
            "plain.md",
            "no extension",
        ];
        for raw in inputs {
            let once = canonical_file_name(raw, None);
            let twice = canonical_file_name(&once, None);
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_idempotence_with_context() {
        let contexts = [
            "Event Bridge 12345678901234567890123456789012",
            "12 05 2023 - Archive",
            "plain",
        ];
        let inputs = ["Intro.md", "Event Bridge Intro.md", "12 05 2023 - Notes.md"];
        for ctx in contexts {
            for raw in inputs {
                let once = canonical_file_name(raw, Some(ctx));
                let twice = canonical_file_name(&once, Some(ctx));
                assert_eq!(once, twice, "not idempotent for {:?} with {:?}", raw, ctx);
            }
        }
    }

    #[test]
    fn test_idempotence_with_run_of_spaces_in_context() {
        // A context with consecutive spaces must clean to a canonical prefix,
        // or the already-prefixed check never matches the collapsed output.
        let once = canonical_file_name("Intro.md", Some("Event  Bridge"));
        assert_eq!(once, "Event_Bridge_Intro.md");
        assert_eq!(canonical_file_name(&once, Some("Event  Bridge")), once);
    }

    #[test]
    fn test_idempotence_with_numeric_context() {
        // A numeric prefix joined to a numeric base forms the date-stamp
        // shape; re-normalization must not strip it.
        let once = canonical_file_name("34 5678 - X.md", Some("12"));
        assert_eq!(once, "12_34_5678_-_X.md");
        assert_eq!(canonical_file_name(&once, Some("12")), once);

        let once = canonical_file_name("34 5678 - X.md", Some("Area 12"));
        assert_eq!(once, "Area_12_34_5678_-_X.md");
        assert_eq!(canonical_file_name(&once, Some("Area 12")), once);
    }

    #[test]
    fn test_prefixed_name_still_cleans_its_tail() {
        // Date decoration after an already-folded prefix is still stripped.
        assert_eq!(
            canonical_file_name("Event Bridge 12 05 2023 - Notes.md", Some("Event Bridge")),
            "Event_Bridge_Notes.md"
        );
    }

    #[test]
    fn test_base_equal_to_context_not_doubled() {
        assert_eq!(
            canonical_file_name("Event_Bridge.md", Some("Event Bridge")),
            "Event_Bridge.md"
        );
    }

    #[test]
    fn test_no_separators_or_edge_underscores() {
        let inputs = [
            ("_ odd _ name _.md", None),
            ("12 05 2023 - .md", Some("A")),
            ("Intro.md", Some("Event Bridge 12345678901234567890123456789012")),
        ];
        for (raw, ctx) in inputs {
            let name = canonical_file_name(raw, ctx);
            let stem = name.strip_suffix(".md").unwrap_or(&name);
            assert!(!name.contains('/'), "separator in {:?}", name);
            assert!(!name.contains('\\'), "separator in {:?}", name);
            assert!(!stem.contains("__"), "double underscore in {:?}", name);
            assert!(!stem.starts_with('_'), "leading underscore in {:?}", name);
            assert!(!stem.ends_with('_'), "trailing underscore in {:?}", name);
        }
    }
}
