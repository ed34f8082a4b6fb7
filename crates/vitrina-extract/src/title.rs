//! Title post-processing: stripping site-name suffixes.

use std::sync::LazyLock;

use regex::Regex;

/// Generic ` - ` / ` | ` site-suffix separator, applied when no configured
/// separator matches.
static GENERIC_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s[-|]\s").expect("static regex"));

/// Byte index of the first case-insensitive occurrence of `needle` in
/// `haystack`. Comparison is done char-by-char through `to_lowercase`, so
/// offsets always land on a char boundary of the original string.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let needle_lower: Vec<char> = needle.chars().flat_map(char::to_lowercase).collect();
    for (i, _) in haystack.char_indices() {
        let mut rest = haystack[i..].chars().flat_map(char::to_lowercase);
        if needle_lower.iter().all(|&nc| rest.next() == Some(nc)) {
            return Some(i);
        }
    }
    None
}

/// Truncates `raw` before the earliest (case-insensitive) occurrence of any
/// configured separator, preserving the original casing of what remains.
/// When no configured separator matches, the generic ` - ` / ` | ` split
/// used by page titles like `"Product - Shop Name"` applies instead.
pub(crate) fn trim_site_suffix(raw: &str, separators: &[String]) -> String {
    let earliest = separators
        .iter()
        .filter_map(|sep| find_ci(raw, sep))
        .min();

    if let Some(cut) = earliest {
        return raw[..cut].trim_end().to_string();
    }

    match GENERIC_SEPARATOR.find(raw) {
        Some(m) => raw[..m.start()].trim_end().to_string(),
        None => raw.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seps(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn configured_separator_is_matched_case_insensitively() {
        assert_eq!(
            trim_site_suffix("Láser de corte SECTOR industrial", &seps(&["sector"])),
            "Láser de corte"
        );
    }

    #[test]
    fn earliest_separator_wins() {
        assert_eq!(
            trim_site_suffix("Fresadora Acc Sector X", &seps(&["Sector", "Acc"])),
            "Fresadora"
        );
    }

    #[test]
    fn output_preserves_original_casing() {
        assert_eq!(
            trim_site_suffix("CÁMARA RÉFLEX sector pro", &seps(&["SECTOR"])),
            "CÁMARA RÉFLEX"
        );
    }

    #[test]
    fn generic_dash_split_applies_without_configured_separators() {
        assert_eq!(
            trim_site_suffix("Barniz incoloro mate - Hogar y Hobby", &[]),
            "Barniz incoloro mate"
        );
        assert_eq!(
            trim_site_suffix("Aceite CBD 10% | Tienda CBD", &[]),
            "Aceite CBD 10%"
        );
    }

    #[test]
    fn hyphenated_words_are_not_split() {
        assert_eq!(
            trim_site_suffix("Tele-objetivo 300mm", &[]),
            "Tele-objetivo 300mm"
        );
    }
}
