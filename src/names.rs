//! Normalization of raw taxonomic names into repository search keys.

use crate::domain::ResolvedName;

const GENUS_MARKERS: [&str; 2] = [" sp.", " ssp."];
const HYBRID_SIGN: char = '×';
const VARIETY_MARKER: &str = " var.";

/// Resolves a raw scientific name into a canonical search key.
///
/// Rules apply in order and the first match wins:
/// unresolved species within a genus (`sp.`/`ssp.`) resolve to the genus and
/// are flagged genus-level; hybrids resolve to their first parent; varieties
/// resolve to the species before `var.`; anything else is trimmed as-is.
pub fn resolve(raw_name: &str) -> ResolvedName {
    let name = raw_name.trim();

    if GENUS_MARKERS.iter().any(|marker| name.contains(marker)) {
        let genus = name.split_whitespace().next().unwrap_or(name);
        return ResolvedName::genus(genus);
    }

    if name.contains(HYBRID_SIGN) {
        let parent = name
            .split([HYBRID_SIGN, '='])
            .next()
            .map(str::trim)
            .unwrap_or_default();
        if !parent.is_empty() {
            return ResolvedName::species(parent);
        }
    }

    if let Some((species, _)) = name.split_once(VARIETY_MARKER) {
        return ResolvedName::species(species.trim());
    }

    ResolvedName::species(name)
}

/// First whitespace-delimited token of a name, used as the genus.
pub fn genus_of(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hybrid_with_equals_sign() {
        let resolved = resolve("Mentha × piperita = M. aquatica");
        assert_eq!(resolved.canonical_name, "Mentha");
        assert!(!resolved.is_genus_level);
    }

    #[test]
    fn leading_hybrid_sign_falls_through() {
        let resolved = resolve("× Triticosecale");
        assert_eq!(resolved.canonical_name, "× Triticosecale");
        assert!(!resolved.is_genus_level);
    }

    #[test]
    fn subspecies_marker_is_genus_level() {
        let resolved = resolve("  Vaccinium ssp. ");
        assert_eq!(resolved.canonical_name, "Vaccinium");
        assert!(resolved.is_genus_level);
    }

    #[test]
    fn genus_marker_wins_over_variety() {
        let resolved = resolve("Rubus sp. var. alba");
        assert_eq!(resolved, ResolvedName::genus("Rubus"));
    }

    #[test]
    fn genus_of_single_token() {
        assert_eq!(genus_of("Zea"), "Zea");
        assert_eq!(genus_of("Zea mays"), "Zea");
    }
}
