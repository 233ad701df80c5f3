//! Dot-chain validation.
//!
//! A leaf key like `liege.primary_title.holder` navigates the scope graph one
//! link at a time. Validation is left-to-right: each segment must resolve via
//! the link table from the scope produced by the previous segment. The first
//! unresolvable segment downgrades the remainder of the chain to `Unknown`.

use crate::links::{resolve_link, suggest_link};
use crate::ScopeType;

/// Per-segment resolution of a validated chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSegment {
    /// Segment text as written.
    pub text: String,
    /// UTF-16 offset of this segment within the chain string.
    pub offset: u32,
    /// Scope the segment resolved to.
    pub resolved: ScopeType,
}

/// First failure while walking a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainError {
    /// Index of the failing segment.
    pub segment_index: usize,
    /// The failing segment text.
    pub segment: String,
    /// UTF-16 offset of the failing segment within the chain string.
    pub offset: u32,
    /// Scope the segment was entered from.
    pub from: ScopeType,
    /// A known link within edit distance 2, if one exists.
    pub suggestion: Option<&'static str>,
}

/// Result of validating a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainOutcome {
    /// Every segment with its resolved scope.
    pub segments: Vec<ChainSegment>,
    /// Scope the full chain evaluates to (`Unknown` past the first failure).
    pub result: ScopeType,
    /// The first failure, if any.
    pub error: Option<ChainError>,
}

/// Validate a dot-separated chain starting from `start`.
///
/// `ancestors` is the enclosing scope stack, innermost last; it feeds the
/// `prev` and `root` keywords. `this` re-reads the current scope. A leading
/// `scope:name` segment resolves to `Unknown` here - whether the name was
/// saved is a separate, index-backed check.
pub fn validate_chain(chain: &str, start: ScopeType, ancestors: &[ScopeType]) -> ChainOutcome {
    let mut segments = Vec::new();
    let mut current = start;
    let mut error = None;
    // Depth into the ancestor stack consumed by `prev` segments so far.
    let mut prev_depth = 0usize;
    let mut offset = 0u32;

    for (index, raw) in chain.split('.').enumerate() {
        let resolved = if error.is_some() {
            ScopeType::Unknown
        } else if raw == "this" {
            current
        } else if raw == "root" {
            ancestors.first().copied().unwrap_or(start)
        } else if raw == "prev" {
            prev_depth += 1;
            ancestors
                .len()
                .checked_sub(prev_depth)
                .and_then(|i| ancestors.get(i).copied())
                .unwrap_or(ScopeType::Unknown)
        } else if raw.starts_with("scope:") {
            ScopeType::Unknown
        } else if raw.starts_with("var:") || raw.starts_with("local_var:") {
            ScopeType::Unknown
        } else {
            match resolve_link(current, raw) {
                Some(next) => next,
                None => {
                    error = Some(ChainError {
                        segment_index: index,
                        segment: raw.to_string(),
                        offset,
                        from: current,
                        suggestion: suggest_link(current, raw),
                    });
                    ScopeType::Unknown
                }
            }
        };

        segments.push(ChainSegment { text: raw.to_string(), offset, resolved });
        current = resolved;
        offset += raw.encode_utf16().count() as u32 + 1;
    }

    ChainOutcome { segments, result: current, error }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_legal_character_chain() {
        let outcome = validate_chain("liege.primary_title.holder", ScopeType::Character, &[]);
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.result, ScopeType::Character);
        assert_eq!(
            outcome.segments.iter().map(|s| s.resolved).collect::<Vec<_>>(),
            vec![ScopeType::Character, ScopeType::LandedTitle, ScopeType::Character]
        );
    }

    #[test]
    fn first_bad_segment_downgrades_remainder() {
        let outcome = validate_chain("liege.primry_title.holder", ScopeType::Character, &[]);
        let error = outcome.error.as_ref().unwrap();
        assert_eq!(error.segment_index, 1);
        assert_eq!(error.segment, "primry_title");
        assert_eq!(error.from, ScopeType::Character);
        assert_eq!(error.suggestion, Some("primary_title"));
        assert_eq!(outcome.result, ScopeType::Unknown);
    }

    #[test]
    fn prev_pops_the_ancestor_stack() {
        let ancestors = [ScopeType::Character, ScopeType::LandedTitle];
        let outcome = validate_chain("prev", ScopeType::Province, &ancestors);
        assert_eq!(outcome.result, ScopeType::LandedTitle);

        let outcome = validate_chain("prev.prev", ScopeType::Province, &ancestors);
        assert_eq!(outcome.result, ScopeType::Character);
    }

    #[test]
    fn root_reads_the_bottom_of_the_stack() {
        let ancestors = [ScopeType::Character, ScopeType::LandedTitle, ScopeType::Province];
        let outcome = validate_chain("root.primary_title", ScopeType::Province, &ancestors);
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.result, ScopeType::LandedTitle);
    }

    #[test]
    fn saved_scope_reference_is_untyped() {
        let outcome = validate_chain("scope:my_target.primary_title", ScopeType::Character, &[]);
        // scope:* resolves to Unknown, so the rest of the chain is permissive.
        assert_eq!(outcome.error, None);
        assert_eq!(outcome.result, ScopeType::Unknown);
    }

    #[test]
    fn segment_offsets_are_utf16() {
        let outcome = validate_chain("liege.holder", ScopeType::Character, &[]);
        assert_eq!(outcome.segments[0].offset, 0);
        assert_eq!(outcome.segments[1].offset, 6);
    }
}
