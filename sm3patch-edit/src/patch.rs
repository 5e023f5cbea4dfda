//! Pure patch functions: `(content) -> Result<Patched, PatchError>`.

use crate::error::PatchError;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    AlreadyApplied,
}

/// New file content plus how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patched {
    pub outcome: PatchOutcome,
    pub content: String,
}

impl Patched {
    fn unchanged(content: &str) -> Self {
        Self {
            outcome: PatchOutcome::AlreadyApplied,
            content: content.to_string(),
        }
    }
}

/// Splice `replacement` in place of every occurrence of `anchor`.
///
/// `replacement` is expected to re-emit the anchor next to the new code, and to
/// contain `marker`, so a second run detects the patch and leaves the file alone.
pub fn replace_anchor(
    content: &str,
    marker: &str,
    anchor: &str,
    replacement: &str,
) -> Result<Patched, PatchError> {
    if content.is_empty() {
        return Err(empty_file());
    }
    if content.contains(marker) {
        return Ok(Patched::unchanged(content));
    }
    if !content.contains(anchor) {
        return Err(PatchError::AnchorNotFound {
            anchor: anchor.to_string(),
        });
    }

    Ok(Patched {
        outcome: PatchOutcome::Applied,
        content: content.replace(anchor, replacement),
    })
}

/// Delete every match of `pattern`.
///
/// The removal is done once `marker` no longer occurs in the file. If the
/// marker is still there but the pattern cannot match it, the declaration has a
/// shape the pattern does not understand and the file is left untouched.
pub fn remove_pattern(content: &str, marker: &str, pattern: &Regex) -> Result<Patched, PatchError> {
    if content.is_empty() {
        return Err(empty_file());
    }
    if !content.contains(marker) {
        return Ok(Patched::unchanged(content));
    }
    if !pattern.is_match(content) {
        return Err(PatchError::AnchorNotFound {
            anchor: pattern.as_str().to_string(),
        });
    }

    Ok(Patched {
        outcome: PatchOutcome::Applied,
        content: pattern.replace_all(content, "").into_owned(),
    })
}

fn empty_file() -> PatchError {
    PatchError::PreconditionFailed {
        message: "file is empty".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DISPATCH: &str = "switch (x)\n{\ncase 1:\n    break;\ndefault:\n    throw new E();\n}\n";
    const ANCHOR: &str = "default:\n    throw new E();";
    const REPLACEMENT: &str = "case 2:\n    Two();\n    break;\ndefault:\n    throw new E();";
    const MARKER: &str = "case 2:";

    fn enum_pattern() -> Regex {
        Regex::new(r"enum\s+Kind\s*\{\s*([A-Za-z0-9]+\s*=\s*\d+,\s*)*([A-Za-z0-9]+\s*=\s*\d+)\s*\}")
            .unwrap()
    }

    #[test]
    fn anchor_is_replaced_and_re_emitted() {
        let patched = replace_anchor(DISPATCH, MARKER, ANCHOR, REPLACEMENT).unwrap();
        assert_eq!(patched.outcome, PatchOutcome::Applied);
        assert_eq!(
            patched.content,
            "switch (x)\n{\ncase 1:\n    break;\ncase 2:\n    Two();\n    break;\ndefault:\n    throw new E();\n}\n"
        );
    }

    #[test]
    fn marker_short_circuits_to_already_applied() {
        let once = replace_anchor(DISPATCH, MARKER, ANCHOR, REPLACEMENT).unwrap();
        let twice = replace_anchor(&once.content, MARKER, ANCHOR, REPLACEMENT).unwrap();
        assert_eq!(twice.outcome, PatchOutcome::AlreadyApplied);
        assert_eq!(twice.content, once.content);
    }

    #[test]
    fn missing_anchor_is_typed() {
        let err = replace_anchor("class A {}\n", MARKER, ANCHOR, REPLACEMENT).unwrap_err();
        assert!(matches!(err, PatchError::AnchorNotFound { .. }));
    }

    #[test]
    fn empty_content_fails_precondition() {
        let err = replace_anchor("", MARKER, ANCHOR, REPLACEMENT).unwrap_err();
        assert!(matches!(err, PatchError::PreconditionFailed { .. }));
        let err = remove_pattern("", "enum Kind", &enum_pattern()).unwrap_err();
        assert!(matches!(err, PatchError::PreconditionFailed { .. }));
    }

    #[test]
    fn enum_declaration_is_removed_without_touching_neighbours() {
        let src = "class A {}\n\nenum Kind\n{\n    One = 1,\n    Two = 2\n}\n\nclass B {}\n";
        let patched = remove_pattern(src, "enum Kind", &enum_pattern()).unwrap();
        assert_eq!(patched.outcome, PatchOutcome::Applied);
        assert_eq!(patched.content, "class A {}\n\n\n\nclass B {}\n");
    }

    #[test]
    fn removed_enum_is_already_applied() {
        let src = "class A {}\n";
        let patched = remove_pattern(src, "enum Kind", &enum_pattern()).unwrap();
        assert_eq!(patched.outcome, PatchOutcome::AlreadyApplied);
        assert_eq!(patched.content, src);
    }

    #[test]
    fn unexpected_enum_shape_is_anchor_not_found() {
        // Members without explicit values do not match the structural pattern.
        let src = "enum Kind\n{\n    One,\n    Two\n}\n";
        let err = remove_pattern(src, "enum Kind", &enum_pattern()).unwrap_err();
        assert!(matches!(err, PatchError::AnchorNotFound { .. }));
    }
}
