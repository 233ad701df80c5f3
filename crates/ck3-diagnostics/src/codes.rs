//! Stable diagnostic codes.
//!
//! Codes are grouped by family so clients can filter: parse (CK30xx),
//! language tables (CK31xx), scope model (CK32xx), schema defaults (CK34xx,
//! individual schemas override per field), event domain (CK35xx), scripted
//! blocks and script values (CK36xx), variables (CK37xx), style (CK38xx),
//! conventions (CK39xx).

/// Unmatched `}` with no open block.
pub const UNMATCHED_BRACE: &str = "CK3001";
/// `{` still open at end of file.
pub const UNCLOSED_BRACE: &str = "CK3002";
/// Any other unexpected token.
pub const UNEXPECTED_TOKEN: &str = "CK3003";

/// Unknown trigger in a trigger block.
pub const UNKNOWN_TRIGGER: &str = "CK3101";
/// Known effect used where only triggers are allowed.
pub const EFFECT_IN_TRIGGER: &str = "CK3102";
/// Unknown effect in an effect block.
pub const UNKNOWN_EFFECT: &str = "CK3103";

/// Link chain segment does not resolve.
pub const BAD_SCOPE_CHAIN: &str = "CK3201";
/// `scope:NAME` with no preceding save in the same body.
pub const UNSAVED_SCOPE: &str = "CK3202";
/// Illegal iterator (wrong prefix for the context, or base not a legal list).
pub const BAD_ITERATOR: &str = "CK3203";
/// Saved scope referenced before the effect that saves it runs.
pub const SCOPE_TIMING: &str = "CK3251";
/// Iterator block with an empty body.
pub const EMPTY_ITERATOR: &str = "CK3260";

/// Duplicate event id within one file.
pub const DUPLICATE_EVENT: &str = "CK3501";
/// Event id does not match any declared namespace.
pub const UNDECLARED_NAMESPACE: &str = "CK3502";
/// Event title/desc has no localization entry.
pub const MISSING_LOCALIZATION: &str = "CK3503";
/// `trigger_event`/on-action target event does not exist.
pub const MISSING_EVENT_TARGET: &str = "CK3504";

/// Effect used inside a scripted trigger body.
pub const EFFECT_IN_SCRIPTED_TRIGGER: &str = "CK3601";
/// Unbalanced `$PARAM$` placeholders in a scripted block.
pub const UNBALANCED_PARAMETER: &str = "CK3602";
/// Unknown formula step in a script value block.
pub const UNKNOWN_FORMULA_STEP: &str = "CK3620";

/// `var:` reference with no `set_variable` in the same file.
pub const UNSET_VARIABLE: &str = "CK3701";

/// Trailing whitespace.
pub const TRAILING_WHITESPACE: &str = "CK3801";
/// Leading spaces where the codebase convention is tabs.
pub const SPACES_INDENT: &str = "CK3802";

/// Event id number shorter than four digits.
pub const SHORT_EVENT_NUMBER: &str = "CK3901";
/// Identifier contains uppercase letters.
pub const NON_SNAKE_CASE: &str = "CK3902";
