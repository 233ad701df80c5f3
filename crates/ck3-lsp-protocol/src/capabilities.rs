//! Server capability advertisement.

use crate::methods::commands;
use serde_json::{Value, json};

/// Semantic token types, in legend order. Indices are wire-stable: the
/// encoder in the semantic-tokens provider emits positions into this table.
pub const SEMANTIC_TOKEN_TYPES: [&str; 12] = [
    "keyword",
    "function",
    "variable",
    "property",
    "string",
    "number",
    "comment",
    "event",
    "macro",
    "enumMember",
    "class",
    "namespace",
];

/// Semantic token modifiers, in legend order (bit positions).
pub const SEMANTIC_TOKEN_MODIFIERS: [&str; 3] = ["declaration", "readonly", "defaultLibrary"];

/// Index of a token type in the legend.
pub fn semantic_token_index(name: &str) -> Option<u32> {
    SEMANTIC_TOKEN_TYPES.iter().position(|t| *t == name).map(|i| i as u32)
}

/// Build the `ServerCapabilities` JSON advertised from `initialize`.
pub fn server_capabilities() -> Value {
    json!({
        "positionEncoding": "utf-16",
        "textDocumentSync": {
            "openClose": true,
            // Incremental sync; the document store applies range edits.
            "change": 2,
            "save": { "includeText": false }
        },
        "completionProvider": {
            "triggerCharacters": ["_", ".", ":", "="],
            "resolveProvider": false
        },
        "hoverProvider": true,
        "definitionProvider": true,
        "referencesProvider": true,
        "documentHighlightProvider": true,
        "documentSymbolProvider": true,
        "workspaceSymbolProvider": true,
        "codeActionProvider": {
            "codeActionKinds": ["quickfix"]
        },
        "codeLensProvider": { "resolveProvider": true },
        "documentFormattingProvider": true,
        "documentRangeFormattingProvider": true,
        "renameProvider": { "prepareProvider": true },
        "foldingRangeProvider": true,
        "inlayHintProvider": true,
        "semanticTokensProvider": {
            "legend": {
                "tokenTypes": SEMANTIC_TOKEN_TYPES,
                "tokenModifiers": SEMANTIC_TOKEN_MODIFIERS
            },
            "full": true,
            "range": false
        },
        "executeCommandProvider": {
            "commands": commands::ALL
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend_indices_are_stable() {
        assert_eq!(semantic_token_index("keyword"), Some(0));
        assert_eq!(semantic_token_index("event"), Some(7));
        assert_eq!(semantic_token_index("namespace"), Some(11));
        assert_eq!(semantic_token_index("bogus"), None);
    }

    #[test]
    fn capabilities_advertise_trigger_characters() {
        let caps = server_capabilities();
        let triggers = caps["completionProvider"]["triggerCharacters"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>())
            .unwrap_or_default();
        assert_eq!(triggers, vec!["_", ".", ":", "="]);
    }

    #[test]
    fn all_custom_commands_are_advertised() {
        let caps = server_capabilities();
        let advertised = caps["executeCommandProvider"]["commands"]
            .as_array()
            .map(|a| a.len())
            .unwrap_or(0);
        assert_eq!(advertised, commands::ALL.len());
    }
}
