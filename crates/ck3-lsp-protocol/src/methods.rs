//! LSP method names and the server's custom command identifiers.

/// Lifecycle.
pub const INITIALIZE: &str = "initialize";
pub const INITIALIZED: &str = "initialized";
pub const SHUTDOWN: &str = "shutdown";
pub const EXIT: &str = "exit";
pub const SET_TRACE: &str = "$/setTrace";
pub const CANCEL_REQUEST: &str = "$/cancelRequest";

/// Text synchronization.
pub const DID_OPEN: &str = "textDocument/didOpen";
pub const DID_CHANGE: &str = "textDocument/didChange";
pub const DID_CLOSE: &str = "textDocument/didClose";
pub const DID_SAVE: &str = "textDocument/didSave";

/// Language features.
pub const COMPLETION: &str = "textDocument/completion";
pub const HOVER: &str = "textDocument/hover";
pub const DEFINITION: &str = "textDocument/definition";
pub const REFERENCES: &str = "textDocument/references";
pub const DOCUMENT_HIGHLIGHT: &str = "textDocument/documentHighlight";
pub const DOCUMENT_SYMBOL: &str = "textDocument/documentSymbol";
pub const CODE_ACTION: &str = "textDocument/codeAction";
pub const CODE_LENS: &str = "textDocument/codeLens";
pub const CODE_LENS_RESOLVE: &str = "codeLens/resolve";
pub const FORMATTING: &str = "textDocument/formatting";
pub const RANGE_FORMATTING: &str = "textDocument/rangeFormatting";
pub const RENAME: &str = "textDocument/rename";
pub const PREPARE_RENAME: &str = "textDocument/prepareRename";
pub const FOLDING_RANGE: &str = "textDocument/foldingRange";
pub const SEMANTIC_TOKENS_FULL: &str = "textDocument/semanticTokens/full";
pub const INLAY_HINT: &str = "textDocument/inlayHint";

/// Workspace features.
pub const WORKSPACE_SYMBOL: &str = "workspace/symbol";
pub const EXECUTE_COMMAND: &str = "workspace/executeCommand";
pub const DID_CHANGE_CONFIGURATION: &str = "workspace/didChangeConfiguration";
pub const DID_CHANGE_WATCHED_FILES: &str = "workspace/didChangeWatchedFiles";

/// Server → client notifications.
pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
pub const LOG_MESSAGE: &str = "window/logMessage";
pub const SHOW_MESSAGE: &str = "window/showMessage";

/// Custom commands exposed through `workspace/executeCommand`.
pub mod commands {
    pub const VALIDATE_WORKSPACE: &str = "validate_workspace";
    pub const RESCAN_WORKSPACE: &str = "rescan_workspace";
    pub const GET_WORKSPACE_STATS: &str = "get_workspace_stats";
    pub const GENERATE_EVENT_TEMPLATE: &str = "generate_event_template";
    pub const GENERATE_LOCALIZATION_STUBS: &str = "generate_localization_stubs";
    pub const RENAME_EVENT: &str = "rename_event";
    pub const FIND_ORPHANED_LOCALIZATION: &str = "find_orphaned_localization";
    pub const SHOW_NAMESPACE_EVENTS: &str = "show_namespace_events";
    pub const CHECK_DEPENDENCIES: &str = "check_dependencies";

    /// Every command, in the order advertised in the server capabilities.
    pub const ALL: [&str; 9] = [
        VALIDATE_WORKSPACE,
        RESCAN_WORKSPACE,
        GET_WORKSPACE_STATS,
        GENERATE_EVENT_TEMPLATE,
        GENERATE_LOCALIZATION_STUBS,
        RENAME_EVENT,
        FIND_ORPHANED_LOCALIZATION,
        SHOW_NAMESPACE_EVENTS,
        CHECK_DEPENDENCIES,
    ];
}
