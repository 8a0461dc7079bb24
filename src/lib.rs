//! HTML Patcher: structural editing of HTML documents
//!
//! Every edit runs through three stages:
//!
//! 1. **Mutate**: insert, delete or replace markup at the first element a
//!    CSS-style selector resolves to ([`edit`]).
//! 2. **Validate and repair**: fixed structural checks (duplicate landmark
//!    ids, missing footer, empty sections) with automatic fixes
//!    ([`repair`]).
//! 3. **Record**: a human-readable changelog entry with a timestamp and a
//!    rollback id ([`changelog`]).
//!
//! [`Pipeline`] chains the three for one request; [`config::run_script`]
//! chains requests from a TOML edit script.
//!
//! # Failure policy
//!
//! Mutation is fail-soft: a selector that matches nothing, or any error on
//! the way, leaves the document exactly as it was. [`edit::try_apply`]
//! exposes the typed reason for callers that want it.
//!
//! # Example
//!
//! ```no_run
//! use html_patcher::{Operation, Pipeline, Position};
//!
//! let page = r#"<body><section id="hero">Hi</section><footer>Bye</footer></body>"#;
//! let op = Operation::insert("footer", "<section>Quotes</section>", Position::Before);
//! let edited = html_patcher::apply(page, &op);
//!
//! let report = Pipeline::default().repairer().validate_and_repair(&edited, &[]);
//! assert!(report.success);
//! ```

pub mod changelog;
pub mod config;
pub mod dom;
pub mod edit;
pub mod logging;
pub mod pipeline;
pub mod pool;
pub mod repair;
pub mod selector;
pub mod ts;

// Re-exports
pub use changelog::{
    generate_changelog_entry, ChangelogEntry, ChangelogError, ChangelogRecorder, Clock,
    ExecutionLog, IdGenerator, RandomIds, SystemClock,
};
pub use config::{
    load_script_from_path, load_settings_from_path, run_script, ConfigError, EditScript,
    EditorSettings,
};
pub use dom::{Document, NodeId};
pub use edit::{
    apply, execute_dom_operation, try_apply, MutationError, MutationOutcome, Operation,
    OperationKind, Position,
};
pub use pipeline::{EditRequest, EditStatus, Pipeline, PipelineOutcome};
pub use repair::{validate_and_repair, Issue, RepairReport, Repairer};
pub use selector::{Selector, SelectorError};
pub use ts::TreeSitterError;
