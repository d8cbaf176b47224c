use thiserror::Error;

/// Errors produced while resolving a workflow graph or synthesizing
/// pipeline objects. All of these abort the current synthesis; there is
/// no partial-output mode.
#[derive(Debug, Error)]
pub enum Error {
    /// The classifier could not categorize a `uses` reference.
    #[error("unsupported reference '{uses}' for action '{action}'")]
    UnsupportedReference { action: String, uses: String },

    /// A `./` reference was used without an upstream repository.
    #[error("action '{action}' uses a local path but no upstream repository was supplied")]
    MissingRepository { action: String },

    /// A `needs` or `resolves` identifier has no matching action.
    #[error("unknown action '{name}'")]
    UnknownAction { name: String },

    /// The `needs` graph contains a cycle.
    #[error("cyclic dependency: {cycle}")]
    CyclicDependency { cycle: String },

    /// A synthesized object failed structural validation.
    #[error("{kind} '{name}' failed validation: {reason}")]
    Validation {
        kind: &'static str,
        name: String,
        reason: String,
    },
}
