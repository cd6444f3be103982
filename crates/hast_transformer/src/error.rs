//! Error types for the transformation pipeline.

use hast_common::InternalError;
use hast_config::ConfigError;

/// Errors that abort a hardware generation run.
///
/// A failed run never produces a partial manifest.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// No member of the syntax tree is exposed to the host.
    #[error("no hardware entry point members found; mark at least one member as interface")]
    NoInterfaceMembers,

    /// Two interface members (or aliases) resolve to the same name.
    #[error("member name '{0}' is claimed by more than one hardware entry point")]
    DuplicateMemberId(String),

    /// A call or configuration refers to a member missing from the tree.
    #[error("unknown member '{0}'")]
    UnknownMember(String),

    /// A type reference names a type missing from the tree.
    #[error("unknown type '{0}'")]
    UnknownType(String),

    /// The member uses a construct that has no hardware representation.
    #[error("member '{member}' uses an unsupported construct: {construct}")]
    UnsupportedConstruct {
        /// Full name of the offending member.
        member: String,
        /// Description of the construct.
        construct: String,
    },

    /// A parallel lambda body writes a variable it captured from its caller.
    #[error("compiler-generated member '{member}' assigns captured variable '{variable}'; concurrent hardware cannot share it")]
    CapturedVariableMutation {
        /// Full name of the compiler-generated member.
        member: String,
        /// Name of the captured variable.
        variable: String,
    },

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A generator bug.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl TransformError {
    /// Shorthand for [`TransformError::UnsupportedConstruct`].
    pub fn unsupported(member: impl Into<String>, construct: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            member: member.into(),
            construct: construct.into(),
        }
    }
}
