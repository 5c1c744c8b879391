//! Error Types
//!
//! Every fallible operation in the crate returns [`PlugError`]. Connection
//! legality failures carry a [`ConnectionRule`] naming the rule that was
//! broken, so the graph layer can reject a connection with a precise reason.

use thiserror::Error;

use crate::graph::{NodeId, PlugId};
use crate::plug::Direction;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlugError>;

/// A base-level connection rule that a candidate connection broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectionRule {
    /// One of the plugs does not belong to the graph performing the check.
    #[error("plugs belong to different graphs")]
    ForeignPlug,

    /// A plug cannot be its own input.
    #[error("a plug cannot be connected to itself")]
    SelfConnection,

    /// Only input plugs take connections.
    #[error("destination is not an input plug")]
    DestinationNotInput,

    /// Connections always originate at an output plug.
    #[error("source is not an output plug")]
    SourceNotOutput,

    /// The destination lacks the `ACCEPTS_INPUTS` flag.
    #[error("destination does not accept inputs")]
    InputsNotAccepted,

    /// The destination is flagged `READ_ONLY`.
    #[error("destination is read-only")]
    ReadOnly,

    /// The connection would close a loop in the graph.
    #[error("connection would create a cycle")]
    Cycle,
}

/// Errors raised by plugs, the graph, the action log and compute engines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlugError {
    /// The candidate's value type differs from the input's value type.
    #[error("cannot connect {candidate} ({candidate_type}) to {input} ({input_type}): value types differ")]
    TypeMismatch {
        input: String,
        input_type: &'static str,
        candidate: String,
        candidate_type: &'static str,
    },

    /// The connection broke a base-level legality rule.
    #[error("cannot connect {candidate} to {input}: {rule}")]
    IllegalConnection {
        input: String,
        candidate: String,
        rule: ConnectionRule,
    },

    /// An operation that pulls from upstream found no input connection.
    #[error("plug {plug} has no input connection")]
    NotConnected { plug: String },

    /// An operation was invoked on a plug of the wrong direction.
    #[error("plug {plug} is not an {expected} plug")]
    WrongDirection { plug: String, expected: Direction },

    /// A client write was attempted on a `READ_ONLY` plug.
    #[error("plug {plug} is read-only")]
    ReadOnly { plug: String },

    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("unknown plug {0:?}")]
    UnknownPlug(PlugId),

    #[error("a node named {name:?} already exists")]
    DuplicateNode { name: String },

    #[error("node {node:?} already has a plug named {name:?}")]
    DuplicatePlug { node: String, name: String },

    /// An affects relation was declared between unsuitable plugs.
    #[error("{input} cannot affect {output}: {reason}")]
    IllegalAffects {
        input: String,
        output: String,
        reason: &'static str,
    },

    /// A dirty output plug has no compute function to refresh it.
    #[error("no compute registered for {plug}")]
    NoCompute { plug: String },

    /// A compute function reported a failure.
    #[error("computing {plug} failed: {reason}")]
    ComputeFailed { plug: String, reason: String },

    /// The transaction handle does not match the log's open transaction.
    #[error("transaction {id} is not open on this action log")]
    UnknownTransaction { id: u64 },

    /// Undo and redo are refused while a transaction is open.
    #[error("cannot replay history while transaction {label:?} is open")]
    TransactionOpen { label: String },

    /// The plug outlived the graph that owned it.
    #[error("plug {plug} no longer belongs to a graph")]
    GraphDropped { plug: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PlugError {
    /// Convenience constructor for compute functions.
    pub fn compute_failed(plug: impl Into<String>, reason: impl Into<String>) -> Self {
        PlugError::ComputeFailed {
            plug: plug.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors caused by calling an operation whose
    /// preconditions did not hold.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            PlugError::NotConnected { .. }
                | PlugError::WrongDirection { .. }
                | PlugError::TypeMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for PlugError {
    fn from(err: serde_json::Error) -> Self {
        PlugError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_plugs() {
        let err = PlugError::IllegalConnection {
            input: "add.a".into(),
            candidate: "add.sum".into(),
            rule: ConnectionRule::Cycle,
        };
        assert_eq!(
            err.to_string(),
            "cannot connect add.sum to add.a: connection would create a cycle"
        );

        let err = PlugError::WrongDirection {
            plug: "src.out".into(),
            expected: Direction::Input,
        };
        assert_eq!(err.to_string(), "plug src.out is not an input plug");
    }

    #[test]
    fn precondition_classification() {
        assert!(PlugError::NotConnected { plug: "n.a".into() }.is_precondition_violation());
        assert!(PlugError::TypeMismatch {
            input: "n.a".into(),
            input_type: "i32",
            candidate: "m.b".into(),
            candidate_type: "StringPlug",
        }
        .is_precondition_violation());
        assert!(!PlugError::ReadOnly { plug: "n.a".into() }.is_precondition_violation());
        assert!(!PlugError::compute_failed("n.a", "boom").is_precondition_violation());
    }

    #[test]
    fn json_errors_become_config_errors() {
        let err: PlugError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, PlugError::Config(_)));
    }
}
