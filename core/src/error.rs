//! Errors raised while defining or using a module.
//!
//! These are programming errors (bad registrations, unknown names, use before
//! binding) and are always returned to the caller. Transport failures are not
//! represented here: they become request records in state.

use std::fmt;
use thiserror::Error;

/// The registry family a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameFamily {
    /// HTTP-backed action
    ApiAction,
    /// Synchronous action
    Action,
    /// State mutation
    Mutation,
    /// Derived-value getter
    Getter,
}

impl fmt::Display for NameFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiAction => write!(f, "api action"),
            Self::Action => write!(f, "action"),
            Self::Mutation => write!(f, "mutation"),
            Self::Getter => write!(f, "getter"),
        }
    }
}

/// Errors detected when a module definition is built
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// The namespace is empty
    #[error("Module namespace cannot be empty")]
    EmptyNamespace,

    /// The namespace contains the event type separator
    #[error("Module namespace '{0}' cannot contain '/'")]
    InvalidNamespace(String),

    /// A registered name is empty
    #[error("Empty {family} name in module '{namespace}'")]
    EmptyName {
        /// Module namespace
        namespace: String,
        /// Registry family
        family: NameFamily,
    },

    /// A name was registered twice in the same family
    #[error("Duplicate {family} '{name}' in module '{namespace}'")]
    DuplicateName {
        /// Module namespace
        namespace: String,
        /// Registry family
        family: NameFamily,
        /// The duplicated name
        name: String,
    },

    /// A sync action and an API action share a name
    #[error("Action '{name}' in module '{namespace}' is registered as both a sync and an api action")]
    ActionCollision {
        /// Module namespace
        namespace: String,
        /// The colliding name
        name: String,
    },

    /// An API action and a mutation share a name
    #[error("Api action '{name}' in module '{namespace}' collides with a mutation of the same name")]
    MutationCollision {
        /// Module namespace
        namespace: String,
        /// The colliding name
        name: String,
    },

    /// No initial state was supplied
    #[error("Module '{0}' has no initial state")]
    MissingInitialState(String),
}

/// Errors returned by module operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// No action with this name is registered
    #[error("Action {name} does not exist in module '{namespace}'")]
    UnknownAction {
        /// Module namespace
        namespace: String,
        /// Requested action
        name: String,
    },

    /// The action exists but is of the other kind (sync vs API)
    #[error("Action {name} in module '{namespace}' is not {expected}")]
    WrongActionKind {
        /// Module namespace
        namespace: String,
        /// Requested action
        name: String,
        /// The kind the caller asked for, e.g. "a sync action"
        expected: &'static str,
    },

    /// No mutation with this name is registered
    #[error("Mutation {name} does not exist in module '{namespace}'")]
    UnknownMutation {
        /// Module namespace
        namespace: String,
        /// Requested mutation
        name: String,
    },

    /// No getter with this name is registered
    #[error("Getter {name} does not exist in module '{namespace}'")]
    UnknownGetter {
        /// Module namespace
        namespace: String,
        /// Requested getter
        name: String,
    },

    /// The getter's output is not of the requested type
    #[error("Getter {name} in module '{namespace}' does not return {expected}")]
    GetterType {
        /// Module namespace
        namespace: String,
        /// Requested getter
        name: String,
        /// The type the caller asked for
        expected: &'static str,
    },

    /// An operation ran before `bind_store`
    #[error("No store bound to module '{0}'")]
    NotBound(String),

    /// `bind_store` was called a second time
    #[error("Module '{0}' is already bound to a store")]
    AlreadyBound(String),

    /// The bound store holds no slice for this namespace
    #[error("Store has no state registered for module '{0}'")]
    NotRegistered(String),

    /// The slice under this namespace belongs to a different state type
    #[error("State registered under '{0}' has an unexpected type")]
    SliceType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_culprit() {
        let err = ModuleError::UnknownGetter {
            namespace: "todos".to_string(),
            name: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "Getter missing does not exist in module 'todos'");

        let err = ModuleError::WrongActionKind {
            namespace: "todos".to_string(),
            name: "GET_TODOS".to_string(),
            expected: "a sync action",
        };
        assert_eq!(
            err.to_string(),
            "Action GET_TODOS in module 'todos' is not a sync action"
        );
    }

    #[test]
    fn test_definition_error_display() {
        let err = DefinitionError::DuplicateName {
            namespace: "todos".to_string(),
            family: NameFamily::Getter,
            name: "todos".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate getter 'todos' in module 'todos'");
    }
}
