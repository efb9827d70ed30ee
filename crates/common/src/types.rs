//! Identifier types used throughout spacegov

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier
            pub fn new<S: Into<String>>(id: S) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string reference
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is empty
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

identifier!(
    /// Identity of a member, as delivered by the authentication layer
    MemberId
);

identifier!(
    /// Identifier of a space (the community a proposal belongs to)
    SpaceId
);

identifier!(
    /// Identifier of a proposal
    ProposalId
);

identifier!(
    /// Identifier of an awarding program that issues badges
    ProgramId
);
