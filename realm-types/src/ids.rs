//! Identifier types used throughout the REALM core.
//!
//! Uses UUID v7 for time-ordered, globally unique identifiers. Element
//! identity is a separate concept — see [`crate::RealmId`], which is
//! derived from structure rather than generated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new id with the current timestamp.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an id from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            #[must_use]
            pub const fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a [`crate::RealmEvent`].
    ///
    /// v7 ordering makes event ids sortable by creation time, which the
    /// sync layer relies on for duplicate replay detection windows.
    EventId
}

uuid_id! {
    /// Unique identifier for a transaction.
    TransactionId
}

uuid_id! {
    /// Unique identifier for a single operation inside a transaction.
    OperationId
}

uuid_id! {
    /// Identifier for a connected client (editor host, browser surface,
    /// dashboard). Also used as the owner tag on file locks.
    ClientId
}

uuid_id! {
    /// Unique identifier for a change log entry.
    ChangeId
}
