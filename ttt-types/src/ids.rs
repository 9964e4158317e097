//! Identity and correlation types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Get the inner UUID.
            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| TypesError::InvalidId(format!("{}: {}", s, e)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

uuid_id!(
    /// Local identifier of a game record, assigned at creation.
    ///
    /// Never leaves the party that created it; the peer only knows the
    /// [`ThreadId`].
    GameId
);

uuid_id!(
    /// Identifier of a single protocol message.
    MessageId
);

uuid_id!(
    /// Correlation identifier shared by both parties for one game.
    ///
    /// Derived from the [`MessageId`] of the Move message that opened the game.
    ThreadId
);

impl From<MessageId> for ThreadId {
    fn from(id: MessageId) -> Self {
        Self(id.0)
    }
}

/// Identifier of the channel to a peer, as assigned by the transport.
///
/// Opaque to the protocol: each party has its own id for the same link.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a ConnectionId from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_id_is_uuid_v4() {
        let id = GameId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn game_ids_are_unique() {
        assert_ne!(GameId::new(), GameId::new());
    }

    #[test]
    fn thread_id_from_message_id_keeps_value() {
        let message_id = MessageId::new();
        let thread_id = ThreadId::from(message_id);
        assert_eq!(thread_id.as_uuid(), message_id.as_uuid());
    }

    #[test]
    fn thread_id_parses_its_display() {
        let id = ThreadId::new();
        let parsed: ThreadId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn invalid_uuid_fails() {
        assert!(matches!(
            "not-a-uuid".parse::<GameId>(),
            Err(TypesError::InvalidId(_))
        ));
    }

    #[test]
    fn connection_id_display_is_raw() {
        let conn = ConnectionId::new("alice->bob");
        assert_eq!(conn.to_string(), "alice->bob");
        assert_eq!(format!("{:?}", conn), "ConnectionId(alice->bob)");
    }
}
