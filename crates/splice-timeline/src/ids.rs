//! Opaque identifiers for timeline entities.
//!
//! Entities refer to each other through these ids only; the owning
//! [`Timeline`](crate::Timeline) resolves them through its arenas.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Identifies a [`Clip`](crate::Clip).
    ClipId
);
entity_id!(
    /// Identifies a [`TimelineObject`](crate::TimelineObject).
    ObjectId
);
entity_id!(
    /// Identifies a [`Track`](crate::Track).
    TrackId
);
entity_id!(
    /// Identifies a [`Layer`](crate::Layer).
    LayerId
);
entity_id!(
    /// Identifies a set of linked objects that move together.
    LinkId
);
