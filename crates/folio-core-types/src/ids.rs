//! Typed identifiers for the entities folio passes between layers.
//!
//! All identifiers are integer row ids on the persistence side. Wrapping them
//! keeps a page id from being handed to a function that expects a version id.

use serde::{Deserialize, Serialize};

macro_rules! integer_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw integer id
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Get the raw integer id
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

integer_id!(
    /// Identifier of a page (the root of a content document)
    PageId
);

integer_id!(
    /// Identifier of an immutable version snapshot
    VersionId
);

integer_id!(
    /// Identifier of a content language
    LanguageId
);

integer_id!(
    /// Identifier of an authenticated user
    UserId
);
