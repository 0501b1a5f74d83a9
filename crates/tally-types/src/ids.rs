use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

macro_rules! sequential_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "u64", into = "u64")]
        pub struct $name(u64);

        impl $name {
            /// The first id allocated in a scope.
            pub const FIRST: Self = Self(1);

            /// Wrap a raw value. Zero is not a valid id.
            pub fn new(value: u64) -> Result<Self, TypeError> {
                if value == 0 {
                    return Err(TypeError::InvalidId(format!(
                        "{} must be at least 1",
                        stringify!($name)
                    )));
                }
                Ok(Self(value))
            }

            /// Id for the 1-based position `count + 1`, i.e. the next id
            /// after `count` have been allocated.
            pub fn after(count: usize) -> Self {
                Self(count as u64 + 1)
            }

            /// Raw numeric value.
            pub fn get(self) -> u64 {
                self.0
            }

            /// Zero-based position in a dense arena, or `None` if the id is
            /// beyond what this platform can address.
            pub fn index(self) -> Option<usize> {
                usize::try_from(self.0 - 1).ok()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<u64> for $name {
            type Error = TypeError;

            fn try_from(value: u64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| TypeError::InvalidId(format!("{s}: {e}")))?;
                Self::new(value)
            }
        }
    };
}

sequential_id! {
    /// Identifier of an election, allocated globally in creation order.
    ElectionId
}

sequential_id! {
    /// Identifier of a candidate, allocated per election in registration order.
    CandidateId
}
