//! Strongly-typed identifiers.
//!
//! Identifiers handed to us by the agent are validated at construction time;
//! identifiers read back from the platform are trusted as-is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to define a strongly-typed string newtype wrapper.
///
/// Generates: struct, `from_string()`, `as_str()`, Display, Serialize, Deserialize.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn from_string(s: impl Into<String>) -> Result<Self, &'static str> {
                let s = s.into();
                if s.trim().is_empty() {
                    return Err(concat!(stringify!($name), " cannot be empty"));
                }
                Ok(Self(s))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(RecipeId);
define_id!(InstanceId);
define_id!(AdbEndpoint);
