use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub const fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map($name::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

numeric_id!(
    /// Unique identifier for a curriculum Module
    ModuleId
);
numeric_id!(
    /// Unique identifier for a Topic (main assignment)
    TopicId
);
numeric_id!(
    /// Unique identifier for a Content Section
    SectionId
);
numeric_id!(
    /// Unique identifier for a Mini-Question
    MiniQuestionId
);
numeric_id!(
    /// Unique identifier for a Learner
    LearnerId
);
numeric_id!(
    /// Unique identifier for a Topic answer
    AnswerId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_id_display() {
        let id = TopicId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "TopicId(42)");
    }

    #[test]
    fn learner_id_from_str_trims() {
        let id: LearnerId = " 123 ".parse().unwrap();
        assert_eq!(id, LearnerId::new(123));
    }

    #[test]
    fn module_id_from_str_invalid() {
        let err = "not-a-number".parse::<ModuleId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse ModuleId from string");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&MiniQuestionId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: MiniQuestionId = serde_json::from_str("7").unwrap();
        assert_eq!(back, MiniQuestionId::new(7));
    }
}
