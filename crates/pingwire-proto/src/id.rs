//! Numeric platform identifiers.
//!
//! Snowflake-style ids exceed the integer precision of some bridge runtimes,
//! so on the wire they are written as decimal strings. Plain JSON numbers
//! are accepted on input as well.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric value.
            #[inline]
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(SnowflakeVisitor).map(Self)
            }
        }
    };
}

snowflake!(
    /// A user (or bot) account.
    UserId
);
snowflake!(
    /// A guild: the owning group of a set of channels.
    GuildId
);
snowflake!(
    /// A conversation context (guild channel, group DM or direct message).
    ChannelId
);
snowflake!(
    /// A single message within a channel.
    MessageId
);

impl UserId {
    /// The platform mention token for this user, e.g. `<@42>`.
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}

struct SnowflakeVisitor;

impl Visitor<'_> for SnowflakeVisitor {
    type Value = u64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer or a decimal string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
        u64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
        v.parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_strings() {
        let json = serde_json::to_string(&UserId(81234567890123456)).unwrap();
        assert_eq!(json, "\"81234567890123456\"");
    }

    #[test]
    fn ids_accept_numbers_and_strings() {
        let a: ChannelId = serde_json::from_str("55").unwrap();
        let b: ChannelId = serde_json::from_str("\"55\"").unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<ChannelId>("-1").is_err());
        assert!(serde_json::from_str::<ChannelId>("\"5x\"").is_err());
    }

    #[test]
    fn mention_token() {
        assert_eq!(UserId(7).mention(), "<@7>");
    }
}
