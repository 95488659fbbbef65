use ::serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, SnowflakeId};

impl Serialize for SnowflakeId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        as_native::serialize(self, s)
    }
}

impl<'de> Deserialize<'de> for SnowflakeId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        as_native::deserialize(d)
    }
}

/// Serde helpers storing a [`SnowflakeId`] as its native `i64`.
///
/// This is also the default representation of [`SnowflakeId`].
pub mod as_native {
    use super::{Deserialize, Deserializer, Serialize, Serializer, SnowflakeId};

    /// Serialize an ID as its signed integer representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S: Serializer>(id: &SnowflakeId, s: S) -> Result<S::Ok, S::Error> {
        id.to_i64().serialize(s)
    }

    /// Deserialize an ID from its signed integer representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying deserializer fails or the value is
    /// negative.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SnowflakeId, D::Error> {
        let raw = i64::deserialize(d)?;
        SnowflakeId::try_from(raw).map_err(::serde::de::Error::custom)
    }
}

/// Serde helpers storing a [`SnowflakeId`] as a decimal string.
///
/// Useful for JSON consumers that lose precision above 2^53.
pub mod as_string {
    use super::{Deserializer, Error, Serializer, SnowflakeId};

    /// Serialize an ID as a decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying serializer fails.
    pub fn serialize<S: Serializer>(id: &SnowflakeId, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(id)
    }

    /// Deserialize an ID from a decimal string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The underlying deserializer fails
    /// - The string is not a decimal integer
    /// - The value is negative
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SnowflakeId, D::Error> {
        struct DecimalVisitor;

        impl ::serde::de::Visitor<'_> for DecimalVisitor {
            type Value = SnowflakeId;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a decimal snowflake id string")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                let raw: i64 = v.parse().map_err(E::custom)?;
                SnowflakeId::try_from(raw).map_err(|e: Error| E::custom(e))
            }
        }

        d.deserialize_str(DecimalVisitor)
    }
}
