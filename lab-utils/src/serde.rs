//! Utility module for serde of types.
//!
//! Link delays are written as (fractional) milliseconds in configuration files, e.g.,
//! `"delay": 2.5`.

/// (De-)serialize a `Duration` as a floating-point number of milliseconds.
///
/// ```ignore
/// #[serde(with = "lab_utils::serde::millis")]
/// delay: Duration,
/// ```
pub mod millis {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(delay.as_nanos() as f64 / 1_000_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(deserializer)?;
        if !ms.is_finite() || ms < 0.0 {
            return Err(D::Error::custom(format!("invalid delay of {ms}ms")));
        }
        // rounded to whole nanoseconds
        Duration::try_from_secs_f64(ms / 1_000.0)
            .map_err(|e| D::Error::custom(format!("invalid delay of {ms}ms: {e}")))
    }

    pub mod in_option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        // Helper to reuse the non-optional implementation for the `Some` case.
        #[derive(Deserialize)]
        #[serde(transparent)]
        struct Wrap(#[serde(with = "crate::serde::millis")] Duration);

        pub fn serialize<S: Serializer>(
            delay: &Option<Duration>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match delay {
                Some(delay) => super::serialize(delay, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Duration>, D::Error> {
            Ok(Option::<Wrap>::deserialize(deserializer)?.map(|Wrap(d)| d))
        }
    }
}
