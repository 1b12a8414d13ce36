//! `serde(with = ...)` helpers for `f64` payloads that may hold infinities
//! or NaN.
//!
//! Finite values are written as numbers. `+inf`, `-inf` and NaN are written
//! as the strings `"inf"`, `"-inf"` and `"nan"`, since JSON has no literal for
//! them and `serde_json` would otherwise emit `null`.

use serde::de::{self, Deserializer, Unexpected};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

struct Encoded(f64);

impl Serialize for Encoded {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        if value.is_finite() {
            serializer.serialize_f64(value)
        } else if value.is_nan() {
            serializer.serialize_str("nan")
        } else if value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

impl<'de> Deserialize<'de> for Encoded {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(Encoded(value)),
            Repr::Text(text) => match text.as_str() {
                "inf" => Ok(Encoded(f64::INFINITY)),
                "-inf" => Ok(Encoded(f64::NEG_INFINITY)),
                "nan" => Ok(Encoded(f64::NAN)),
                other => Err(de::Error::invalid_value(
                    Unexpected::Str(other),
                    &"a number, \"inf\", \"-inf\" or \"nan\"",
                )),
            },
        }
    }
}

struct EncodedRow<'a>(&'a [f64]);

impl Serialize for EncodedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|value| Encoded(*value)))
    }
}

/// Flat `Vec<f64>` fields.
pub mod values {
    use super::*;

    /// Writes `values` with non-finite entries as strings.
    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        EncodedRow(values).serialize(serializer)
    }

    /// Reads values written by [`serialize`].
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let encoded = Vec::<Encoded>::deserialize(deserializer)?;
        Ok(encoded.into_iter().map(|value| value.0).collect())
    }
}

/// Row-major `Vec<Vec<f64>>` fields.
pub mod rows {
    use super::*;

    /// Writes `rows` with non-finite entries as strings.
    pub fn serialize<S: Serializer>(rows: &[Vec<f64>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(rows.iter().map(|row| EncodedRow(row.as_slice())))
    }

    /// Reads rows written by [`serialize`].
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<f64>>, D::Error> {
        let encoded = Vec::<Vec<Encoded>>::deserialize(deserializer)?;
        Ok(encoded
            .into_iter()
            .map(|row| row.into_iter().map(|value| value.0).collect())
            .collect())
    }
}
