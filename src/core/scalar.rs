//! Lenient string fields
//!
//! Flattened and untagged types are buffered by serde before they reach
//! their fields, and a buffered `7` or `true` no longer reads as a string.
//! Fields that users commonly write unquoted (tags, env values, resource
//! quantities) go through these helpers, which take any YAML scalar and keep
//! its text. Floats keep their parsed value, so `4.10` reads as `4.1`.

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Scalar(String);

struct ScalarVisitor;

impl<'de> Visitor<'de> for ScalarVisitor {
    type Value = Scalar;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Scalar, E> {
        Ok(Scalar(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Scalar, E> {
        Ok(Scalar(v))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Scalar, E> {
        Ok(Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Scalar, E> {
        Ok(Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Scalar, E> {
        Ok(Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Scalar, E> {
        Ok(Scalar(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

pub(crate) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Scalar::deserialize(deserializer).map(|s| s.0)
}

pub(crate) fn option_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|s| s.0))
}

pub(crate) fn string_map<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error> {
    Ok(BTreeMap::<Scalar, Scalar>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| (key.0, value.0))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Fields {
        #[serde(deserialize_with = "string")]
        tag: String,
        #[serde(default, deserialize_with = "option_string")]
        alias: Option<String>,
        #[serde(default, deserialize_with = "string_map")]
        env: BTreeMap<String, String>,
    }

    #[derive(Debug, Deserialize)]
    struct Buffered {
        #[serde(flatten)]
        fields: Fields,
    }

    #[test]
    fn test_scalars_read_as_text_through_flatten() {
        let yaml = "tag: 7\nalias: true\nenv:\n  RETRIES: 3\n  RATIO: 0.5\n  NAME: plain\n";
        let parsed: Buffered = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.fields.tag, "7");
        assert_eq!(parsed.fields.alias.as_deref(), Some("true"));
        assert_eq!(parsed.fields.env["RETRIES"], "3");
        assert_eq!(parsed.fields.env["RATIO"], "0.5");
        assert_eq!(parsed.fields.env["NAME"], "plain");
    }

    #[test]
    fn test_missing_optional_is_none() {
        let parsed: Fields = serde_yaml::from_str("tag: latest\n").unwrap();
        assert_eq!(parsed.tag, "latest");
        assert!(parsed.alias.is_none());
        assert!(parsed.env.is_empty());
    }

    #[test]
    fn test_non_scalars_are_rejected() {
        assert!(serde_yaml::from_str::<Fields>("tag: [a, b]\n").is_err());
        assert!(serde_yaml::from_str::<Fields>("tag: x\nenv:\n  A: {b: c}\n").is_err());
    }
}
