//! Custom deserializers for descriptor and configuration values.

use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;

/// Trait for types that can be inflated from a key and an optional value.
pub trait TryFromKv: Sized {
    type Err: Display;
    fn try_from_kv(key: String, val: Option<String>) -> Result<Self, Self::Err>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Str(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

/// Deserializes either a list of strings or a map into `Vec<T>`.
///
/// List entries are parsed with `FromStr`; map entries go through
/// [`TryFromKv`]. Map values may be numbers, booleans or null. Map order is
/// preserved.
pub fn polymorphic_vec<'de, D, T, C>(deserializer: D) -> Result<C, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + TryFromKv,
    C: From<Vec<T>>,
    <T as FromStr>::Err: Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Container {
        List(Vec<Scalar>),
        Map(indexmap::IndexMap<String, Option<Scalar>>),
    }

    let vec = match Container::deserialize(deserializer)? {
        Container::List(items) => items
            .into_iter()
            .map(|item| {
                item.into_string()
                    .parse()
                    .map_err(serde::de::Error::custom)
            })
            .collect::<Result<Vec<T>, _>>()?,
        Container::Map(map) => map
            .into_iter()
            .map(|(k, v)| {
                T::try_from_kv(k, v.map(Scalar::into_string)).map_err(serde::de::Error::custom)
            })
            .collect::<Result<Vec<T>, _>>()?,
    };

    Ok(C::from(vec))
}

/// Deserializes a single value or a list of values into `Vec<T>`.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(item)) => vec![item],
        Some(OneOrMany::Many(items)) => items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pair(String, Option<String>);

    impl FromStr for Pair {
        type Err = String;
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.split_once('=') {
                Some((k, v)) => Ok(Pair(k.into(), Some(v.into()))),
                None => Ok(Pair(s.into(), None)),
            }
        }
    }

    impl TryFromKv for Pair {
        type Err = String;
        fn try_from_kv(key: String, val: Option<String>) -> Result<Self, Self::Err> {
            Ok(Pair(key, val))
        }
    }

    #[derive(Deserialize)]
    struct Cfg {
        #[serde(deserialize_with = "polymorphic_vec")]
        env: Vec<Pair>,
        #[serde(default, deserialize_with = "one_or_many")]
        ports: Vec<String>,
    }

    #[test]
    fn test_list_and_map_forms() {
        let list: Cfg = serde_json::from_str(r#"{"env": ["A=1", "B"], "ports": "80"}"#).unwrap();
        assert_eq!(
            list.env,
            vec![Pair("A".into(), Some("1".into())), Pair("B".into(), None)]
        );
        assert_eq!(list.ports, vec!["80"]);

        let map: Cfg =
            serde_json::from_str(r#"{"env": {"Z": 3, "A": null}, "ports": ["80", "8080:80"]}"#)
                .unwrap();
        assert_eq!(
            map.env,
            vec![Pair("Z".into(), Some("3".into())), Pair("A".into(), None)]
        );
        assert_eq!(map.ports, vec!["80", "8080:80"]);
    }

    #[test]
    fn test_missing_list_is_empty() {
        let cfg: Cfg = serde_json::from_str(r#"{"env": []}"#).unwrap();
        assert!(cfg.ports.is_empty());
    }
}
