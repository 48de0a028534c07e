//! Dynamically typed values returned in query results.
//!
//! Result rows carry no fixed schema known at compile time, so each cell is decoded
//! (according to the schema returned alongside the rows) into a [`Value`], and each
//! row into a [`Row`] that maps column names to values in schema order.
use std::fmt;
use std::sync::Arc;

use serde::ser::{SerializeMap, SerializeSeq};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(Box<str>),
    Record(Row),
    List(Vec<Value>),
}

impl Value {
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Integer(int) => Some(int),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers.
    pub const fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(float) => Some(float),
            Self::Integer(int) => Some(int as f64),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub const fn as_record(&self) -> Option<&Row> {
        match self {
            Self::Record(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                #[inline]
                fn from(value: $t) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i32 => Integer,
    i64 => Integer,
    f64 => Float,
    &str => String,
    String => String,
    Box<str> => String,
    Row => Record,
    Vec<Value> => List,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(num) => match num.as_i64() {
                Some(int) => Self::Integer(int),
                // u64's that overflow i64 and real floats both land here
                None => Self::Float(num.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Self::String(s.into_boxed_str()),
            serde_json::Value::Array(array) => {
                Self::List(array.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Self::Record(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl serde::Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Integer(int) => serializer.serialize_i64(*int),
            Self::Float(float) => serializer.serialize_f64(*float),
            Self::String(s) => serializer.serialize_str(s),
            Self::Record(row) => row.serialize(serializer),
            Self::List(list) => {
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for value in list {
                    seq.serialize_element(value)?;
                }
                seq.end()
            }
        }
    }
}

/// A single result row (or nested record), mapping column names to values.
///
/// Column names are shared between every row decoded from the same schema.
#[derive(Clone)]
pub struct Row {
    columns: Arc<[Box<str>]>,
    values: Vec<Value>,
}

impl Row {
    /// Builds a row from shared column names. Returns [`None`] if the number of
    /// values doesn't match the number of columns.
    pub fn from_parts(columns: Arc<[Box<str>]>, values: Vec<Value>) -> Option<Self> {
        if columns.len() == values.len() {
            Some(Self { columns, values })
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|name| &**name == column)?;
        self.values.get(index)
    }

    #[inline]
    pub fn columns(&self) -> &[Box<str>] {
        &self.columns
    }

    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[inline]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> + '_ {
        self.columns
            .iter()
            .map(|name| &**name)
            .zip(self.values.iter())
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<Box<str>>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let (columns, values): (Vec<Box<str>>, Vec<Value>) = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .unzip();

        Self {
            columns: Arc::from(columns),
            values,
        }
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl serde::Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_keeps_column_order() {
        let row: Row = [
            ("name", Value::from("bob")),
            ("visits", Value::from(3_i64)),
            ("ratio", Value::from(0.5)),
            ("missing", Value::Null),
        ]
        .into_iter()
        .collect();

        assert_eq!(row.len(), 4);
        assert_eq!(row.get("visits").and_then(Value::as_i64), Some(3));
        assert_eq!(row.get("ratio").and_then(Value::as_f64), Some(0.5));
        assert!(row.get("missing").is_some_and(Value::is_null));
        assert!(row.get("nope").is_none());

        let columns: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(columns, ["name", "visits", "ratio", "missing"]);

        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"name":"bob","visits":3,"ratio":0.5,"missing":null}"#
        );
    }

    #[test]
    fn test_from_parts_checks_lengths() {
        let columns: Arc<[Box<str>]> = Arc::from(vec![Box::from("a"), Box::from("b")]);

        assert!(Row::from_parts(Arc::clone(&columns), vec![Value::Null]).is_none());
        assert!(Row::from_parts(columns, vec![Value::Null, Value::from(true)]).is_some());
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "a": [1, 2.5, "x"],
            "b": {"nested": null},
            "c": true,
        });

        let Value::Record(row) = Value::from(json) else {
            panic!("expected a record");
        };

        assert_eq!(
            row.get("a"),
            Some(&Value::List(vec![
                Value::Integer(1),
                Value::Float(2.5),
                Value::from("x")
            ]))
        );
        assert_eq!(
            row.get("b")
                .and_then(Value::as_record)
                .and_then(|nested| nested.get("nested")),
            Some(&Value::Null)
        );
        assert_eq!(row.get("c").and_then(Value::as_bool), Some(true));
    }
}
