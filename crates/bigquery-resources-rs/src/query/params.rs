//! Named query parameters.
//!
//! Values bound here are always sent in the `queryParameters` field of a request,
//! and are never spliced into the SQL text itself.
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::ser::SerializeStruct;

/// The declared BigQuery type of a query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterType {
    String,
    Int64,
    Float64,
    Bool,
    Bytes,
    Date,
    Timestamp,
    Numeric,
    Json,
    Array(Box<ParameterType>),
}

impl ParameterType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Int64 => "INT64",
            Self::Float64 => "FLOAT64",
            Self::Bool => "BOOL",
            Self::Bytes => "BYTES",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Numeric => "NUMERIC",
            Self::Json => "JSON",
            Self::Array(_) => "ARRAY",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(element) => write!(f, "ARRAY<{element}>"),
            other => f.write_str(other.as_str()),
        }
    }
}

impl serde::Serialize for ParameterType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Array(element) => {
                let mut state = serializer.serialize_struct("QueryParameterType", 2)?;
                state.serialize_field("type", self.as_str())?;
                state.serialize_field("arrayType", element)?;
                state.end()
            }
            _ => {
                let mut state = serializer.serialize_struct("QueryParameterType", 1)?;
                state.serialize_field("type", self.as_str())?;
                state.end()
            }
        }
    }
}

/// A typed parameter value. Date, timestamp and numeric values are passed through
/// in their canonical BigQuery string forms.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(Box<str>),
    Int64(i64),
    Float64(f64),
    Bool(bool),
    Bytes(Vec<u8>),
    Date(Box<str>),
    Timestamp(Box<str>),
    Numeric(Box<str>),
    Json(serde_json::Value),
    Array(ParameterType, Vec<ParameterValue>),
    Null(ParameterType),
}

impl ParameterValue {
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            Self::String(_) => ParameterType::String,
            Self::Int64(_) => ParameterType::Int64,
            Self::Float64(_) => ParameterType::Float64,
            Self::Bool(_) => ParameterType::Bool,
            Self::Bytes(_) => ParameterType::Bytes,
            Self::Date(_) => ParameterType::Date,
            Self::Timestamp(_) => ParameterType::Timestamp,
            Self::Numeric(_) => ParameterType::Numeric,
            Self::Json(_) => ParameterType::Json,
            Self::Array(element, _) => ParameterType::Array(Box::new(element.clone())),
            Self::Null(ty) => ty.clone(),
        }
    }

    fn to_wire(&self) -> QueryParameterValue {
        let value = match self {
            Self::String(s) | Self::Date(s) | Self::Timestamp(s) | Self::Numeric(s) => {
                Some(s.clone())
            }
            Self::Int64(int) => Some(int.to_string().into_boxed_str()),
            Self::Float64(float) => Some(encode_float(*float)),
            Self::Bool(b) => Some(Box::from(if *b { "true" } else { "false" })),
            Self::Bytes(bytes) => Some(STANDARD.encode(bytes).into_boxed_str()),
            Self::Json(json) => Some(json.to_string().into_boxed_str()),
            Self::Array(_, values) => {
                return QueryParameterValue {
                    value: None,
                    array_values: values.iter().map(Self::to_wire).collect(),
                };
            }
            Self::Null(_) => None,
        };

        QueryParameterValue {
            value,
            array_values: Vec::new(),
        }
    }
}

// BigQuery spells the non-finite values differently than rust does.
fn encode_float(float: f64) -> Box<str> {
    if float.is_nan() {
        Box::from("NaN")
    } else if float == f64::INFINITY {
        Box::from("Infinity")
    } else if float == f64::NEG_INFINITY {
        Box::from("-Infinity")
    } else {
        float.to_string().into_boxed_str()
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for ParameterValue {
                #[inline]
                fn from(value: $t) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    &str => String,
    String => String,
    Box<str> => String,
    i32 => Int64,
    i64 => Int64,
    u32 => Int64,
    f32 => Float64,
    f64 => Float64,
    bool => Bool,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
}

/// The wire form of a single named parameter.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter {
    pub name: Box<str>,
    pub parameter_type: ParameterType,
    pub parameter_value: QueryParameterValue,
}

impl QueryParameter {
    pub fn new(name: impl Into<Box<str>>, value: &ParameterValue) -> Self {
        Self {
            name: name.into(),
            parameter_type: value.parameter_type(),
            parameter_value: value.to_wire(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.parameter_value.value.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameterValue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<str>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub array_values: Vec<QueryParameterValue>,
}

/// An ordered set of named parameters. Inserting a name that already exists
/// replaces the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParameters {
    params: Vec<(Box<str>, ParameterValue)>,
}

impl QueryParameters {
    pub const fn new() -> Self {
        Self { params: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<Box<str>>, value: impl Into<ParameterValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<Box<str>>, value: impl Into<ParameterValue>) {
        let name = name.into();
        let value = value.into();

        match self.params.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.params.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.params
            .iter()
            .find(|(existing, _)| &**existing == name)
            .map(|(_, value)| value)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &ParameterValue)> + '_ {
        self.params.iter().map(|(name, value)| (&**name, value))
    }

    pub fn to_wire(&self) -> Vec<QueryParameter> {
        self.iter()
            .map(|(name, value)| QueryParameter::new(name, value))
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParameters
where
    K: Into<Box<str>>,
    V: Into<ParameterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}
