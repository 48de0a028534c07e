//! Schema driven decoding of the REST row encoding.
//!
//! Rows come back as `{"f": [{"v": <cell>}, ...]}`, where every scalar cell is a json
//! string (or null), repeated cells are arrays of `{"v": ..}` wrappers, and record
//! cells are nested rows. The schema returned alongside the rows is the only way to
//! tell what each cell actually holds.
use std::sync::Arc;

use serde_json::Value as Json;

use crate::table::{FieldMode, FieldType, TableFieldSchema, TableSchema};
use crate::value::{Row, Value};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("rows were returned without a schema")]
    MissingSchema,
    #[error("malformed row: {0}")]
    MalformedRow(&'static str),
    #[error("row has {found} cells, but the schema has {expected} fields")]
    CellCount { expected: usize, found: usize },
    #[error("column '{column}' ({ty}): {message}")]
    InvalidCell {
        column: Box<str>,
        ty: &'static str,
        message: String,
    },
    #[error("row {index}: {source}")]
    AtRow {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    fn invalid(field: &TableFieldSchema, message: impl Into<String>) -> Self {
        Self::InvalidCell {
            column: field.name.clone(),
            ty: field.ty.as_str(),
            message: message.into(),
        }
    }
}

/// Decodes rows for a single schema. Column names (including those of nested
/// records) are allocated once and shared by every decoded row.
#[derive(Debug, Clone)]
pub struct RowDecoder<'a> {
    fields: &'a [TableFieldSchema],
    columns: Arc<[Box<str>]>,
    nested: Vec<Option<RowDecoder<'a>>>,
}

impl<'a> RowDecoder<'a> {
    pub fn new(schema: &'a TableSchema) -> Self {
        Self::from_fields(&schema.fields)
    }

    fn from_fields(fields: &'a [TableFieldSchema]) -> Self {
        let columns = fields.iter().map(|field| field.name.clone()).collect();

        let nested = fields
            .iter()
            .map(|field| match field.ty {
                FieldType::Record => Some(Self::from_fields(&field.fields)),
                _ => None,
            })
            .collect();

        Self {
            fields,
            columns,
            nested,
        }
    }

    pub fn decode_rows(&self, rows: &[Json]) -> Result<Vec<Row>, DecodeError> {
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                self.decode_row(row).map_err(|err| DecodeError::AtRow {
                    index,
                    source: Box::new(err),
                })
            })
            .collect()
    }

    pub fn decode_row(&self, row: &Json) -> Result<Row, DecodeError> {
        let cells = row
            .get("f")
            .ok_or(DecodeError::MalformedRow("missing 'f'"))?
            .as_array()
            .ok_or(DecodeError::MalformedRow("'f' is not an array"))?;

        if cells.len() != self.fields.len() {
            return Err(DecodeError::CellCount {
                expected: self.fields.len(),
                found: cells.len(),
            });
        }

        let mut values = Vec::with_capacity(cells.len());

        for ((field, nested), cell) in self.fields.iter().zip(&self.nested).zip(cells) {
            let cell = unwrap_cell(cell).ok_or_else(|| DecodeError::invalid(field, "missing 'v'"))?;
            values.push(decode_field(field, nested.as_ref(), cell)?);
        }

        Row::from_parts(Arc::clone(&self.columns), values).ok_or(DecodeError::CellCount {
            expected: self.columns.len(),
            found: self.fields.len(),
        })
    }
}

fn decode_field(
    field: &TableFieldSchema,
    nested: Option<&RowDecoder<'_>>,
    cell: &Json,
) -> Result<Value, DecodeError> {
    if field.mode != FieldMode::Repeated {
        return decode_scalar(field, nested, cell);
    }

    match cell {
        Json::Null => Ok(Value::List(Vec::new())),
        Json::Array(elements) => elements
            .iter()
            .map(|element| {
                let element = unwrap_cell(element)
                    .ok_or_else(|| DecodeError::invalid(field, "repeated element missing 'v'"))?;
                decode_scalar(field, nested, element)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Err(DecodeError::invalid(
            field,
            format!("expected an array, found {}", json_kind(other)),
        )),
    }
}

fn unwrap_cell(cell: &Json) -> Option<&Json> {
    cell.as_object()?.get("v")
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a bool",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

fn decode_scalar(
    field: &TableFieldSchema,
    nested: Option<&RowDecoder<'_>>,
    cell: &Json,
) -> Result<Value, DecodeError> {
    if cell.is_null() {
        return Ok(Value::Null);
    }

    match field.ty {
        FieldType::Record => {
            let decoder =
                nested.ok_or_else(|| DecodeError::invalid(field, "record without a schema"))?;
            decoder.decode_row(cell).map(Value::Record)
        }
        FieldType::Integer => match cell {
            Json::String(s) => s
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|err| DecodeError::invalid(field, format!("'{s}': {err}"))),
            Json::Number(num) => num
                .as_i64()
                .map(Value::Integer)
                .ok_or_else(|| DecodeError::invalid(field, format!("'{num}' is not an int64"))),
            other => Err(unexpected(field, other)),
        },
        FieldType::Float => match cell {
            Json::String(s) => parse_float(s)
                .map(Value::Float)
                .ok_or_else(|| DecodeError::invalid(field, format!("'{s}' is not a float"))),
            Json::Number(num) => num
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| DecodeError::invalid(field, format!("'{num}' is not a float"))),
            other => Err(unexpected(field, other)),
        },
        FieldType::Bool => match cell {
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Json::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            other => Err(unexpected(field, other)),
        },
        FieldType::Json => match cell {
            Json::String(s) => serde_json::from_str::<Json>(s)
                .map(Value::from)
                .map_err(|err| DecodeError::invalid(field, err.to_string())),
            other => Ok(Value::from(other.clone())),
        },
        // everything else is kept in the encoding the service returned
        _ => match cell {
            Json::String(s) => Ok(Value::String(s.as_str().into())),
            other => Err(unexpected(field, other)),
        },
    }
}

fn unexpected(field: &TableFieldSchema, found: &Json) -> DecodeError {
    DecodeError::invalid(field, format!("unexpected {}", json_kind(found)))
}

fn parse_float(s: &str) -> Option<f64> {
    match s {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn schema() -> TableSchema {
        TableSchema::new(vec![
            TableFieldSchema::new("id", FieldType::Integer, FieldMode::Required),
            TableFieldSchema::new("score", FieldType::Float, FieldMode::Nullable),
            TableFieldSchema::new("active", FieldType::Bool, FieldMode::Nullable),
            TableFieldSchema::new("name", FieldType::String, FieldMode::Nullable),
            TableFieldSchema::new("tags", FieldType::String, FieldMode::Repeated),
            TableFieldSchema::record(
                "totals",
                FieldMode::Nullable,
                vec![
                    TableFieldSchema::new("hits", FieldType::Integer, FieldMode::Nullable),
                    TableFieldSchema::new("day", FieldType::Date, FieldMode::Nullable),
                ],
            ),
        ])
    }

    #[test]
    fn test_decode_rows() {
        let schema = schema();
        let decoder = RowDecoder::new(&schema);

        let rows = vec![
            json!({"f": [
                {"v": "1"},
                {"v": "0.25"},
                {"v": "true"},
                {"v": "alpha"},
                {"v": [{"v": "a"}, {"v": "b"}]},
                {"v": {"f": [{"v": "42"}, {"v": "2017-08-01"}]}},
            ]}),
            json!({"f": [
                {"v": "2"},
                {"v": "-Infinity"},
                {"v": null},
                {"v": null},
                {"v": null},
                {"v": null},
            ]}),
        ];

        let decoded = decoder.decode_rows(&rows).unwrap();
        assert_eq!(decoded.len(), 2);

        let first = &decoded[0];
        assert_eq!(first.get("id"), Some(&Value::Integer(1)));
        assert_eq!(first.get("score"), Some(&Value::Float(0.25)));
        assert_eq!(first.get("active"), Some(&Value::Bool(true)));
        assert_eq!(first.get("name"), Some(&Value::from("alpha")));
        assert_eq!(
            first.get("tags"),
            Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
        );

        let totals = first.get("totals").and_then(Value::as_record).unwrap();
        assert_eq!(totals.get("hits"), Some(&Value::Integer(42)));
        assert_eq!(totals.get("day"), Some(&Value::from("2017-08-01")));

        let second = &decoded[1];
        assert_eq!(second.get("score"), Some(&Value::Float(f64::NEG_INFINITY)));
        assert_eq!(second.get("active"), Some(&Value::Null));
        assert_eq!(second.get("tags"), Some(&Value::List(vec![])));
        assert_eq!(second.get("totals"), Some(&Value::Null));

        let columns: Vec<&str> = second.iter().map(|(name, _)| name).collect();
        assert_eq!(columns, ["id", "score", "active", "name", "tags", "totals"]);
    }

    #[test]
    fn test_json_column() {
        let schema = TableSchema::new(vec![TableFieldSchema::new(
            "doc",
            FieldType::Json,
            FieldMode::Nullable,
        )]);

        let row = RowDecoder::new(&schema)
            .decode_row(&json!({"f": [{"v": r#"{"a": [1, "x"]}"#}]}))
            .unwrap();

        let doc = row.get("doc").and_then(Value::as_record).unwrap();
        assert_eq!(
            doc.get("a"),
            Some(&Value::List(vec![Value::Integer(1), Value::from("x")]))
        );
    }

    #[test]
    fn test_decode_errors() {
        let schema = schema();
        let decoder = RowDecoder::new(&schema);

        let bad_int = json!({"f": [
            {"v": "not a number"},
            {"v": null}, {"v": null}, {"v": null}, {"v": null}, {"v": null},
        ]});

        let err = decoder.decode_rows(&[bad_int]).unwrap_err();
        let DecodeError::AtRow { index: 0, source } = err else {
            panic!("expected an error at row 0");
        };
        assert!(matches!(
            *source,
            DecodeError::InvalidCell { ref column, .. } if &**column == "id"
        ));

        let short = json!({"f": [{"v": "1"}]});
        assert!(matches!(
            decoder.decode_row(&short),
            Err(DecodeError::CellCount { expected: 6, found: 1 })
        ));

        assert!(matches!(
            decoder.decode_row(&json!({"x": []})),
            Err(DecodeError::MalformedRow(_))
        ));
    }
}
