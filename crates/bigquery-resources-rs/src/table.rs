use std::collections::HashMap;

use super::TableReference;
use crate::util;

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_reference: Option<TableReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Box<str>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<Box<str>, Box<str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<TableSchema>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "util::int64::optional"
    )]
    pub num_bytes: Option<u64>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "util::int64::optional"
    )]
    pub num_rows: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Box<str>>,
    /// `TABLE`, `VIEW`, `EXTERNAL`, `MATERIALIZED_VIEW`, `SNAPSHOT`, etc. Kept as a
    /// string so new table kinds don't break deserialization.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub ty: Option<Box<str>>,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

impl TableSchema {
    pub fn new(fields: Vec<TableFieldSchema>) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&TableFieldSchema> {
        self.fields.iter().find(|field| &*field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableFieldSchema {
    pub name: Box<str>,
    #[serde(rename = "type")]
    pub ty: FieldType,
    // the REST API omits the mode for nullable columns in some responses
    #[serde(default)]
    pub mode: FieldMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<TableFieldSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Box<str>>,
}

impl TableFieldSchema {
    pub fn new(name: impl Into<Box<str>>, ty: FieldType, mode: FieldMode) -> Self {
        Self {
            name: name.into(),
            ty,
            mode,
            fields: Vec::new(),
            description: None,
        }
    }

    pub fn record(
        name: impl Into<Box<str>>,
        mode: FieldMode,
        fields: Vec<TableFieldSchema>,
    ) -> Self {
        Self {
            fields,
            ..Self::new(name, FieldType::Record, mode)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Repeated,
    Required,
}

impl FieldMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Nullable => "Nullable",
            Self::Repeated => "Repeated",
            Self::Required => "Required",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Bytes,
    #[serde(alias = "INT64")]
    Integer,
    #[serde(alias = "FLOAT64")]
    Float,
    #[serde(alias = "BOOLEAN")]
    Bool,
    Timestamp,
    Date,
    Time,
    DateTime,
    Geography,
    Numeric,
    BigNumeric,
    Json,
    #[serde(alias = "STRUCT")]
    Record,
    Range,
    Interval,
}

impl FieldType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Bytes => "Bytes",
            Self::Integer => "Int64",
            Self::Float => "Float64",
            Self::Bool => "Bool",
            Self::Timestamp => "Timestamp",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::DateTime => "DateTime",
            Self::Geography => "Geography",
            Self::Numeric => "Numeric",
            Self::BigNumeric => "BigNumeric",
            Self::Json => "Json",
            Self::Record => "Struct",
            Self::Range => "Range",
            Self::Interval => "Interval",
        }
    }
}

/// One entry of a `tables.list` response. This is a subset of [`Table`], and notably
/// never includes a schema.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableListEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Box<str>>,
    pub table_reference: TableReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<Box<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "type")]
    pub ty: Option<Box<str>>,
}

impl TableListEntry {
    pub fn new(table_reference: TableReference) -> Self {
        Self {
            id: None,
            table_reference,
            friendly_name: None,
            ty: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableListPage {
    #[serde(default)]
    pub next_page_token: Option<Box<str>>,
    // omitted entirely when a dataset has no tables
    #[serde(default)]
    pub tables: Vec<TableListEntry>,
    #[serde(default, with = "util::int64::optional")]
    pub total_items: Option<u64>,
}

impl TableListPage {
    /// Returns the token for the next page, if there is one. Empty tokens are
    /// treated as the last page.
    pub fn next_page(&self) -> Option<&str> {
        self.next_page_token
            .as_deref()
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_list_page_deserialize() {
        const JSON: &str = r#"{
          "kind": "bigquery#tableList",
          "etag": "abc",
          "nextPageToken": "t2",
          "tables": [
            {
              "kind": "bigquery#table",
              "id": "project:sales.t1",
              "tableReference": {"projectId": "project", "datasetId": "sales", "tableId": "t1"},
              "type": "TABLE",
              "creationTime": "1731550230831"
            },
            {
              "kind": "bigquery#table",
              "id": "project:sales.t2",
              "tableReference": {"projectId": "project", "datasetId": "sales", "tableId": "t2"},
              "type": "VIEW"
            }
          ],
          "totalItems": 2
        }"#;

        let page: TableListPage = serde_json::from_str(JSON).unwrap();

        assert_eq!(page.next_page(), Some("t2"));
        assert_eq!(page.total_items, Some(2));

        let names: Vec<String> = page
            .tables
            .iter()
            .map(|table| table.table_reference.to_string())
            .collect();

        assert_eq!(names, ["project.sales.t1", "project.sales.t2"]);
        assert_eq!(page.tables[1].ty.as_deref(), Some("VIEW"));
    }

    #[test]
    fn test_empty_dataset_page() {
        let page: TableListPage =
            serde_json::from_str(r#"{"kind": "bigquery#tableList", "totalItems": 0}"#).unwrap();

        assert!(page.tables.is_empty());
        assert_eq!(page.next_page(), None);

        let blank_token: TableListPage =
            serde_json::from_str(r#"{"nextPageToken": "", "tables": []}"#).unwrap();
        assert_eq!(blank_token.next_page(), None);
    }

    #[test]
    fn test_table_schema_deserialize() {
        const JSON: &str = r#"{
          "tableReference": {"projectId": "p", "datasetId": "d", "tableId": "ga_sessions_20170801"},
          "schema": {
            "fields": [
              {"name": "visitId", "type": "INTEGER", "mode": "NULLABLE"},
              {"name": "date", "type": "STRING"},
              {
                "name": "totals",
                "type": "RECORD",
                "fields": [
                  {"name": "hits", "type": "INT64"},
                  {"name": "bounces", "type": "INTEGER"}
                ]
              },
              {"name": "hits", "type": "STRUCT", "mode": "REPEATED", "fields": []}
            ]
          },
          "numRows": "2556",
          "type": "TABLE"
        }"#;

        let table: Table = serde_json::from_str(JSON).unwrap();
        let schema = table.schema.unwrap();

        assert_eq!(table.num_rows, Some(2556));
        assert_eq!(schema.fields.len(), 4);
        assert_eq!(schema.field("date").map(|f| f.mode), Some(FieldMode::Nullable));

        let totals = schema.field("totals").unwrap();
        assert_eq!(totals.ty, FieldType::Record);
        assert_eq!(totals.fields[0].ty, FieldType::Integer);

        let hits = schema.field("hits").unwrap();
        assert_eq!(hits.ty, FieldType::Record);
        assert_eq!(hits.mode, FieldMode::Repeated);
    }
}
