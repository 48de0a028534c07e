use std::fmt;

pub mod job;
pub mod query;
pub mod table;
mod util;
pub mod value;

pub use value::{Row, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReference<S = Box<str>> {
    pub project_id: S,
    pub dataset_id: S,
    pub table_id: S,
}

impl<S> TableReference<S> {
    #[inline]
    pub fn as_deref(&self) -> TableReference<&S::Target>
    where
        S: std::ops::Deref,
    {
        TableReference {
            project_id: self.project_id.deref(),
            dataset_id: self.dataset_id.deref(),
            table_id: self.table_id.deref(),
        }
    }

    #[inline]
    pub const fn dataset_reference(&self) -> DatasetReference<&S> {
        DatasetReference {
            project_id: &self.project_id,
            dataset_id: &self.dataset_id,
        }
    }
}

impl TableReference<&str> {
    pub fn into_owned(self) -> TableReference {
        TableReference {
            project_id: Box::from(self.project_id),
            dataset_id: Box::from(self.dataset_id),
            table_id: Box::from(self.table_id),
        }
    }
}

/// Formats as the fully qualified, dot delimited `project.dataset.table` form.
impl<S: fmt::Display> fmt::Display for TableReference<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetReference<S = Box<str>> {
    pub project_id: S,
    pub dataset_id: S,
}

impl<S> DatasetReference<S> {
    #[inline]
    pub fn as_deref(&self) -> DatasetReference<&S::Target>
    where
        S: std::ops::Deref,
    {
        DatasetReference {
            project_id: self.project_id.deref(),
            dataset_id: self.dataset_id.deref(),
        }
    }

    #[inline]
    pub fn into_table(self, table_id: S) -> TableReference<S> {
        TableReference {
            project_id: self.project_id,
            dataset_id: self.dataset_id,
            table_id,
        }
    }
}

impl<S: fmt::Display> fmt::Display for DatasetReference<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project_id, self.dataset_id)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
pub struct ErrorProto<S = Box<str>> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<S>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<S>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<S>,
    pub message: S,
}

impl<S: fmt::Display> fmt::Display for ErrorProto<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Some(ref reason) => write!(f, "{}: {reason}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl<S> ErrorProto<S> {
    pub fn new(message: S) -> Self {
        Self {
            reason: None,
            location: None,
            debug_info: None,
            message,
        }
    }

    pub fn with_reason(mut self, reason: S) -> Self {
        self.reason = Some(reason);
        self
    }
}

impl<S: AsRef<str>> ErrorProto<S> {
    pub fn is_not_found(&self) -> bool {
        self.reason
            .as_ref()
            .is_some_and(|reason| reason.as_ref() == "notFound")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_reference_display() {
        let table = DatasetReference {
            project_id: "project",
            dataset_id: "sales",
        }
        .into_table("t1");

        assert_eq!(table.to_string(), "project.sales.t1");
        assert_eq!(table.dataset_reference().to_string(), "project.sales");
    }

    #[test]
    fn test_error_proto_deserialize() {
        let error: ErrorProto = serde_json::from_str(
            r#"{"message": "Not found: Table p:d.t", "domain": "global", "reason": "notFound"}"#,
        )
        .unwrap();

        assert!(error.is_not_found());
        assert_eq!(error.to_string(), "Not found: Table p:d.t: notFound");

        let bare: ErrorProto = serde_json::from_str(r#"{"message": "boom"}"#).unwrap();
        assert!(!bare.is_not_found());
        assert_eq!(bare.to_string(), "boom");
    }
}
