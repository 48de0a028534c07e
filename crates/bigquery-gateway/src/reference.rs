use bigquery_resources_rs::TableReference;

use crate::error::InvalidReferenceError;

/// A dot delimited table name, as accepted by [`QueryGateway::describe_table`] and
/// [`QueryGateway::table_schema`].
///
/// The last two segments are always the dataset and table. Anything before them is
/// the project, which may itself contain dots (`example.com:project`).
///
/// [`QueryGateway::describe_table`]: crate::QueryGateway::describe_table
/// [`QueryGateway::table_schema`]: crate::QueryGateway::table_schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableName<'a> {
    pub project: Option<&'a str>,
    pub dataset: &'a str,
    pub table: &'a str,
}

impl<'a> TableName<'a> {
    pub fn parse(name: &'a str) -> Result<Self, InvalidReferenceError> {
        let mut segments = name.rsplitn(3, '.');

        let table = segments.next().unwrap_or_default();
        let dataset = segments
            .next()
            .ok_or_else(|| InvalidReferenceError::new(name, "expected at least 'dataset.table'"))?;
        let project = segments.next();

        check_segment(name, dataset)?;
        check_segment(name, table)?;

        if let Some(project) = project {
            for segment in project.split('.') {
                check_segment(name, segment)?;
            }
        }

        Ok(Self {
            project,
            dataset,
            table,
        })
    }

    /// Resolves against `default_project` when the name didn't include one.
    pub fn with_default_project(self, default_project: &'a str) -> TableReference<&'a str> {
        TableReference {
            project_id: self.project.unwrap_or(default_project),
            dataset_id: self.dataset,
            table_id: self.table,
        }
    }
}

fn check_segment(name: &str, segment: &str) -> Result<(), InvalidReferenceError> {
    if segment.is_empty() {
        Err(InvalidReferenceError::new(name, "contains an empty segment"))
    } else if segment.contains('`') {
        Err(InvalidReferenceError::new(name, "contains a backtick"))
    } else {
        Ok(())
    }
}
