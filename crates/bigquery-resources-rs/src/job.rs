use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference<S = Box<str>> {
    pub project_id: S,
    pub job_id: S,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<S>,
}

impl<S: fmt::Display> fmt::Display for JobReference<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(ref location) => write!(f, "{}:{}.{}", self.project_id, location, self.job_id),
            None => write!(f, "{}:{}", self.project_id, self.job_id),
        }
    }
}
