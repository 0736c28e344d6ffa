//! Jira adapter: projects → issues.
//!
//! Unlike Asana, an issue's path is not the ancestry walked to reach it: it
//! is the issue's own `fields.project.id`, wrapped as a single segment.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use yamlhouse_core::{ConfigError, Credential, Record};

use crate::adapter::{field_at, id_at, RecordStream, ServiceAdapter};
use crate::error::{RecordMappingError, RemoteFetchError};
use crate::http::{ApiClient, Auth, HttpClient, UreqClient, DEFAULT_TIMEOUT};

pub const KIND: &str = "jira";

const PAGE_SIZE: u64 = 50;
const ISSUE_FIELDS: &str = "summary,description,status,assignee,project";

/// `services[]` entry settings for `kind: jira`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JiraSettings {
    /// REST root, e.g. `https://acme.atlassian.net/rest/api/2`.
    pub base_uri: String,
    pub email: String,
    pub api_key: Credential,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

pub struct JiraAdapter {
    name: String,
    api: ApiClient,
}

impl JiraAdapter {
    /// Build from config settings with a `ureq` client.
    pub fn from_settings(name: Option<String>, settings: JiraSettings) -> Result<Self, ConfigError> {
        let api_key = settings.api_key.resolve()?;
        let timeout = settings
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        Ok(Self::with_http(
            name.unwrap_or_else(|| KIND.to_owned()),
            settings.base_uri,
            settings.email,
            api_key,
            Box::new(UreqClient::new(timeout)),
        ))
    }

    /// Build over any [`HttpClient`].
    pub fn with_http(
        name: impl Into<String>,
        base_uri: impl Into<String>,
        email: String,
        api_key: String,
        http: Box<dyn HttpClient>,
    ) -> Self {
        let name = name.into();
        let auth = Auth::Basic {
            username: email,
            password: api_key,
        };
        let api = ApiClient::new(name.clone(), base_uri, auth, http);
        Self { name, api }
    }
}

impl ServiceAdapter for JiraAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn produce_records(&self) -> RecordStream<'_> {
        Box::new(JiraIssues {
            api: &self.api,
            projects: None,
            cursor: None,
            issues: VecDeque::new(),
            finished: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

/// Next search page to request.
struct PageCursor {
    project: String,
    start_at: u64,
}

struct JiraIssues<'a> {
    api: &'a ApiClient,
    /// `None` until the project listing has been fetched.
    projects: Option<VecDeque<String>>,
    cursor: Option<PageCursor>,
    issues: VecDeque<Value>,
    finished: bool,
}

impl Iterator for JiraIssues<'_> {
    type Item = Result<Record, RemoteFetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(issue) = self.issues.pop_front() {
                match map_issue(&issue) {
                    Ok(record) => return Some(Ok(record)),
                    Err(err) => {
                        tracing::warn!(
                            service = %self.api.service(),
                            error = %err,
                            "skipping malformed issue"
                        );
                        continue;
                    }
                }
            }

            let step = if let Some(cursor) = self.cursor.take() {
                self.load_issues(cursor)
            } else if self.projects.is_none() {
                self.load_projects()
            } else if let Some(project) = self.projects.as_mut().and_then(VecDeque::pop_front) {
                self.cursor = Some(PageCursor {
                    project,
                    start_at: 0,
                });
                Ok(())
            } else {
                return None;
            };

            if let Err(err) = step {
                self.finished = true;
                return Some(Err(err));
            }
        }
    }
}

impl JiraIssues<'_> {
    fn load_projects(&mut self) -> Result<(), RemoteFetchError> {
        let endpoint = "/project";
        let body = self.api.get_json(endpoint, &[])?;
        let Value::Array(items) = body else {
            return Err(self.api.shape_error(endpoint, "an array of projects"));
        };

        let mut projects = VecDeque::with_capacity(items.len());
        for item in &items {
            match id_at(item, "/id") {
                Some(id) => projects.push_back(id.to_owned()),
                None => tracing::warn!(service = %self.api.service(), "skipping project without id"),
            }
        }
        self.projects = Some(projects);
        Ok(())
    }

    fn load_issues(&mut self, cursor: PageCursor) -> Result<(), RemoteFetchError> {
        let endpoint = "/search";
        let query = [
            ("jql", format!("project = {}", cursor.project)),
            ("startAt", cursor.start_at.to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
            ("fields", ISSUE_FIELDS.to_owned()),
        ];
        let body = self.api.get_json(endpoint, &query)?;
        let Some(Value::Array(issues)) = body.get("issues") else {
            return Err(self.api.shape_error(endpoint, "an object with an `issues` array"));
        };

        let fetched = issues.len() as u64;
        let total = body.get("total").and_then(Value::as_u64).unwrap_or(0);
        let next_start = cursor.start_at + fetched;
        self.issues.extend(issues.iter().cloned());

        if fetched > 0 && next_start < total {
            self.cursor = Some(PageCursor {
                project: cursor.project,
                start_at: next_start,
            });
        }
        Ok(())
    }
}

/// Normalize one search hit.
pub(crate) fn map_issue(issue: &Value) -> Result<Record, RecordMappingError> {
    let id = id_at(issue, "/id").ok_or(RecordMappingError::MissingField { field: "id" })?;
    let project = id_at(issue, "/fields/project/id").ok_or(RecordMappingError::MissingField {
        field: "fields.project.id",
    })?;
    Ok(Record::new(id, vec![project.to_owned()])?
        .with_field("summary", field_at(issue, "/fields/summary"))
        .with_field("description", field_at(issue, "/fields/description"))
        .with_field("status", field_at(issue, "/fields/status/name"))
        .with_field("assignee", field_at(issue, "/fields/assignee/displayName")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
