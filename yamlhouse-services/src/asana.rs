//! Asana adapter: workspaces → projects → tasks.
//!
//! Each task is addressed as `[project_gid]`. Every listing is requested
//! only when the stream needs it, so tasks of earlier workspaces are yielded
//! before later workspaces are even listed.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use yamlhouse_core::{ConfigError, Credential, Record};

use crate::adapter::{field_at, id_at, RecordStream, ServiceAdapter};
use crate::error::{RecordMappingError, RemoteFetchError};
use crate::http::{ApiClient, Auth, HttpClient, UreqClient, DEFAULT_TIMEOUT};

pub const KIND: &str = "asana";
pub const DEFAULT_BASE_URL: &str = "https://app.asana.com/api/1.0";

const PAGE_LIMIT: &str = "100";
const TASK_FIELDS: &str = "name,notes,completed,assignee.name";

/// `services[]` entry settings for `kind: asana`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AsanaSettings {
    pub api_key: Credential,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

pub struct AsanaAdapter {
    name: String,
    api: ApiClient,
}

impl AsanaAdapter {
    /// Build from config settings with a `ureq` client.
    pub fn from_settings(name: Option<String>, settings: AsanaSettings) -> Result<Self, ConfigError> {
        let token = settings.api_key.resolve()?;
        let timeout = settings
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        Ok(Self::with_http(
            name.unwrap_or_else(|| KIND.to_owned()),
            settings.base_url,
            token,
            Box::new(UreqClient::new(timeout)),
        ))
    }

    /// Build over any [`HttpClient`].
    pub fn with_http(
        name: impl Into<String>,
        base_url: impl Into<String>,
        token: String,
        http: Box<dyn HttpClient>,
    ) -> Self {
        let name = name.into();
        let api = ApiClient::new(name.clone(), base_url, Auth::Bearer(token), http);
        Self { name, api }
    }
}

impl ServiceAdapter for AsanaAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        KIND
    }

    fn produce_records(&self) -> RecordStream<'_> {
        Box::new(AsanaTasks {
            api: &self.api,
            workspaces: None,
            projects: VecDeque::new(),
            tasks: VecDeque::new(),
            finished: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

struct AsanaTasks<'a> {
    api: &'a ApiClient,
    /// `None` until the workspace listing has been fetched.
    workspaces: Option<VecDeque<String>>,
    projects: VecDeque<String>,
    tasks: VecDeque<(String, Value)>,
    finished: bool,
}

impl Iterator for AsanaTasks<'_> {
    type Item = Result<Record, RemoteFetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some((project, task)) = self.tasks.pop_front() {
                match map_task(&project, &task) {
                    Ok(record) => return Some(Ok(record)),
                    Err(err) => {
                        tracing::warn!(
                            service = %self.api.service(),
                            project = %project,
                            error = %err,
                            "skipping malformed task"
                        );
                        continue;
                    }
                }
            }

            let step = if let Some(project) = self.projects.pop_front() {
                self.load_tasks(project)
            } else if self.workspaces.is_none() {
                self.load_workspaces()
            } else if let Some(workspace) = self.workspaces.as_mut().and_then(VecDeque::pop_front)
            {
                self.load_projects(&workspace)
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

impl AsanaTasks<'_> {
    fn load_workspaces(&mut self) -> Result<(), RemoteFetchError> {
        let items = list_all(self.api, "/workspaces", &[])?;
        self.workspaces = Some(gids(self.api, "workspace", items).collect());
        Ok(())
    }

    fn load_projects(&mut self, workspace: &str) -> Result<(), RemoteFetchError> {
        let endpoint = format!("/workspaces/{workspace}/projects");
        let items = list_all(self.api, &endpoint, &[])?;
        self.projects.extend(gids(self.api, "project", items));
        Ok(())
    }

    fn load_tasks(&mut self, project: String) -> Result<(), RemoteFetchError> {
        let endpoint = format!("/projects/{project}/tasks");
        let items = list_all(self.api, &endpoint, &[("opt_fields", TASK_FIELDS.to_owned())])?;
        self.tasks
            .extend(items.into_iter().map(|task| (project.clone(), task)));
        Ok(())
    }
}

/// Fetch every page of an Asana collection, following `next_page.offset`.
fn list_all(
    api: &ApiClient,
    endpoint: &str,
    extra: &[(&str, String)],
) -> Result<Vec<Value>, RemoteFetchError> {
    let mut items = Vec::new();
    let mut offset: Option<String> = None;

    loop {
        let mut query: Vec<(&str, String)> = vec![("limit", PAGE_LIMIT.to_owned())];
        query.extend(extra.iter().cloned());
        if let Some(token) = offset.take() {
            query.push(("offset", token));
        }

        let body = api.get_json(endpoint, &query)?;
        let Some(Value::Array(data)) = body.get("data") else {
            return Err(api.shape_error(endpoint, "an object with a `data` array"));
        };
        items.extend(data.iter().cloned());

        match id_at(&body, "/next_page/offset") {
            Some(next) => offset = Some(next.to_owned()),
            None => return Ok(items),
        }
    }
}

/// Parent gids of a listing; entries without one are logged and dropped.
fn gids<'a>(
    api: &'a ApiClient,
    what: &'static str,
    items: Vec<Value>,
) -> impl Iterator<Item = String> + 'a {
    items.into_iter().filter_map(move |item| match id_at(&item, "/gid") {
        Some(gid) => Some(gid.to_owned()),
        None => {
            tracing::warn!(service = %api.service(), "skipping {what} without gid");
            None
        }
    })
}

/// Normalize one task listed under `project`.
pub(crate) fn map_task(project: &str, task: &Value) -> Result<Record, RecordMappingError> {
    let gid = id_at(task, "/gid").ok_or(RecordMappingError::MissingField { field: "gid" })?;
    Ok(Record::new(gid, vec![project.to_owned()])?
        .with_field("name", field_at(task, "/name"))
        .with_field("notes", field_at(task, "/notes"))
        .with_field("completed", field_at(task, "/completed"))
        .with_field("assignee", field_at(task, "/assignee/name")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
