//! ClickUp tracker client.
//!
//! Uses the v2 REST API for reads and status changes, and the v3 workspace
//! API for moving a task to another list (v2 has no home-list move).

use std::time::Duration;

use async_trait::async_trait;
use dispatch_models::{GetTasksOptions, Task};
use dispatch_runtime::{CollaboratorResult, TrackerClient};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{IntegrationError, Result};

pub const CLICKUP_API_V2: &str = "https://api.clickup.com/api/v2";
pub const CLICKUP_API_V3: &str = "https://api.clickup.com/api/v3";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct TaskList {
    #[serde(default)]
    tasks: Vec<Task>,
}

/// ClickUp API client authenticated with a personal token.
#[derive(Debug, Clone)]
pub struct ClickUpClient {
    http: Client,
    token: String,
    team_id: Option<String>,
    base_url: String,
    v3_base_url: String,
}

impl ClickUpClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            token: token.into(),
            team_id: None,
            base_url: CLICKUP_API_V2.to_string(),
            v3_base_url: CLICKUP_API_V3.to_string(),
        })
    }

    /// Workspace id, required for moving tasks.
    pub fn with_team_id(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Points the client at other API roots.
    pub fn with_base_urls(mut self, v2: impl Into<String>, v3: impl Into<String>) -> Self {
        self.base_url = v2.into().trim_end_matches('/').to_string();
        self.v3_base_url = v3.into().trim_end_matches('/').to_string();
        self
    }

    /// Browser link for a task.
    pub fn task_link(task_id: &str) -> String {
        format!("https://app.clickup.com/t/{}", task_id)
    }

    fn get_task_request(&self, task_id: &str) -> RequestBuilder {
        self.http
            .get(format!("{}/task/{}", self.base_url, task_id))
            .header("Authorization", &self.token)
    }

    fn list_tasks_request(&self, list_id: &str, options: &GetTasksOptions) -> RequestBuilder {
        let mut request = self
            .http
            .get(format!("{}/list/{}/task", self.base_url, list_id))
            .header("Authorization", &self.token);

        if let Some(order_by) = &options.order_by {
            request = request.query(&[("order_by", order_by.as_str())]);
        }
        if options.reverse {
            request = request.query(&[("reverse", "true")]);
        }
        for status in &options.statuses {
            request = request.query(&[("statuses[]", status.as_str())]);
        }
        if options.include_closed {
            request = request.query(&[("include_closed", "true")]);
        }
        request
    }

    fn update_status_request(&self, task_id: &str, status: &str) -> RequestBuilder {
        self.http
            .put(format!("{}/task/{}", self.base_url, task_id))
            .header("Authorization", &self.token)
            .json(&json!({ "status": status }))
    }

    fn move_request(&self, task_id: &str, list_id: &str) -> Result<RequestBuilder> {
        let team_id = self
            .team_id
            .as_deref()
            .ok_or(IntegrationError::NotConfigured("CLICKUP_TEAM_ID"))?;
        Ok(self
            .http
            .put(format!(
                "{}/workspaces/{}/tasks/{}/home_list/{}",
                self.v3_base_url, team_id, task_id, list_id
            ))
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::api("clickup", status.as_u16(), body));
        }
        Ok(response)
    }

    pub async fn fetch_task(&self, task_id: &str) -> Result<Task> {
        let response = self.send(self.get_task_request(task_id)).await?;
        Ok(response.json().await?)
    }

    pub async fn fetch_tasks(&self, list_id: &str, options: &GetTasksOptions) -> Result<Vec<Task>> {
        let response = self.send(self.list_tasks_request(list_id, options)).await?;
        let body = response.text().await?;
        let list: TaskList =
            serde_json::from_str(&body).map_err(|e| IntegrationError::Parse(e.to_string()))?;
        debug!(list_id = %list_id, count = list.tasks.len(), "fetched tasks");
        Ok(list.tasks)
    }

    pub async fn set_status(&self, task_id: &str, status: &str) -> Result<()> {
        self.send(self.update_status_request(task_id, status)).await?;
        debug!(task_id = %task_id, status = %status, "updated task status");
        Ok(())
    }

    pub async fn move_task(&self, task_id: &str, list_id: &str) -> Result<()> {
        let request = self.move_request(task_id, list_id)?;
        self.send(request).await?;
        debug!(task_id = %task_id, list_id = %list_id, "moved task");
        Ok(())
    }
}

#[async_trait]
impl TrackerClient for ClickUpClient {
    async fn get_task(&self, task_id: &str) -> CollaboratorResult<Task> {
        Ok(self.fetch_task(task_id).await?)
    }

    async fn get_tasks(
        &self,
        queue_id: &str,
        options: &GetTasksOptions,
    ) -> CollaboratorResult<Vec<Task>> {
        Ok(self.fetch_tasks(queue_id, options).await?)
    }

    async fn update_task_status(&self, task_id: &str, status: &str) -> CollaboratorResult<()> {
        Ok(self.set_status(task_id, status).await?)
    }

    async fn move_task_to_list(&self, task_id: &str, queue_id: &str) -> CollaboratorResult<()> {
        Ok(self.move_task(task_id, queue_id).await?)
    }
}
