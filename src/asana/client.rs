//! Asana REST client

use super::models::{Attachment, Page, Project, Task};
use super::WorkApi;
use crate::config::AsanaConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fields requested for every task, matching what a full export needs
pub const TASK_FIELDS: &str = "actual_time_minutes,approval_status,assignee,assignee.name,assignee_section,assignee_section.name,assignee_status,completed,completed_at,completed_by,completed_by.name,created_at,created_by,custom_fields,custom_fields.asana_created_field,custom_fields.created_by,custom_fields.created_by.name,custom_fields.currency_code,custom_fields.custom_label,custom_fields.custom_label_position,custom_fields.date_value,custom_fields.date_value.date,custom_fields.date_value.date_time,custom_fields.description,custom_fields.display_value,custom_fields.enabled,custom_fields.enum_options,custom_fields.enum_options.color,custom_fields.enum_options.enabled,custom_fields.enum_options.name,custom_fields.enum_value,custom_fields.enum_value.color,custom_fields.enum_value.enabled,custom_fields.enum_value.name,custom_fields.format,custom_fields.has_notifications_enabled,custom_fields.is_formula_field,custom_fields.is_global_to_workspace,custom_fields.is_value_read_only,custom_fields.multi_enum_values,custom_fields.multi_enum_values.color,custom_fields.multi_enum_values.enabled,custom_fields.multi_enum_values.name,custom_fields.name,custom_fields.number_value,custom_fields.people_value,custom_fields.people_value.name,custom_fields.precision,custom_fields.resource_subtype,custom_fields.text_value,custom_fields.type,dependencies,dependents,due_at,due_on,external,external.data,followers,followers.name,hearted,hearts,hearts.user,hearts.user.name,html_notes,is_rendered_as_separator,liked,likes,likes.user,likes.user.name,memberships,memberships.project,memberships.project.name,memberships.section,memberships.section.name,modified_at,name,notes,num_hearts,num_likes,num_subtasks,parent,parent.created_by,parent.name,parent.resource_subtype,permalink_url,projects,projects.name,resource_subtype,start_at,start_on,tags,tags.name,workspace,workspace.name";

/// Fields requested for every attachment
pub const ATTACHMENT_FIELDS: &str = "connected_to_app,created_at,download_url,host,name,parent,parent.created_by,parent.name,parent.resource_subtype,permanent_url,resource_subtype,size,view_url";

/// Asana API client authenticated with a personal access token
pub struct AsanaClient {
    client: Client,
    base_url: String,
    token: String,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl AsanaClient {
    /// Create a client from configuration; the token must be set
    pub fn new(config: &AsanaConfig) -> Result<Self> {
        let token = config
            .token
            .clone()
            .ok_or_else(|| Error::Config("Asana access token is not configured".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Url::parse(&config.base_url)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            page_size: config.page_size,
        })
    }

    /// Fetch every page of a list endpoint
    async fn get_all<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let url = Url::parse(&format!("{}/{}", self.base_url, resource))?;
        let limit = self.page_size.to_string();
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(url.clone())
                .bearer_auth(&self.token)
                .query(params)
                .query(&[("limit", limit.as_str())]);
            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset.as_str())]);
            }

            debug!("GET /{} (offset: {:?})", resource, offset);
            let response = request.send().await?;
            let page: Page<T> = match response.status() {
                status if status.is_success() => response.json().await?,
                status => return Err(api_error(status, response.text().await.unwrap_or_default())),
            };

            records.extend(page.data);
            match page.next_page {
                Some(next) => offset = Some(next.offset),
                None => break,
            }
        }

        debug!("Fetched {} records from /{}", records.len(), resource);
        Ok(records)
    }
}

fn api_error(status: StatusCode, body: String) -> Error {
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.errors.into_iter().next())
        .map(|detail| detail.message)
        .unwrap_or(body);
    Error::Api { status, message }
}

#[async_trait]
impl WorkApi for AsanaClient {
    async fn projects(&self, workspace: &str) -> Result<Vec<Project>> {
        self.get_all("projects", &[("workspace", workspace)]).await
    }

    async fn tasks_for_project(&self, project_gid: &str) -> Result<Vec<Task>> {
        self.get_all(
            "tasks",
            &[("project", project_gid), ("opt_fields", TASK_FIELDS)],
        )
        .await
    }

    async fn attachments_for(&self, parent_gid: &str) -> Result<Vec<Attachment>> {
        self.get_all(
            "attachments",
            &[("parent", parent_gid), ("opt_fields", ATTACHMENT_FIELDS)],
        )
        .await
    }
}
