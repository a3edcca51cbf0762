//! Asana work-management API access
//!
//! [`WorkApi`] is the seam the exporter talks through. [`AsanaClient`] is
//! the HTTP implementation; tests substitute in-memory implementations.

pub mod client;
pub mod models;

pub use client::AsanaClient;
pub use models::{Attachment, Project, Task};

use crate::error::Result;
use async_trait::async_trait;

/// Read access to projects, tasks and attachments.
///
/// Every method returns the complete list, following pagination as needed.
#[async_trait]
pub trait WorkApi: Send + Sync {
    /// Projects of a workspace
    async fn projects(&self, workspace: &str) -> Result<Vec<Project>>;

    /// Tasks of a project, with the full field selection
    async fn tasks_for_project(&self, project_gid: &str) -> Result<Vec<Task>>;

    /// Attachments of a project or task
    async fn attachments_for(&self, parent_gid: &str) -> Result<Vec<Attachment>>;
}
