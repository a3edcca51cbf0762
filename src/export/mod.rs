//! Export of Asana projects, tasks and attachments to disk
//!
//! Layout under the output directory:
//!
//! ```text
//! <project-slug>-<gid>/
//!     tasks.json            every task of the project, as returned by the API
//!     attachments.json      project-level attachment metadata
//!     tasks/<task-slug>-<gid>/
//!         <task-slug>-<gid>.json
//!         <task-slug>-<gid>.html
//!         attachments/<attachment-gid>-<name>
//! export-summary.json
//! ```
//!
//! Projects, tasks and attachments are each fanned out through a
//! [`BoundedMapper`] with their own concurrency limit.

pub mod download;
pub mod progress;
pub mod render;
pub mod slug;

pub use download::{Downloader, HttpDownloader};
pub use progress::ExportProgress;
pub use render::{to_pretty_json, PageRenderer};
pub use slug::{record_dir_name, sanitize_file_name, slugify};

use crate::asana::{Attachment, Project, Task, WorkApi};
use crate::concurrency::BoundedMapper;
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

pub const SUMMARY_FILE: &str = "export-summary.json";

/// What happened to one attachment of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttachmentOutcome {
    /// Stored locally
    Downloaded { gid: String, path: PathBuf },
    /// Hosted outside Asana; only the name is recorded
    External { gid: String, name: String },
    /// No download URL and not external
    Skipped { gid: String },
}

#[derive(Debug, Clone)]
pub struct TaskExport {
    pub gid: String,
    pub dir: PathBuf,
    pub attachments: Vec<AttachmentOutcome>,
}

#[derive(Debug, Clone)]
pub struct ProjectExport {
    pub project: Project,
    pub dir: PathBuf,
    pub tasks: Vec<TaskExport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedProject {
    pub gid: String,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub workspace: String,
    pub exported_at: DateTime<Utc>,
    pub projects: usize,
    pub tasks: usize,
    pub attachments_downloaded: usize,
    pub attachments_external: usize,
    pub failed_projects: Vec<FailedProject>,
}

impl ExportSummary {
    fn from_results(
        workspace: &str,
        results: Vec<std::result::Result<ProjectExport, FailedProject>>,
    ) -> Self {
        let mut summary = Self {
            workspace: workspace.to_string(),
            exported_at: Utc::now(),
            projects: 0,
            tasks: 0,
            attachments_downloaded: 0,
            attachments_external: 0,
            failed_projects: Vec::new(),
        };

        for result in results {
            match result {
                Ok(project) => {
                    summary.projects += 1;
                    summary.tasks += project.tasks.len();
                    for outcome in project.tasks.iter().flat_map(|t| &t.attachments) {
                        match outcome {
                            AttachmentOutcome::Downloaded { .. } => {
                                summary.attachments_downloaded += 1
                            }
                            AttachmentOutcome::External { .. } => {
                                summary.attachments_external += 1
                            }
                            AttachmentOutcome::Skipped { .. } => {}
                        }
                    }
                }
                Err(failed) => summary.failed_projects.push(failed),
            }
        }

        summary.failed_projects.sort_by(|a, b| a.gid.cmp(&b.gid));
        summary
    }

    pub fn is_complete(&self) -> bool {
        self.failed_projects.is_empty()
    }
}

/// Writes a workspace's projects to disk
pub struct Exporter<A, D> {
    api: A,
    downloader: D,
    renderer: PageRenderer,
    config: ExportConfig,
    progress: ExportProgress,
}

impl<A: WorkApi, D: Downloader> Exporter<A, D> {
    pub fn new(api: A, downloader: D, config: ExportConfig) -> Result<Self> {
        let progress = ExportProgress::new(config.show_progress);
        Ok(Self {
            api,
            downloader,
            renderer: PageRenderer::new()?,
            config,
            progress,
        })
    }

    /// Export every project of a workspace.
    ///
    /// A project that fails is logged and listed in the summary; the other
    /// projects are still exported.
    pub async fn export_workspace(&self, workspace: &str) -> Result<ExportSummary> {
        let projects = self.api.projects(workspace).await?;
        info!(
            "Exporting {} projects from workspace {}",
            projects.len(),
            workspace
        );
        create_dir(&self.config.output_dir).await?;

        let mapper = BoundedMapper::new(self.config.project_concurrency);
        let results = mapper
            .map(projects, |project| async move {
                let outcome = match self.export_project(&project).await {
                    Ok(export) => Ok(export),
                    Err(err) => {
                        warn!("Project {} ({}) failed: {}", project.name, project.gid, err);
                        Err(FailedProject {
                            gid: project.gid,
                            name: project.name,
                            error: err.to_string(),
                        })
                    }
                };
                Ok::<_, Error>(outcome)
            })
            .await?;

        let summary = ExportSummary::from_results(workspace, results);
        let summary_path = self.config.output_dir.join(SUMMARY_FILE);
        write_file(&summary_path, to_pretty_json(&summary)?).await?;
        self.progress.finish(format!(
            "{} projects, {} tasks",
            summary.projects, summary.tasks
        ));

        info!(
            "Export finished: {} projects, {} tasks, {} attachments downloaded, {} failed projects",
            summary.projects,
            summary.tasks,
            summary.attachments_downloaded,
            summary.failed_projects.len()
        );
        Ok(summary)
    }

    /// Export one project: its task list, attachment metadata and every task
    pub async fn export_project(&self, project: &Project) -> Result<ProjectExport> {
        info!("Exporting project {} ({})", project.name, project.gid);
        self.progress.set_project(&project.name);

        let tasks = self.api.tasks_for_project(&project.gid).await?;
        info!("Fetched {} tasks for project {}", tasks.len(), project.gid);
        let attachments = self.api.attachments_for(&project.gid).await?;
        debug!("Fetched {} project attachments", attachments.len());

        let project_dir = self
            .config
            .output_dir
            .join(record_dir_name(&project.name, &project.gid));
        let tasks_dir = project_dir.join("tasks");
        create_dir(&tasks_dir).await?;
        write_file(&project_dir.join("tasks.json"), to_pretty_json(&tasks)?).await?;
        write_file(
            &project_dir.join("attachments.json"),
            to_pretty_json(&attachments)?,
        )
        .await?;

        self.progress.add_tasks(tasks.len());
        let mapper = BoundedMapper::new(self.config.task_concurrency);
        let exported = mapper
            .map(tasks, |task| {
                let tasks_dir = &tasks_dir;
                async move {
                    let export = self.export_task(tasks_dir, project, &task).await?;
                    self.progress.task_done();
                    Ok::<_, Error>(export)
                }
            })
            .await?;

        info!("Project {} completed ({} tasks)", project.gid, exported.len());
        Ok(ProjectExport {
            project: project.clone(),
            dir: project_dir,
            tasks: exported,
        })
    }

    /// Export one task: attachments, raw JSON and the HTML page
    pub async fn export_task(
        &self,
        tasks_dir: &Path,
        project: &Project,
        task: &Task,
    ) -> Result<TaskExport> {
        let attachments = self.api.attachments_for(&task.gid).await?;
        debug!("Fetched {} attachments for task {}", attachments.len(), task.gid);

        let dir_name = record_dir_name(&task.name, &task.gid);
        let task_dir = tasks_dir.join(&dir_name);
        let attachments_dir = task_dir.join("attachments");
        create_dir(&attachments_dir).await?;

        let mapper = BoundedMapper::new(self.config.attachment_concurrency);
        let mut outcomes = mapper
            .map(attachments.iter(), |attachment| {
                let attachments_dir = &attachments_dir;
                async move { self.export_attachment(attachments_dir, attachment).await }
            })
            .await?;
        // Completion order is arbitrary; keep the HTML dump stable
        outcomes.sort_by(|a, b| outcome_gid(a).cmp(outcome_gid(b)));

        write_file(&task_dir.join(format!("{dir_name}.json")), to_pretty_json(task)?).await?;
        let html = self.renderer.render_task(project, task, &outcomes, &attachments)?;
        write_file(&task_dir.join(format!("{dir_name}.html")), html).await?;

        debug!("Exported task {} to {}", task.gid, task_dir.display());
        Ok(TaskExport {
            gid: task.gid.clone(),
            dir: task_dir,
            attachments: outcomes,
        })
    }

    async fn export_attachment(
        &self,
        dir: &Path,
        attachment: &Attachment,
    ) -> Result<AttachmentOutcome> {
        if let Some(url) = &attachment.download_url {
            let file_name = format!(
                "{}-{}",
                attachment.gid,
                sanitize_file_name(&attachment.name)
            );
            let path = dir.join(file_name);
            self.downloader.download(url, &path).await?;
            info!("Downloaded attachment {}", path.display());
            Ok(AttachmentOutcome::Downloaded {
                gid: attachment.gid.clone(),
                path,
            })
        } else if attachment.is_external() {
            info!("External attachment {}", attachment.name);
            Ok(AttachmentOutcome::External {
                gid: attachment.gid.clone(),
                name: attachment.name.clone(),
            })
        } else {
            debug!("Attachment {} has no download URL, skipping", attachment.gid);
            Ok(AttachmentOutcome::Skipped {
                gid: attachment.gid.clone(),
            })
        }
    }
}

fn outcome_gid(outcome: &AttachmentOutcome) -> &str {
    match outcome {
        AttachmentOutcome::Downloaded { gid, .. }
        | AttachmentOutcome::External { gid, .. }
        | AttachmentOutcome::Skipped { gid } => gid,
    }
}

async fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| Error::io_at(path, e))
}

async fn write_file(path: &Path, contents: String) -> Result<()> {
    fs::write(path, contents)
        .await
        .map_err(|e| Error::io_at(path, e))
}
