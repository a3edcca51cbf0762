//! Common test utilities and helpers
#![allow(dead_code)]

use asana_migrate::asana::{Attachment, Project, Task, WorkApi};
use asana_migrate::error::{Error, Result};
use asana_migrate::export::Downloader;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Tracks how many operations overlap and the highest overlap seen
#[derive(Default)]
pub struct OverlapGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    started: AtomicUsize,
}

impl OverlapGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enter(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

pub fn task(gid: &str, name: &str) -> Task {
    serde_json::from_value(json!({
        "gid": gid,
        "name": name,
        "notes": format!("Notes for {name}"),
        "html_notes": format!("<body>Notes for {name}</body>"),
        "assignee": {"gid": "900", "name": "Jordan"},
        "projects": [{"gid": "1", "name": "Roadmap"}]
    }))
    .unwrap()
}

pub fn attachment(gid: &str, name: &str, download_url: Option<&str>, host: &str) -> Attachment {
    serde_json::from_value(json!({
        "gid": gid,
        "name": name,
        "download_url": download_url,
        "host": host
    }))
    .unwrap()
}

/// In-memory workspace keyed by gid
#[derive(Default)]
pub struct FakeWorkspace {
    pub projects: Vec<Project>,
    pub tasks: HashMap<String, Vec<Task>>,
    pub attachments: HashMap<String, Vec<Attachment>>,
    /// Projects whose task listing fails
    pub broken_projects: Vec<String>,
}

#[async_trait]
impl WorkApi for FakeWorkspace {
    async fn projects(&self, _workspace: &str) -> Result<Vec<Project>> {
        Ok(self.projects.clone())
    }

    async fn tasks_for_project(&self, project_gid: &str) -> Result<Vec<Task>> {
        if self.broken_projects.iter().any(|gid| gid == project_gid) {
            return Err(Error::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("tasks for {project_gid} unavailable"),
            });
        }
        Ok(self.tasks.get(project_gid).cloned().unwrap_or_default())
    }

    async fn attachments_for(&self, parent_gid: &str) -> Result<Vec<Attachment>> {
        Ok(self.attachments.get(parent_gid).cloned().unwrap_or_default())
    }
}

/// Writes the URL as file content and records overlap
pub struct FakeDownloader {
    pub gauge: Arc<OverlapGauge>,
    pub fail_urls: Vec<String>,
    pub downloaded: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn new() -> Self {
        Self {
            gauge: OverlapGauge::new(),
            fail_urls: Vec::new(),
            downloaded: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        self.gauge.enter();
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.gauge.exit();

        if self.fail_urls.iter().any(|u| u == url) {
            return Err(Error::Api {
                status: StatusCode::FORBIDDEN,
                message: format!("download of {url} failed"),
            });
        }

        tokio::fs::write(destination, url).await?;
        self.downloaded.lock().unwrap().push(url.to_string());
        Ok(url.len() as u64)
    }
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
