//! Import of exported tasks into Fauna
//!
//! Task numbers are assigned across all files, in path order, before the
//! first record is written. Numbering therefore does not depend on the
//! import concurrency or on which writes finish first.

pub mod fauna;
pub mod files;
pub mod record;

pub use fauna::FaunaClient;
pub use files::{collect_task_files, load_task_list};
pub use record::{CreatedRecord, TaskRecord};

use crate::concurrency::BoundedMapper;
use crate::config::ImportConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

/// Destination for imported task records
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn create(&self, collection: &str, record: &TaskRecord) -> Result<CreatedRecord>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub files: usize,
    pub skipped_files: usize,
    pub records: usize,
}

pub struct Importer<S> {
    sink: S,
    config: ImportConfig,
}

impl<S: RecordSink> Importer<S> {
    pub fn new(sink: S, config: ImportConfig) -> Self {
        Self { sink, config }
    }

    /// Read every task file and build numbered records, without writing
    pub async fn prepare(&self) -> Result<(Vec<TaskRecord>, ImportSummary)> {
        let files = collect_task_files(&self.config.data_dir, self.config.recursive)?;
        let mut summary = ImportSummary::default();
        let mut records = Vec::new();

        for file in &files {
            info!("Reading {}", file.display());
            let Some(tasks) = load_task_list(file).await? else {
                summary.skipped_files += 1;
                continue;
            };
            summary.files += 1;
            for task in &tasks {
                let number = records.len() as u64;
                records.push(TaskRecord::from_exported(number, task)?);
            }
        }

        Ok((records, summary))
    }

    /// Import every task found under the data directory
    pub async fn import_dir(&self) -> Result<ImportSummary> {
        let (records, mut summary) = self.prepare().await?;
        info!(
            "Importing {} tasks from {} files into {}",
            records.len(),
            summary.files,
            self.config.collection
        );

        let collection = self.config.collection.as_str();
        let mapper = BoundedMapper::new(self.config.concurrency);
        let created = mapper
            .map(&records, |record| async move {
                let created = self.sink.create(collection, record).await?;
                info!(
                    "Created task #{} \"{}\" as {}",
                    record.task_number, record.title, created.reference
                );
                Ok::<_, Error>(created)
            })
            .await?;

        summary.records = created.len();
        info!("Import finished: {} records created", summary.records);
        Ok(summary)
    }
}
