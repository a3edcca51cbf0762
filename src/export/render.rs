//! HTML and JSON rendering of exported tasks

use super::AttachmentOutcome;
use crate::asana::{Attachment, Project, Task};
use crate::error::Result;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tera::{Context, Tera};

const TASK_TEMPLATE_NAME: &str = "task.html";

const TASK_TEMPLATE: &str = r#"<html>
  <head>
    <style>
      * {
        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif, "Apple Color Emoji", "Segoe UI Emoji", "Segoe UI Symbol";
      }
      main {
        max-width: 60rem;
        margin: 0 auto;
      }
    </style>
    <title>{{ title }}</title>
  </head>
  <body>
    <main>
      <h1>{{ title }}</h1>
      <p>Project: {{ project }}</p>
      <div>{{ notes | safe }}</div>
      <pre>{{ dump }}</pre>
    </main>
  </body>
</html>
"#;

/// Serialize with four-space indentation
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskDump<'a> {
    task: &'a Task,
    downloaded_attachments: &'a [AttachmentOutcome],
    attachments: &'a [Attachment],
}

/// Renders the standalone HTML page written next to each task's JSON
pub struct PageRenderer {
    tera: Tera,
}

impl PageRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(TASK_TEMPLATE_NAME, TASK_TEMPLATE)?;
        Ok(Self { tera })
    }

    /// Task name and project name are escaped. The task's rich-text notes
    /// are already HTML and are embedded as-is.
    pub fn render_task(
        &self,
        project: &Project,
        task: &Task,
        downloaded: &[AttachmentOutcome],
        attachments: &[Attachment],
    ) -> Result<String> {
        let dump = to_pretty_json(&TaskDump {
            task,
            downloaded_attachments: downloaded,
            attachments,
        })?;

        let mut context = Context::new();
        context.insert("title", &task.name);
        context.insert("project", &project.name);
        context.insert("notes", task.html_notes.as_deref().unwrap_or_default());
        context.insert("dump", &dump);

        Ok(self.tera.render(TASK_TEMPLATE_NAME, &context)?)
    }
}
