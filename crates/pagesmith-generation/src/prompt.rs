//! Prompt construction for site generation

use pagesmith_llm::Message;
use pagesmith_utils::types::{Attachment, Check, FileContent, FileSet, TaskRequest};
use crate::attachments::{render_attachment, truncate_chars};

/// Characters of each previously published file included in revise mode
pub const PREVIOUS_FILE_PREVIEW_CHARS: usize = 6_000;

/// System instruction fixing the response schema.
pub const SYSTEM_PROMPT: &str = "You are an expert web developer who builds complete, \
self-contained static websites that run on GitHub Pages without a build step. \
Respond with a single JSON object and nothing else, using exactly this schema: \
{\"files\": [{\"file_name\": \"<relative path>\", \"content\": \"<full file content>\"}]}. \
Always include index.html and a README.md that explains the project, how it meets \
each check, and its licence (MIT). Do not wrap the JSON in Markdown.";

/// Everything the generator needs for one call.
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    /// Unit of work, used for log correlation
    pub unit_of_work: String,
    pub brief: String,
    pub checks: Vec<Check>,
    pub attachments: Vec<Attachment>,
    /// Files currently published; switches the prompt to revise mode
    pub previous_files: Option<FileSet>,
}

impl GenerationRequest {
    /// Create-mode request for a task.
    #[must_use]
    pub fn from_task(task: &TaskRequest) -> Self {
        Self {
            unit_of_work: task.repo_name(),
            brief: task.brief.clone(),
            checks: task.checks.clone(),
            attachments: task.attachments.clone(),
            previous_files: None,
        }
    }

    /// Switch to revise mode with the currently published files.
    #[must_use]
    pub fn with_previous_files(mut self, files: FileSet) -> Self {
        self.previous_files = Some(files);
        self
    }

    #[must_use]
    pub fn is_revision(&self) -> bool {
        self.previous_files.is_some()
    }
}

/// Build the system and user messages for `request`.
#[must_use]
pub fn build_messages(request: &GenerationRequest) -> Vec<Message> {
    vec![
        Message::system(SYSTEM_PROMPT),
        Message::user(render_user_prompt(request)),
    ]
}

fn render_checks(checks: &[Check], out: &mut String) {
    for (index, check) in checks.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, check.brief()));
        for snippet in check.snippets() {
            out.push_str(&format!("   - `{}`\n", snippet));
        }
    }
}

fn render_previous_files(files: &FileSet, out: &mut String) {
    for file in files {
        match &file.content {
            FileContent::Text(text) => {
                out.push_str(&format!(
                    "### {}\n```\n{}\n```\n",
                    file.path,
                    truncate_chars(text, PREVIOUS_FILE_PREVIEW_CHARS)
                ));
            }
            FileContent::Binary(bytes) => {
                out.push_str(&format!(
                    "### {} (binary, {} bytes; keep as is)\n",
                    file.path,
                    bytes.len()
                ));
            }
        }
    }
}

/// Render the user prompt.
#[must_use]
pub fn render_user_prompt(request: &GenerationRequest) -> String {
    let mut out = String::new();

    match &request.previous_files {
        None => {
            out.push_str("Build a new static website for the following brief.\n\n");
        }
        Some(_) => {
            out.push_str(
                "Revise the existing static website so it satisfies the updated brief. \
                 Return every file that should change or be added, with full contents.\n\n",
            );
        }
    }

    out.push_str(&format!("## Brief\n{}\n\n", request.brief.trim()));

    if !request.checks.is_empty() {
        out.push_str("## Checks\nThe site will be evaluated against:\n");
        render_checks(&request.checks, &mut out);
        out.push('\n');
    }

    if !request.attachments.is_empty() {
        out.push_str("## Attachments\n");
        for attachment in &request.attachments {
            out.push_str(&format!("{}\n", render_attachment(attachment)));
        }
        out.push_str(
            "Embedded attachments are not published for you; inline or recreate any data \
             the site needs.\n\n",
        );
    }

    if let Some(files) = &request.previous_files {
        out.push_str("## Current files\n");
        if files.is_empty() {
            out.push_str("(none could be retrieved)\n");
        } else {
            render_previous_files(files, &mut out);
        }
        out.push('\n');
    }

    out.push_str("Respond only with the JSON object described in the instructions.");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesmith_llm::Role;
    use pagesmith_utils::types::GeneratedFile;

    fn request() -> GenerationRequest {
        GenerationRequest {
            unit_of_work: "calc_7".to_string(),
            brief: "Build a calculator".to_string(),
            checks: vec![
                Check::Text("Has a README".to_string()),
                Check::Structured {
                    brief: "Shows a result".to_string(),
                    js: vec!["document.querySelector('#result')".to_string()],
                },
            ],
            attachments: vec![Attachment {
                name: "notes.txt".to_string(),
                url: "data:text/plain,use%20big%20buttons".to_string(),
            }],
            previous_files: None,
        }
    }

    #[test]
    fn test_create_prompt_contents() {
        let prompt = render_user_prompt(&request());

        assert!(prompt.starts_with("Build a new static website"));
        assert!(prompt.contains("## Brief\nBuild a calculator"));
        assert!(prompt.contains("1. Has a README"));
        assert!(prompt.contains("2. Shows a result"));
        assert!(prompt.contains("`document.querySelector('#result')`"));
        assert!(prompt.contains("notes.txt (text/plain)"));
        assert!(!prompt.contains("## Current files"));
    }

    #[test]
    fn test_sections_are_line_separated() {
        let prompt = render_user_prompt(&request());

        assert!(prompt.contains(
            "## Brief\nBuild a calculator\n\n\
             ## Checks\nThe site will be evaluated against:\n\
             1. Has a README\n\
             2. Shows a result\n   - `document.querySelector('#result')`\n\n\
             ## Attachments\n"
        ));
        assert!(prompt.ends_with("described in the instructions."));
    }

    #[test]
    fn test_revise_prompt_previews_files() {
        let previous: FileSet = [
            GeneratedFile::new("index.html", "<h1>v1</h1>"),
            GeneratedFile::new("logo.png", FileContent::Binary(vec![0x89, 0x50, 0x4e])),
        ]
        .into_iter()
        .collect();
        let req = request().with_previous_files(previous);
        let prompt = render_user_prompt(&req);

        assert!(req.is_revision());
        assert!(prompt.starts_with("Revise the existing static website"));
        assert!(prompt.contains("### index.html\n```\n<h1>v1</h1>\n```"));
        assert!(prompt.contains("```\n### logo.png (binary, 3 bytes; keep as is)\n\n"));
    }

    #[test]
    fn test_build_messages_roles() {
        let messages = build_messages(&request());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("\"files\""));
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn test_from_task_copies_fields() {
        let task: TaskRequest = serde_json::from_value(serde_json::json!({
            "secret": "s", "task": "calc", "nonce": "7", "round": 1,
            "brief": "Make it", "checks": ["one"]
        }))
        .unwrap();
        let req = GenerationRequest::from_task(&task);
        assert_eq!(req.unit_of_work, "calc_7");
        assert_eq!(req.checks.len(), 1);
        assert!(!req.is_revision());
    }
}
