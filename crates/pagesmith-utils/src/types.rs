use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Round of a unit of work.
///
/// Round 1 creates the repository and its first generated site; Round 2 revises
/// the files already published for the same `(task, nonce)` pair.
///
/// # Example
///
/// ```rust
/// use pagesmith_utils::types::Round;
///
/// assert_eq!(Round::from_number(1), Some(Round::Create));
/// assert_eq!(Round::from_number(2), Some(Round::Revise));
/// assert_eq!(Round::from_number(3), None);
/// assert_eq!(Round::Revise.number(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Round {
    /// Round 1: create repository, generate, publish, enable hosting, notify.
    Create,
    /// Round 2: fetch published files, regenerate with context, publish, notify.
    Revise,
}

impl Round {
    /// Map the wire round number onto a known round.
    #[must_use]
    pub const fn from_number(number: u32) -> Option<Self> {
        match number {
            1 => Some(Self::Create),
            2 => Some(Self::Revise),
            _ => None,
        }
    }

    /// Wire number of this round.
    #[must_use]
    pub const fn number(&self) -> u32 {
        match self {
            Self::Create => 1,
            Self::Revise => 2,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Round {}", self.number())
    }
}

/// One evaluation criterion attached to a task.
///
/// Callers send either a plain sentence or a structured descriptor carrying a
/// brief and a list of executable check snippets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Check {
    /// Free-text criterion.
    Text(String),
    /// Structured criterion with executable snippets.
    Structured {
        brief: String,
        #[serde(default, alias = "checks")]
        js: Vec<String>,
    },
}

impl Check {
    /// Human-readable description of the criterion.
    #[must_use]
    pub fn brief(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Structured { brief, .. } => brief,
        }
    }

    /// Executable snippets, empty for free-text checks.
    #[must_use]
    pub fn snippets(&self) -> &[String] {
        match self {
            Self::Text(_) => &[],
            Self::Structured { js, .. } => js,
        }
    }
}

/// Attachment supplied with a task: a name plus an http(s) URL or a data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// Inbound task request as received by the gateway.
///
/// Immutable once received. The `(task, nonce)` pair identifies the unit of work
/// and derives the target repository name.
#[derive(Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    #[serde(default)]
    pub email: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub task: String,
    /// Callers send either a string or a bare number.
    #[serde(alias = "nounce", deserialize_with = "string_or_number")]
    pub nonce: String,
    pub round: u32,
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub checks: Vec<Check>,
    #[serde(default)]
    pub evaluation_url: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl TaskRequest {
    /// Repository name for this unit of work, stable across rounds.
    ///
    /// ```rust
    /// # use pagesmith_utils::types::TaskRequest;
    /// let req: TaskRequest = serde_json::from_value(serde_json::json!({
    ///     "secret": "s", "task": "calc", "nonce": "7", "round": 1
    /// })).unwrap();
    /// assert_eq!(req.repo_name(), "calc_7");
    /// ```
    #[must_use]
    pub fn repo_name(&self) -> String {
        format!("{}_{}", self.task, self.nonce)
    }

    /// Known round for this request, `None` for unrecognized round numbers.
    #[must_use]
    pub fn round_kind(&self) -> Option<Round> {
        Round::from_number(self.round)
    }

    /// Callback URL, treating an empty string as absent.
    #[must_use]
    pub fn callback_url(&self) -> Option<&str> {
        self.evaluation_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

// Hand-written so the shared secret never reaches a log line.
impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("email", &self.email)
            .field("secret", &"[REDACTED]")
            .field("task", &self.task)
            .field("nonce", &self.nonce)
            .field("round", &self.round)
            .field("brief", &self.brief)
            .field("checks", &self.checks.len())
            .field("evaluation_url", &self.evaluation_url)
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

/// Content of a generated or fetched file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    Binary(Vec<u8>),
}

impl FileContent {
    /// Classify raw bytes: valid UTF-8 becomes text, anything else stays binary.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::Text(text),
            Err(err) => Self::Binary(err.into_bytes()),
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for FileContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for FileContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A single file destined for (or read from) the remote content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: FileContent,
}

impl GeneratedFile {
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<FileContent>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Ordered set of files keyed by path.
///
/// Paths are unique; inserting an existing path replaces its content but keeps
/// the original position, so logging and notification order follow the order in
/// which paths were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: Vec<GeneratedFile>,
}

impl FileSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file. Returns `true` when the path was new.
    pub fn insert(&mut self, file: GeneratedFile) -> bool {
        if let Some(existing) = self.files.iter_mut().find(|f| f.path == file.path) {
            existing.content = file.content;
            false
        } else {
            self.files.push(file);
            true
        }
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneratedFile> {
        self.files.iter()
    }

    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<GeneratedFile> for FileSet {
    fn from_iter<I: IntoIterator<Item = GeneratedFile>>(iter: I) -> Self {
        let mut set = Self::new();
        for file in iter {
            set.insert(file);
        }
        set
    }
}

impl IntoIterator for FileSet {
    type Item = GeneratedFile;
    type IntoIter = std::vec::IntoIter<GeneratedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a GeneratedFile;
    type IntoIter = std::slice::Iter<'a, GeneratedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Payload posted to the evaluation callback once a round has published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}
