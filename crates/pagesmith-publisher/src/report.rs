use std::fmt;

/// What happened to one path during a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileResult {
    /// The path was new and a create commit was made
    Created { commit: String },
    /// The path existed and was overwritten using its marker
    Updated { commit: String },
    /// No commit was made for this path
    Failed { reason: String },
}

impl FileResult {
    #[must_use]
    pub fn commit(&self) -> Option<&str> {
        match self {
            Self::Created { commit } | Self::Updated { commit } => Some(commit),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: String,
    pub result: FileResult,
}

/// Per-path outcomes of a publish, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    outcomes: Vec<FileOutcome>,
}

impl PublishReport {
    pub(crate) fn push(&mut self, path: impl Into<String>, result: FileResult) {
        self.outcomes.push(FileOutcome {
            path: path.into(),
            result,
        });
    }

    #[must_use]
    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileResult> {
        self.outcomes
            .iter()
            .find(|o| o.path == path)
            .map(|o| &o.result)
    }

    /// True when every path was written.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| !o.result.is_failed())
    }

    #[must_use]
    pub fn failed_paths(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_failed())
            .map(|o| o.path.as_str())
            .collect()
    }

    #[must_use]
    pub fn created_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, FileResult::Created { .. }))
            .count()
    }

    #[must_use]
    pub fn updated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.result, FileResult::Updated { .. }))
            .count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_failed()).count()
    }

    /// Commit made by the last successful write.
    #[must_use]
    pub fn last_commit(&self) -> Option<&str> {
        self.outcomes.iter().rev().find_map(|o| o.result.commit())
    }
}

impl fmt::Display for PublishReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} failed",
            self.created_count(),
            self.updated_count(),
            self.failed_count()
        )
    }
}
