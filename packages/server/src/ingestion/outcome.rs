use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Publication state of a portfolio item or blog post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Published,
    NeedsAttention,
}

impl ContentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::NeedsAttention => "needs_attention",
        }
    }
}

/// One auxiliary step that failed without aborting the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubFailure {
    /// Pipeline step, e.g. `screenshot` or `inline_image`.
    pub stage: &'static str,
    /// URL or object key the step was working on.
    pub target: String,
    pub reason: String,
}

/// Accumulated partial failures of one ingestion request.
#[derive(Debug, Clone, Default)]
pub struct IngestionOutcome {
    failures: Vec<SubFailure>,
}

impl IngestionOutcome {
    /// Keep the value of a successful step, or log and record its failure.
    pub fn absorb<T, E: Display>(
        &mut self,
        stage: &'static str,
        target: &str,
        result: Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(stage, url = target, error = %e, "Ingestion step failed");
                self.failures.push(SubFailure {
                    stage,
                    target: target.to_string(),
                    reason: e.to_string(),
                });
                None
            }
        }
    }

    pub fn needs_attention(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures(&self) -> &[SubFailure] {
        &self.failures
    }

    /// `requested`, unless any step failed.
    pub fn status(&self, requested: ContentStatus) -> ContentStatus {
        if self.needs_attention() {
            ContentStatus::NeedsAttention
        } else {
            requested
        }
    }

    /// Summary stored as the audit entry detail.
    pub fn audit_detail(&self) -> Value {
        json!({
            "needsAttention": self.needs_attention(),
            "failures": self.failures,
        })
    }
}
