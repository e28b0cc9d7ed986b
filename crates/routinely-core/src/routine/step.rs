use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// One timed step of a routine. Read-only to the session engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineStep {
    pub id: String,
    /// Position among sibling steps. Unique, not necessarily contiguous.
    pub order: i64,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    /// Budgeted time for this step. Zero means no countdown.
    pub target_duration_secs: u64,
}

impl RoutineStep {
    pub fn new(id: impl Into<String>, order: i64, label: impl Into<String>, target_duration_secs: u64) -> Self {
        Self {
            id: id.into(),
            order,
            label: label.into(),
            icon: String::new(),
            target_duration_secs,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }
}

/// A routine definition as stored by a routine source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Routine {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<RoutineStep>,
}

impl Routine {
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: Vec<RoutineStep>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            steps,
        }
    }

    /// Return the routine with its steps ordered by `order`.
    ///
    /// Sources hand the engine an already-ordered sequence; the engine itself
    /// never re-sorts.
    pub fn sorted(mut self) -> Self {
        self.steps.sort_by_key(|s| s.order);
        self
    }

    pub fn total_budgeted_secs(&self) -> u64 {
        total_budgeted_secs(&self.steps)
    }

    /// Parse a routine definition file. `.json` files are read as JSON,
    /// anything else as TOML.
    ///
    /// # Errors
    /// `CoreError::Io` if the file cannot be read, `CoreError::Source` if its
    /// content is not a valid routine.
    pub fn from_path(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let routine = if is_json {
            Self::from_json_str(&content)?
        } else {
            Self::from_toml_str(&content)?
        };
        Ok(routine)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, SourceError> {
        let routine: Routine =
            toml::from_str(content).map_err(|e| SourceError::Invalid(e.to_string()))?;
        routine.validated()
    }

    pub fn from_json_str(content: &str) -> Result<Self, SourceError> {
        let routine: Routine =
            serde_json::from_str(content).map_err(|e| SourceError::Invalid(e.to_string()))?;
        routine.validated()
    }

    /// Reject definitions no session could be built from: empty ids,
    /// duplicate step ids or duplicate orders.
    fn validated(self) -> Result<Self, SourceError> {
        if self.id.trim().is_empty() {
            return Err(SourceError::Invalid("routine id is empty".into()));
        }
        {
            let mut ids = HashSet::new();
            let mut orders = HashSet::new();
            for step in &self.steps {
                if !ids.insert(step.id.as_str()) {
                    return Err(SourceError::Invalid(format!("duplicate step id '{}'", step.id)));
                }
                if !orders.insert(step.order) {
                    return Err(SourceError::Invalid(format!("duplicate step order {}", step.order)));
                }
            }
        }
        Ok(self.sorted())
    }
}

/// Sum of budgeted step durations, saturating.
pub(crate) fn total_budgeted_secs(steps: &[RoutineStep]) -> u64 {
    steps
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.target_duration_secs))
}
