//! Inspection tasks and checklist templates.

use serde::{Deserialize, Serialize};

use super::ChecklistItem;

/// An inspection task that operators execute as rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task identifier.
    pub id: String,
    /// Sector (area) the task covers.
    pub sector: String,
    /// Short title.
    pub title: String,
    /// External ticket reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    /// Longer description.
    #[serde(default)]
    pub description: String,
    /// Name of the responsible party.
    pub responsible: String,
    /// Items the operator must go through.
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    /// Creation time, milliseconds since the epoch.
    pub created_at: i64,
}

impl Task {
    /// Create a task with a fresh id and an empty checklist.
    #[must_use]
    pub fn new(
        sector: impl Into<String>,
        title: impl Into<String>,
        responsible: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            sector: sector.into(),
            title: title.into(),
            ticket_id: None,
            description: String::new(),
            responsible: responsible.into(),
            checklist: Vec::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Copy this task under a new id, marking the title as a copy.
    #[must_use]
    pub fn duplicate(&self, now_ms: i64) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            title: format!("{} (Copy)", self.title),
            created_at: now_ms,
            ..self.clone()
        }
    }
}

/// A reusable list of checklist labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    /// Template identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Item labels, in order.
    pub items: Vec<String>,
}

impl ChecklistTemplate {
    /// Create a template with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.into(),
            items,
        }
    }

    /// Build an unchecked checklist from the template labels.
    #[must_use]
    pub fn instantiate(&self) -> Vec<ChecklistItem> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, label)| ChecklistItem::new(format!("item-{}", i + 1), label.clone()))
            .collect()
    }
}
