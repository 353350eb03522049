//! Display summary of the final checklist.

use serde::Serialize;

use crate::backend::types::{ChecklistCategory, FinalChecklist};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Complete,
    InProgress,
    Pending,
}

impl CompletionStatus {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            CompletionStatus::Complete
        } else if percentage > 0.0 {
            CompletionStatus::InProgress
        } else {
            CompletionStatus::Pending
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompletionStatus::Complete => "complete",
            CompletionStatus::InProgress => "in_progress",
            CompletionStatus::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRow {
    pub name: String,
    pub completion_percentage: f64,
    pub completed_items: u32,
    pub total_items: u32,
    pub status: CompletionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsSummary {
    pub completion_percentage: f64,
    pub completed_items: u32,
    pub total_items: u32,
    pub pending_items: u32,
    pub critical_items: u32,
    pub status: CompletionStatus,
    pub categories: Vec<CategoryRow>,
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn category_row(category: &ChecklistCategory) -> CategoryRow {
    let completion_percentage = clamp_percentage(category.completion_percentage);
    CategoryRow {
        name: category.name.clone(),
        completion_percentage,
        completed_items: category.completed_items,
        total_items: category.total_items,
        status: CompletionStatus::from_percentage(completion_percentage),
    }
}

pub fn summarize(checklist: &FinalChecklist) -> ResultsSummary {
    let completion_percentage = clamp_percentage(checklist.overall_completion);
    ResultsSummary {
        completion_percentage,
        completed_items: checklist.completed_items,
        total_items: checklist.total_items,
        pending_items: checklist.total_items.saturating_sub(checklist.completed_items),
        critical_items: checklist.critical_items,
        status: CompletionStatus::from_percentage(completion_percentage),
        categories: checklist.categories.iter().map(category_row).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_of_partial_checklist() {
        let checklist: FinalChecklist = serde_json::from_value(json!({
            "overall_completion": 62.5,
            "completed_items": 5,
            "total_items": 8,
            "critical_items": 2,
            "categories": [
                {"name": "Accesibilidad", "completion_percentage": 100.0, "completed_items": 3, "total_items": 3},
                {"name": "Protección contra incendios", "completion_percentage": 40.0, "completed_items": 2, "total_items": 5},
                {"name": "Ventilación", "completion_percentage": 0.0}
            ]
        }))
        .unwrap();

        let summary = summarize(&checklist);
        assert_eq!(summary.status, CompletionStatus::InProgress);
        assert_eq!(summary.pending_items, 3);
        assert_eq!(summary.critical_items, 2);
        let statuses: Vec<&str> = summary.categories.iter().map(|c| c.status.label()).collect();
        assert_eq!(statuses, vec!["complete", "in_progress", "pending"]);
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(CompletionStatus::from_percentage(100.0), CompletionStatus::Complete);
        assert_eq!(CompletionStatus::from_percentage(0.1), CompletionStatus::InProgress);
        assert_eq!(CompletionStatus::from_percentage(0.0), CompletionStatus::Pending);
        assert_eq!(clamp_percentage(f64::NAN), 0.0);
        assert_eq!(clamp_percentage(140.0), 100.0);
    }
}
