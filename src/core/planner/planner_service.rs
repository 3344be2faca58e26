// Planner domain logic.
//
// The core owns the domain models and the `GraphClient` trait; the infra
// layer maps Microsoft Graph JSON into these types. Everything here is
// independent of Discord and of HTTP, which keeps projection and status
// classification unit-testable.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::mappings::MappingTables;

/// Shown whenever a bucket id has no entry in the mapping table.
pub const UNKNOWN_BUCKET: &str = "Unknown Bucket";
/// Shown whenever a Graph user id has no display-name entry.
pub const UNKNOWN_USER: &str = "Unknown User";
/// Shown when a task carries no creation timestamp.
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// Errors raised by the Graph integration.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("token request failed: {0}")]
    Token(String),
    #[error("Graph API error: {0}")]
    Api(String),
}

/// A user from the Microsoft directory, as listed by `/users`.
#[derive(Debug, Clone)]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: String,
    pub mail: Option<String>,
}

/// A Planner task as fetched from Graph, before any name resolution.
#[derive(Debug, Clone)]
pub struct PlannerTask {
    pub title: String,
    pub percent_complete: i64,
    pub bucket_id: Option<String>,
    pub created_by_user_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    /// Graph user ids the task is assigned to.
    pub assignee_ids: Vec<String>,
}

/// Request payload for creating a task, assembled by the service.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub plan_id: String,
    pub bucket_id: String,
    pub title: String,
    pub assignee_user_id: String,
}

/// Task lifecycle status derived from the percent-complete field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// 0% is not started, 100% is completed, anything in between is in
    /// progress.
    pub fn from_percent(percent_complete: i64) -> Self {
        match percent_complete {
            0 => TaskStatus::NotStarted,
            100 => TaskStatus::Completed,
            _ => TaskStatus::InProgress,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Not Started",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }
}

/// A task projected into display fields, ready for rendering.
#[derive(Debug, Clone)]
pub struct TaskSummary {
    pub title: String,
    pub status: TaskStatus,
    pub bucket_name: String,
    pub creator_name: String,
    pub created_date: String,
    pub assignee_names: Vec<String>,
}

/// The seam to Microsoft Graph. Infra implements this over HTTP; tests
/// implement it with canned data.
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// First directory page: 25 users, sorted by display name.
    async fn list_users(&self) -> Result<Vec<DirectoryUser>, GraphError>;

    async fn user_tasks(&self, user_id: &str) -> Result<Vec<PlannerTask>, GraphError>;

    async fn bucket_tasks(&self, bucket_id: &str) -> Result<Vec<PlannerTask>, GraphError>;

    async fn create_task(&self, task: &NewTask) -> Result<(), GraphError>;
}

/// Fetches tasks and users through a `GraphClient` and projects tasks into
/// display summaries using the identity mapping tables.
pub struct PlannerService<C: GraphClient> {
    client: C,
    mappings: Arc<MappingTables>,
    plan_id: String,
}

impl<C: GraphClient> PlannerService<C> {
    pub fn new(client: C, mappings: Arc<MappingTables>, plan_id: String) -> Self {
        Self {
            client,
            mappings,
            plan_id,
        }
    }

    pub async fn directory_users(&self) -> Result<Vec<DirectoryUser>, GraphError> {
        self.client.list_users().await
    }

    pub async fn tasks_for_user(&self, graph_user_id: &str) -> Result<Vec<TaskSummary>, GraphError> {
        let tasks = self.client.user_tasks(graph_user_id).await?;
        Ok(tasks.into_iter().map(|t| self.summarize(t)).collect())
    }

    pub async fn tasks_for_bucket(&self, bucket_id: &str) -> Result<Vec<TaskSummary>, GraphError> {
        let tasks = self.client.bucket_tasks(bucket_id).await?;
        Ok(tasks.into_iter().map(|t| self.summarize(t)).collect())
    }

    /// Create a task in the configured plan, assigned to one user.
    pub async fn assign_task(
        &self,
        graph_user_id: &str,
        bucket_id: &str,
        title: &str,
    ) -> Result<(), GraphError> {
        let task = NewTask {
            plan_id: self.plan_id.clone(),
            bucket_id: bucket_id.to_string(),
            title: title.to_string(),
            assignee_user_id: graph_user_id.to_string(),
        };
        self.client.create_task(&task).await
    }

    /// Resolve foreign identifiers to display fields, falling back to
    /// placeholders when a mapping entry is absent.
    fn summarize(&self, task: PlannerTask) -> TaskSummary {
        let status = TaskStatus::from_percent(task.percent_complete);

        let bucket_name = task
            .bucket_id
            .as_deref()
            .and_then(|id| self.mappings.bucket_name(id))
            .unwrap_or(UNKNOWN_BUCKET)
            .to_string();

        let creator_name = task
            .created_by_user_id
            .as_deref()
            .and_then(|id| self.mappings.user_name(id))
            .unwrap_or(UNKNOWN_USER)
            .to_string();

        let created_date = task
            .created_at
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_string());

        let assignee_names = task
            .assignee_ids
            .iter()
            .map(|id| {
                self.mappings
                    .user_name(id)
                    .unwrap_or(UNKNOWN_USER)
                    .to_string()
            })
            .collect();

        TaskSummary {
            title: task.title,
            status,
            bucket_name,
            creator_name,
            created_date,
            assignee_names,
        }
    }
}

/// Keep only summaries matching the requested status; `None` keeps all.
pub fn filter_by_status(
    summaries: Vec<TaskSummary>,
    status: Option<TaskStatus>,
) -> Vec<TaskSummary> {
    match status {
        None => summaries,
        Some(wanted) => summaries
            .into_iter()
            .filter(|s| s.status == wanted)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingConfig;
    use chrono::TimeZone;
    use std::collections::HashMap;

    struct StubClient {
        tasks: Vec<PlannerTask>,
    }

    #[async_trait]
    impl GraphClient for StubClient {
        async fn list_users(&self) -> Result<Vec<DirectoryUser>, GraphError> {
            Ok(Vec::new())
        }

        async fn user_tasks(&self, _: &str) -> Result<Vec<PlannerTask>, GraphError> {
            Ok(self.tasks.clone())
        }

        async fn bucket_tasks(&self, _: &str) -> Result<Vec<PlannerTask>, GraphError> {
            Ok(self.tasks.clone())
        }

        async fn create_task(&self, _: &NewTask) -> Result<(), GraphError> {
            Ok(())
        }
    }

    fn make_mappings() -> Arc<MappingTables> {
        let config = MappingConfig {
            discord_id_mapping: HashMap::new(),
            bucket_id_to_name_mapping: HashMap::from([(
                "bucket-1".to_string(),
                "Backlog".to_string(),
            )]),
            user_id_to_name_mapping: HashMap::from([
                ("graph-a".to_string(), "Alice".to_string()),
                ("graph-b".to_string(), "Bob".to_string()),
            ]),
            discord_channel_mapping: HashMap::new(),
        };
        Arc::new(MappingTables::from_config(&config))
    }

    fn make_task(percent: i64) -> PlannerTask {
        PlannerTask {
            title: "Write report".to_string(),
            percent_complete: percent,
            bucket_id: Some("bucket-1".to_string()),
            created_by_user_id: Some("graph-a".to_string()),
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()),
            assignee_ids: vec!["graph-b".to_string()],
        }
    }

    fn make_service(tasks: Vec<PlannerTask>) -> PlannerService<StubClient> {
        PlannerService::new(
            StubClient { tasks },
            make_mappings(),
            "plan-1".to_string(),
        )
    }

    #[test]
    fn status_classification_boundaries() {
        assert_eq!(TaskStatus::from_percent(0), TaskStatus::NotStarted);
        assert_eq!(TaskStatus::from_percent(100), TaskStatus::Completed);
        assert_eq!(TaskStatus::from_percent(1), TaskStatus::InProgress);
        assert_eq!(TaskStatus::from_percent(50), TaskStatus::InProgress);
        assert_eq!(TaskStatus::from_percent(99), TaskStatus::InProgress);
    }

    #[test]
    fn status_labels() {
        assert_eq!(TaskStatus::NotStarted.label(), "Not Started");
        assert_eq!(TaskStatus::InProgress.label(), "In Progress");
        assert_eq!(TaskStatus::Completed.label(), "Completed");
    }

    #[tokio::test]
    async fn summaries_resolve_names_and_dates() {
        let service = make_service(vec![make_task(0)]);

        let summaries = service.tasks_for_user("graph-b").await.unwrap();
        assert_eq!(summaries.len(), 1);

        let summary = &summaries[0];
        assert_eq!(summary.title, "Write report");
        assert_eq!(summary.status, TaskStatus::NotStarted);
        assert_eq!(summary.bucket_name, "Backlog");
        assert_eq!(summary.creator_name, "Alice");
        assert_eq!(summary.created_date, "2024-03-15");
        assert_eq!(summary.assignee_names, vec!["Bob".to_string()]);
    }

    #[tokio::test]
    async fn summaries_fall_back_to_placeholders() {
        let task = PlannerTask {
            title: "Orphan task".to_string(),
            percent_complete: 0,
            bucket_id: Some("bucket-unmapped".to_string()),
            created_by_user_id: None,
            created_at: None,
            assignee_ids: vec!["graph-unmapped".to_string()],
        };
        let service = make_service(vec![task]);

        let summaries = service.tasks_for_bucket("bucket-unmapped").await.unwrap();
        let summary = &summaries[0];

        assert_eq!(summary.bucket_name, UNKNOWN_BUCKET);
        assert_eq!(summary.creator_name, UNKNOWN_USER);
        assert_eq!(summary.created_date, UNKNOWN_DATE);
        assert_eq!(summary.assignee_names, vec![UNKNOWN_USER.to_string()]);
    }

    #[tokio::test]
    async fn filter_keeps_matching_statuses_only() {
        let service = make_service(vec![make_task(0), make_task(50), make_task(100)]);
        let summaries = service.tasks_for_user("graph-b").await.unwrap();

        let completed = filter_by_status(summaries.clone(), Some(TaskStatus::Completed));
        assert_eq!(completed.len(), 1);
        assert!(completed.iter().all(|s| s.status == TaskStatus::Completed));

        let in_progress = filter_by_status(summaries.clone(), Some(TaskStatus::InProgress));
        assert_eq!(in_progress.len(), 1);

        let unfiltered = filter_by_status(summaries, None);
        assert_eq!(unfiltered.len(), 3);
    }
}
