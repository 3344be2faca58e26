// Microsoft Graph client.
//
// Authenticates with the OAuth2 client-credentials flow against Entra ID
// and exposes only the calls the core layer needs: the directory listing,
// the two task reads, and task creation. The access token is cached for
// its lifetime and refreshed shortly before expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::planner::{DirectoryUser, GraphClient, GraphError, NewTask, PlannerTask};

const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
/// Refresh the token this long before it actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Directory page size for `/users`.
const USERS_PAGE_SIZE: &str = "25";

/// Response from the Entra ID token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Cached access token with expiration.
struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct GraphApiClient {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    base_url: String,
    cached_token: RwLock<Option<CachedToken>>,
}

impl GraphApiClient {
    pub fn new(tenant_id: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            client: Client::new(),
            token_url: format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                tenant_id
            ),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            base_url: GRAPH_BASE_URL.to_string(),
            cached_token: RwLock::new(None),
        }
    }

    /// Gets a valid access token, refreshing if necessary.
    async fn get_access_token(&self) -> Result<String, GraphError> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                    return Ok(token.token.clone());
                }
            }
        }

        let token_response = self.fetch_new_token().await?;

        let mut cached = self.cached_token.write().await;
        *cached = Some(CachedToken {
            token: token_response.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token_response.expires_in),
        });

        Ok(token_response.access_token)
    }

    /// Exchange the client credentials for a fresh access token.
    async fn fetch_new_token(&self) -> Result<TokenResponse, GraphError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", GRAPH_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| GraphError::Token(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GraphError::Token(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GraphError::Token(e.to_string()))
    }

    fn parse_datetime(value: Option<String>) -> Option<DateTime<Utc>> {
        value
            .as_deref()
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    fn map_user(api: ApiUser) -> Option<DirectoryUser> {
        let id = api.id?;
        Some(DirectoryUser {
            id,
            display_name: api.display_name.unwrap_or_else(|| "Unknown".to_string()),
            mail: api.mail,
        })
    }

    fn map_task(api: ApiTask) -> PlannerTask {
        PlannerTask {
            title: api.title.unwrap_or_else(|| "Untitled task".to_string()),
            percent_complete: api.percent_complete.unwrap_or(0),
            bucket_id: api.bucket_id,
            created_by_user_id: api.created_by.and_then(|c| c.user).and_then(|u| u.id),
            created_at: Self::parse_datetime(api.created_date_time),
            assignee_ids: api
                .assignments
                .map(|a| a.into_keys().collect())
                .unwrap_or_default(),
        }
    }

    async fn get_tasks(&self, url: String) -> Result<Vec<PlannerTask>, GraphError> {
        let token = self.get_access_token().await?;
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GraphError::Api(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GraphError::Api(format!(
                "Graph returned {} for {}: {}",
                status, url, body
            )));
        }

        let page: ApiCollection<ApiTask> = resp
            .json()
            .await
            .map_err(|e| GraphError::Api(e.to_string()))?;

        Ok(page.value.into_iter().map(Self::map_task).collect())
    }
}

#[async_trait]
impl GraphClient for GraphApiClient {
    async fn list_users(&self) -> Result<Vec<DirectoryUser>, GraphError> {
        let token = self.get_access_token().await?;
        let url = format!("{}/users", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("$select", "displayName,id,mail"),
                ("$top", USERS_PAGE_SIZE),
                ("$orderby", "displayName"),
            ])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| GraphError::Api(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(GraphError::Api(format!(
                "Graph returned {} for user listing: {}",
                status, body
            )));
        }

        let page: ApiCollection<ApiUser> = resp
            .json()
            .await
            .map_err(|e| GraphError::Api(e.to_string()))?;

        Ok(page.value.into_iter().filter_map(Self::map_user).collect())
    }

    async fn user_tasks(&self, user_id: &str) -> Result<Vec<PlannerTask>, GraphError> {
        self.get_tasks(format!("{}/users/{}/planner/tasks", self.base_url, user_id))
            .await
    }

    async fn bucket_tasks(&self, bucket_id: &str) -> Result<Vec<PlannerTask>, GraphError> {
        self.get_tasks(format!(
            "{}/planner/buckets/{}/tasks",
            self.base_url, bucket_id
        ))
        .await
    }

    async fn create_task(&self, task: &NewTask) -> Result<(), GraphError> {
        let token = self.get_access_token().await?;

        let body = ApiNewTask {
            plan_id: &task.plan_id,
            bucket_id: &task.bucket_id,
            title: &task.title,
            assignments: HashMap::from([(
                task.assignee_user_id.as_str(),
                ApiAssignment::default(),
            )]),
        };

        let url = format!("{}/planner/tasks", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| GraphError::Api(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(GraphError::Api(format!(
                "Graph returned {} for task creation: {}",
                status, text
            )));
        }

        Ok(())
    }
}

// =============================================================================
// GRAPH API WIRE MODELS
// =============================================================================

/// Graph wraps every listing in a `value` array.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiCollection<T> {
    #[serde(default)]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUser {
    id: Option<String>,
    display_name: Option<String>,
    mail: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiTask {
    title: Option<String>,
    percent_complete: Option<i64>,
    bucket_id: Option<String>,
    created_date_time: Option<String>,
    created_by: Option<ApiIdentitySet>,
    /// Keys are the assigned Graph user ids; the values carry Planner
    /// bookkeeping we don't use.
    assignments: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ApiIdentitySet {
    user: Option<ApiIdentity>,
}

#[derive(Debug, Deserialize)]
struct ApiIdentity {
    id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiNewTask<'a> {
    plan_id: &'a str,
    bucket_id: &'a str,
    title: &'a str,
    assignments: HashMap<&'a str, ApiAssignment>,
}

/// Planner requires the odata type tag and an order hint on every
/// assignment; " !" sorts the task at the top of the column.
#[derive(Debug, Serialize)]
struct ApiAssignment {
    #[serde(rename = "@odata.type")]
    odata_type: &'static str,
    #[serde(rename = "orderHint")]
    order_hint: &'static str,
}

impl Default for ApiAssignment {
    fn default() -> Self {
        Self {
            odata_type: "#microsoft.graph.plannerAssignment",
            order_hint: " !",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_user_listing_payload() {
        let json = r#"{
            "value": [
                { "id": "u-1", "displayName": "Alice", "mail": "alice@example.com" },
                { "id": "u-2", "displayName": null, "mail": null },
                { "displayName": "No id, dropped" }
            ]
        }"#;

        let page: ApiCollection<ApiUser> = serde_json::from_str(json).unwrap();
        let users: Vec<_> = page
            .value
            .into_iter()
            .filter_map(GraphApiClient::map_user)
            .collect();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].display_name, "Alice");
        assert_eq!(users[0].mail.as_deref(), Some("alice@example.com"));
        assert_eq!(users[1].display_name, "Unknown");
    }

    #[test]
    fn maps_task_payload() {
        let json = r##"{
            "title": "Write report",
            "percentComplete": 50,
            "bucketId": "bucket-1",
            "createdDateTime": "2024-03-15T09:30:00Z",
            "createdBy": { "user": { "id": "u-1" } },
            "assignments": {
                "u-2": { "@odata.type": "#microsoft.graph.plannerAssignment", "orderHint": " !" }
            }
        }"##;

        let api: ApiTask = serde_json::from_str(json).unwrap();
        let task = GraphApiClient::map_task(api);

        assert_eq!(task.title, "Write report");
        assert_eq!(task.percent_complete, 50);
        assert_eq!(task.bucket_id.as_deref(), Some("bucket-1"));
        assert_eq!(task.created_by_user_id.as_deref(), Some("u-1"));
        assert_eq!(task.assignee_ids, vec!["u-2".to_string()]);
        assert!(task.created_at.is_some());
    }

    #[test]
    fn sparse_task_payload_uses_defaults() {
        let api: ApiTask = serde_json::from_str("{}").unwrap();
        let task = GraphApiClient::map_task(api);

        assert_eq!(task.title, "Untitled task");
        assert_eq!(task.percent_complete, 0);
        assert!(task.bucket_id.is_none());
        assert!(task.created_by_user_id.is_none());
        assert!(task.created_at.is_none());
        assert!(task.assignee_ids.is_empty());
    }

    #[test]
    fn create_task_body_has_assignment_shape() {
        let body = ApiNewTask {
            plan_id: "plan-1",
            bucket_id: "bucket-1",
            title: "New task",
            assignments: HashMap::from([("u-1", ApiAssignment::default())]),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["planId"], "plan-1");
        assert_eq!(json["bucketId"], "bucket-1");
        assert_eq!(
            json["assignments"]["u-1"]["@odata.type"],
            "#microsoft.graph.plannerAssignment"
        );
        assert_eq!(json["assignments"]["u-1"]["orderHint"], " !");
    }
}
