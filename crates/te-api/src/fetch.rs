//! The fetch boundary and typed entity fetchers.
//!
//! Every failure (transport, non-2xx status, undecodable body) collapses into
//! `None` here. Each one is logged and counted in `toggl_api_errors_total`
//! under the first path segment of the request.

use reqwest::Method;
use serde::de::DeserializeOwned;

use te_core::{Identity, NamedEntity, TimeEntry, TimeRange};
use te_metrics::Metrics;

use crate::client::{ApiError, TogglApi};

/// Typed access to the API that never fails past this point.
#[derive(Debug)]
pub struct Fetcher<'a, A> {
    api: &'a A,
    metrics: &'a Metrics,
}

impl<'a, A: TogglApi> Fetcher<'a, A> {
    pub const fn new(api: &'a A, metrics: &'a Metrics) -> Self {
        Self { api, metrics }
    }

    /// Fetches `path` and decodes it as `T`, or returns `None` after
    /// recording the error.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Option<T> {
        let result = self
            .api
            .request(Method::GET, path, query)
            .await
            .and_then(|value| {
                serde_json::from_value(value)
                    .map_err(|err| ApiError::InvalidResponse(err.to_string()))
            });

        match result {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                let endpoint = endpoint_label(path);
                tracing::warn!(endpoint, path, error = %err, "Toggl API request failed");
                self.metrics.record_api_error(endpoint);
                None
            }
        }
    }

    /// The caller's identity.
    pub async fn me(&self) -> Option<Identity> {
        self.fetch("/me", &[]).await
    }

    /// The currently running entry. `None` covers both "no timer" and a
    /// failed request.
    pub async fn current_time_entry(&self) -> Option<TimeEntry> {
        self.fetch::<Option<TimeEntry>>("/me/time_entries/current", &[])
            .await
            .flatten()
    }

    pub async fn projects(&self, workspace_id: i64) -> Option<Vec<NamedEntity>> {
        self.fetch(&workspace_path(workspace_id, "projects"), &[])
            .await
    }

    pub async fn clients(&self, workspace_id: i64) -> Option<Vec<NamedEntity>> {
        self.fetch(&workspace_path(workspace_id, "clients"), &[])
            .await
    }

    pub async fn tags(&self, workspace_id: i64) -> Option<Vec<NamedEntity>> {
        self.fetch(&workspace_path(workspace_id, "tags"), &[]).await
    }

    pub async fn tasks(&self, workspace_id: i64) -> Option<Vec<NamedEntity>> {
        self.fetch(&workspace_path(workspace_id, "tasks"), &[]).await
    }

    /// Entries whose start falls within `range`.
    pub async fn time_entries(&self, range: &TimeRange) -> Option<Vec<TimeEntry>> {
        self.fetch("/me/time_entries", &range.query_params()).await
    }
}

fn workspace_path(workspace_id: i64, collection: &str) -> String {
    format!("/workspaces/{workspace_id}/{collection}")
}

/// The first path segment, used as the error counter label.
pub fn endpoint_label(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use te_core::LookbackWindow;

    use super::*;

    /// Scripted API that answers by path and records every request.
    #[derive(Default)]
    struct ScriptedApi {
        responses: HashMap<String, Value>,
        calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl ScriptedApi {
        fn with(mut self, path: &str, value: Value) -> Self {
            self.responses.insert(path.to_string(), value);
            self
        }
    }

    impl TogglApi for ScriptedApi {
        async fn request(
            &self,
            _method: Method,
            path: &str,
            query: &[(&str, String)],
        ) -> Result<Value, ApiError> {
            self.calls.lock().unwrap().push((
                path.to_string(),
                query
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
            ));
            self.responses.get(path).cloned().ok_or(ApiError::Status {
                status: reqwest::StatusCode::NOT_FOUND,
                body: "Not Found".to_string(),
            })
        }
    }

    fn error_count(metrics: &Metrics, endpoint: &str) -> u64 {
        metrics.api_errors.with_label_values(&[endpoint]).get()
    }

    #[test]
    fn test_endpoint_label_is_first_segment() {
        assert_eq!(endpoint_label("/me"), "me");
        assert_eq!(endpoint_label("/me/time_entries/current"), "me");
        assert_eq!(endpoint_label("/workspaces/1/projects"), "workspaces");
        assert_eq!(endpoint_label("/invalid/endpoint"), "invalid");
    }

    #[tokio::test]
    async fn test_me_decodes_identity() {
        let api = ScriptedApi::default().with(
            "/me",
            json!({"id": 1, "email": "user@example.com", "default_workspace_id": 123_456}),
        );
        let metrics = Metrics::new().unwrap();
        let identity = Fetcher::new(&api, &metrics).me().await.unwrap();

        assert_eq!(identity.default_workspace_id, Some(123_456));
        assert_eq!(error_count(&metrics, "me"), 0);
    }

    #[tokio::test]
    async fn test_me_without_identity_fields_decodes() {
        let api = ScriptedApi::default().with("/me", json!({"some_other_data": "value"}));
        let metrics = Metrics::new().unwrap();
        let identity = Fetcher::new(&api, &metrics).me().await.unwrap();

        assert_eq!(identity.id, None);
        assert_eq!(identity.default_workspace_id, None);
        assert_eq!(error_count(&metrics, "me"), 0);
    }

    #[tokio::test]
    async fn test_time_entries_tolerate_entries_that_never_ran() {
        let api = ScriptedApi::default().with(
            "/me/time_entries",
            json!([
                {
                    "id": 1004,
                    "workspace_id": 123_456,
                    "project_id": null,
                    "project_name": null,
                    "task_id": null,
                    "task_name": null,
                    "tags": [],
                    "billable": false,
                    "duration": 900,
                    "start": "2025-03-10T04:00:00+00:00",
                    "stop": "2025-03-10T04:15:00+00:00"
                },
                {"id": 1005, "workspace_id": 123_456, "project_id": 987_654, "duration": -12_345},
                {"id": 1006, "workspace_id": 123_456, "project_id": 987_654, "duration": 0}
            ]),
        );
        let metrics = Metrics::new().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let range = LookbackWindow::new(24).unwrap().range_ending(now);

        let entries = Fetcher::new(&api, &metrics)
            .time_entries(&range)
            .await
            .unwrap();

        assert_eq!(entries.len(), 3);
        assert!(entries[0].start.is_some());
        assert!(entries[1].start.is_none());
        assert!(entries[2].start.is_none());
        assert_eq!(error_count(&metrics, "me"), 0);
    }

    #[tokio::test]
    async fn test_failed_request_counts_error_and_returns_none() {
        let api = ScriptedApi::default();
        let metrics = Metrics::new().unwrap();
        let fetcher = Fetcher::new(&api, &metrics);

        assert!(fetcher.me().await.is_none());
        assert!(fetcher.projects(7).await.is_none());
        assert_eq!(error_count(&metrics, "me"), 1);
        assert_eq!(error_count(&metrics, "workspaces"), 1);
    }

    #[tokio::test]
    async fn test_undecodable_body_counts_as_error() {
        let api = ScriptedApi::default().with("/workspaces/7/tags", json!({"unexpected": true}));
        let metrics = Metrics::new().unwrap();

        assert!(Fetcher::new(&api, &metrics).tags(7).await.is_none());
        assert_eq!(error_count(&metrics, "workspaces"), 1);
    }

    #[tokio::test]
    async fn test_no_running_timer_is_not_an_error() {
        let api = ScriptedApi::default().with("/me/time_entries/current", Value::Null);
        let metrics = Metrics::new().unwrap();

        assert!(
            Fetcher::new(&api, &metrics)
                .current_time_entry()
                .await
                .is_none()
        );
        assert_eq!(error_count(&metrics, "me"), 0);
    }

    #[tokio::test]
    async fn test_current_entry_decodes() {
        let api = ScriptedApi::default().with(
            "/me/time_entries/current",
            json!({
                "id": 123,
                "workspace_id": 1,
                "project_id": 2,
                "start": "2025-03-10T09:00:00+00:00",
                "duration": -1,
                "description": "Working on tests",
                "tags": ["test-tag"],
                "billable": true
            }),
        );
        let metrics = Metrics::new().unwrap();
        let entry = Fetcher::new(&api, &metrics)
            .current_time_entry()
            .await
            .unwrap();

        assert_eq!(entry.id, 123);
        assert_eq!(entry.description.as_deref(), Some("Working on tests"));
    }

    #[tokio::test]
    async fn test_time_entries_pass_range_as_query() {
        let api = ScriptedApi::default().with("/me/time_entries", json!([]));
        let metrics = Metrics::new().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let range = LookbackWindow::new(24).unwrap().range_ending(now);

        let entries = Fetcher::new(&api, &metrics)
            .time_entries(&range)
            .await
            .unwrap();
        assert!(entries.is_empty());

        let calls = api.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "/me/time_entries");
        assert_eq!(
            calls[0].1,
            vec![
                (
                    "start_date".to_string(),
                    "2025-03-09T12:00:00+00:00".to_string()
                ),
                (
                    "end_date".to_string(),
                    "2025-03-10T12:00:00+00:00".to_string()
                ),
            ]
        );
    }
}
