//! The "my APIs" dashboard: listing, id-set diffing, deletion and the
//! background refresh loop.

use std::collections::HashSet;

use crate::api::{ApiClient, ApiError, ApiSummary, Transport};
use crate::pagination::Pagination;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl ListingDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    apis: Vec<ApiSummary>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apis(&self) -> &[ApiSummary] {
        &self.apis
    }

    /// Replace the listing with `apis` and report which ids came and went.
    /// The latest listing always wins, whichever refresh produced it.
    pub fn apply_listing(&mut self, apis: Vec<ApiSummary>) -> ListingDiff {
        let old: HashSet<&str> = self.apis.iter().map(|a| a.id.as_str()).collect();
        let new: HashSet<&str> = apis.iter().map(|a| a.id.as_str()).collect();

        let diff = ListingDiff {
            added: apis
                .iter()
                .filter(|a| !old.contains(a.id.as_str()))
                .map(|a| a.id.clone())
                .collect(),
            removed: self
                .apis
                .iter()
                .filter(|a| !new.contains(a.id.as_str()))
                .map(|a| a.id.clone())
                .collect(),
        };

        self.apis = apis;
        diff
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.apis.len();
        self.apis.retain(|a| a.id != id);
        self.apis.len() != before
    }

    pub fn pagination(&self, page_size: usize) -> Pagination {
        Pagination::new(self.apis.len(), page_size)
    }

    pub fn page(&self, page: usize, page_size: usize) -> &[ApiSummary] {
        self.pagination(page_size).page(&self.apis, page)
    }

    pub async fn refresh<T: Transport>(
        &mut self,
        client: &ApiClient<T>,
    ) -> Result<ListingDiff, ApiError> {
        let apis = client.list_apis().await?;
        Ok(self.apply_listing(apis))
    }

    pub async fn delete<T: Transport>(
        &mut self,
        client: &ApiClient<T>,
        id: &str,
    ) -> Result<(), ApiError> {
        client.delete_api(id).await?;
        self.remove(id);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use refresher::run_background_refresh;

#[cfg(not(target_arch = "wasm32"))]
mod refresher {
    use std::time::Duration;

    use tokio::sync::{Mutex, watch};
    use tokio::time::{MissedTickBehavior, interval};

    use super::DashboardState;
    use crate::api::{ApiClient, Transport};

    const MIN_PERIOD: Duration = Duration::from_secs(1);

    /// Poll the listing every `period` (at least one second) until `shutdown` flips (or its sender
    /// goes away). Failures are logged and the next tick tries again.
    pub async fn run_background_refresh<T: Transport>(
        client: &ApiClient<T>,
        state: &Mutex<DashboardState>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(period.max(MIN_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the page already did its own load.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match client.list_apis().await {
                        Ok(apis) => {
                            let diff = state.lock().await.apply_listing(apis);
                            if !diff.is_empty() {
                                tracing::info!(
                                    added = diff.added.len(),
                                    removed = diff.removed.len(),
                                    "dashboard listing changed"
                                );
                            }
                        }
                        Err(err) => tracing::warn!(error = %err, "background refresh failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("background refresh stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::MockTransport;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::{Mutex, watch};

    fn summary(id: &str) -> ApiSummary {
        ApiSummary {
            id: id.to_string(),
            name: format!("{} api", id),
            created_at: None,
            table_count: None,
            endpoint_count: None,
        }
    }

    #[test]
    fn test_diff_by_id_set() {
        let mut state = DashboardState::new();
        let first = state.apply_listing(vec![summary("a"), summary("b")]);
        assert_eq!(first.added, vec!["a", "b"]);
        assert!(first.removed.is_empty());

        let second = state.apply_listing(vec![summary("b"), summary("c")]);
        assert_eq!(second.added, vec!["c"]);
        assert_eq!(second.removed, vec!["a"]);

        let third = state.apply_listing(vec![summary("b"), summary("c")]);
        assert!(third.is_empty());
    }

    #[test]
    fn test_pages_of_listing() {
        let mut state = DashboardState::new();
        state.apply_listing((0..13).map(|i| summary(&i.to_string())).collect());
        assert_eq!(state.pagination(6).total_pages(), 3);
        assert_eq!(state.page(3, 6).len(), 1);
        assert_eq!(state.page(9, 6)[0].id, "12");
    }

    #[tokio::test]
    async fn test_delete_removes_locally() {
        let mut state = DashboardState::new();
        let client = ApiClient::new(MockTransport::with_replies(vec![
            Ok(json!([{"id": "a"}, {"id": "b"}])),
            Ok(serde_json::Value::Null),
        ]));
        state.refresh(&client).await.unwrap();
        state.delete(&client, "a").await.unwrap();

        let ids: Vec<&str> = state.apis().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_polls_until_shutdown() {
        let client = ApiClient::new(MockTransport::with_replies(vec![
            Ok(json!([{"id": "a"}])),
            Ok(json!([{"id": "a"}, {"id": "b"}])),
        ]));
        let state = Mutex::new(DashboardState::new());
        let (stop, shutdown) = watch::channel(false);

        let driver = async {
            tokio::time::sleep(Duration::from_secs(65)).await;
            stop.send(true).unwrap();
        };
        tokio::join!(
            run_background_refresh(&client, &state, Duration::from_secs(30), shutdown),
            driver
        );

        assert_eq!(client.transport().requests().len(), 2);
        let ids: Vec<String> = state.lock().await.apis().iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_raised_to_one_second() {
        let client = ApiClient::new(MockTransport::with_replies(vec![
            Ok(json!([{"id": "a"}])),
            Ok(json!([{"id": "a"}])),
        ]));
        let state = Mutex::new(DashboardState::new());
        let (stop, shutdown) = watch::channel(false);

        let driver = async {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            stop.send(true).unwrap();
        };
        tokio::join!(
            run_background_refresh(&client, &state, Duration::ZERO, shutdown),
            driver
        );

        assert_eq!(client.transport().requests().len(), 2);
    }
}
