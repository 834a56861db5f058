//! Tempo v4 client: worklogs and accounts.

use crate::config::ApiConfig;
use crate::error::Result;
use crate::http::Transport;
use crate::models::{Account, Page, Worklog, WorklogCreate};
use crate::rate_limiter::RateLimiter;

const WORKLOG_PAGE_LIMIT: &str = "1000";

#[derive(Clone)]
pub struct TempoClient {
    transport: Transport,
}

impl TempoClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    pub fn new_with_limiter(config: ApiConfig, limiter: RateLimiter) -> Result<Self> {
        Ok(Self {
            transport: Transport::new_with_limiter(config, limiter)?,
        })
    }

    pub async fn create_worklog(&self, payload: &WorklogCreate) -> Result<Worklog> {
        self.transport.post("worklogs", payload).await
    }

    /// Worklogs of one author between two `YYYY-MM-DD` dates, inclusive.
    pub async fn worklogs_for_user(&self, account_id: &str, from: &str, to: &str) -> Result<Vec<Worklog>> {
        let path = format!("worklogs/user/{}", account_id);
        let page: Page<Worklog> = self
            .transport
            .get_with_query(
                &path,
                Some(&[("from", from), ("to", to), ("limit", WORKLOG_PAGE_LIMIT)]),
            )
            .await?;
        Ok(page.results)
    }

    pub async fn delete_worklog(&self, worklog_id: i64) -> Result<()> {
        let path = format!("worklogs/{}", worklog_id);
        self.transport.delete(&path).await
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        let page: Page<Account> = self.transport.get("accounts").await?;
        Ok(page.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::WorkAttributeValue;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> TempoClient {
        let config = ApiConfig::tempo("tempo-token").with_base_url(server.url());
        TempoClient::new_with_limiter(config, RateLimiter::unlimited()).expect("client")
    }

    fn sample_payload() -> WorklogCreate {
        WorklogCreate {
            issue_id: 10042,
            author_account_id: "acc-1".to_string(),
            time_spent_seconds: 1800,
            start_date: "2024-03-01".to_string(),
            start_time: "08:00:00".to_string(),
            description: "Fix login".to_string(),
            remaining_estimate_seconds: Some(600),
            attributes: vec![WorkAttributeValue {
                key: "_Account_".to_string(),
                value: "ACC1".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn create_worklog_posts_camel_case_payload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/worklogs")
            .match_header("authorization", "Bearer tempo-token")
            .match_body(Matcher::Json(json!({
                "issueId": 10042,
                "authorAccountId": "acc-1",
                "timeSpentSeconds": 1800,
                "startDate": "2024-03-01",
                "startTime": "08:00:00",
                "description": "Fix login",
                "remainingEstimateSeconds": 600,
                "attributes": [{"key": "_Account_", "value": "ACC1"}]
            })))
            .with_status(200)
            .with_body(r#"{"tempoWorklogId":555,"issue":{"id":10042},"timeSpentSeconds":1800}"#)
            .create_async()
            .await;

        let worklog = client_for(&server)
            .create_worklog(&sample_payload())
            .await
            .expect("created");

        mock.assert_async().await;
        assert_eq!(worklog.tempo_worklog_id, Some(555));
        assert_eq!(worklog.issue.and_then(|i| i.id_string()).as_deref(), Some("10042"));
    }

    #[test]
    fn optional_fields_are_omitted_when_empty() {
        let mut payload = sample_payload();
        payload.remaining_estimate_seconds = None;
        payload.attributes.clear();

        let value = serde_json::to_value(&payload).expect("serialize");
        assert!(value.get("remainingEstimateSeconds").is_none());
        assert!(value.get("attributes").is_none());
    }

    #[tokio::test]
    async fn rejected_worklog_surfaces_http_error_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/worklogs")
            .with_status(400)
            .with_body(r#"{"errors":[{"code":"worklog.issue.invalid","message":"Issue not found"}]}"#)
            .create_async()
            .await;

        let err = client_for(&server).create_worklog(&sample_payload()).await.unwrap_err();
        match err {
            ApiError::Http { status, code, .. } => {
                assert_eq!(status.as_u16(), 400);
                assert_eq!(code.as_deref(), Some("worklog.issue.invalid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn throttled_post_reports_retry_after() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/worklogs")
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;

        let err = client_for(&server).create_worklog(&sample_payload()).await.unwrap_err();
        assert!(matches!(err, ApiError::RateLimited { retry_after: Some(7) }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn worklogs_for_user_unwraps_results_page() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/worklogs/user/acc-1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("from".into(), "2024-03-01".into()),
                Matcher::UrlEncoded("to".into(), "2024-03-01".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"metadata":{"count":2,"offset":0,"limit":1000},"results":[
                    {"tempoWorklogId":1,"issue":{"id":100},"timeSpentSeconds":900,"description":"a"},
                    {"tempoWorklogId":2,"issue":{"id":"101"},"timeSpentSeconds":1800}]}"#,
            )
            .create_async()
            .await;

        let worklogs = client_for(&server)
            .worklogs_for_user("acc-1", "2024-03-01", "2024-03-01")
            .await
            .expect("worklogs");

        assert_eq!(worklogs.len(), 2);
        assert_eq!(worklogs[1].issue.as_ref().and_then(|i| i.id_string()).as_deref(), Some("101"));
        assert!(worklogs[1].description.is_none());
    }

    #[tokio::test]
    async fn delete_and_accounts_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("DELETE", "/worklogs/555")
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("GET", "/accounts")
            .with_status(200)
            .with_body(r#"{"results":[{"key":"ACC1","id":1,"name":"Internal","status":"OPEN"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client.delete_worklog(555).await.expect("deleted");
        let accounts = client.accounts().await.expect("accounts");

        delete.assert_async().await;
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].key, "ACC1");
    }
}
