use crate::domain::model::{
    Deal, ListResponse, Organization, OrganizationId, PageRequest, Person, PersonId, UpdateAck,
    User, UserId,
};
use crate::domain::ports::CrmSource;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.pipedrive.com/v1";

/// Pipedrive v1 REST client. Authenticates with the `api_token` query parameter.
pub struct PipedriveClient {
    client: Client,
    base_url: String,
    token: String,
    timeout: Option<Duration>,
}

impl PipedriveClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.query(&[("api_token", self.token.as_str())]);
        match self.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> Result<ListResponse<T>> {
        tracing::debug!("Making API request to: {} {:?}", path, query);
        let request = self.authorized(self.client.get(self.url(path))).query(query);
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        let body = response.bytes().await?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }

        // error bodies usually still carry {"success": false, "error": ...}
        let mut failed = serde_json::from_slice::<ListResponse<T>>(&body)
            .unwrap_or_else(|_| ListResponse::failed(format!("HTTP {}", status)));
        failed.success = false;
        if failed.error.is_none() {
            failed.error = Some(format!("HTTP {}", status));
        }
        Ok(failed)
    }

    async fn put_owner(&self, path: &str, owner: UserId) -> Result<UpdateAck> {
        tracing::debug!("Setting owner {} on {}", owner, path);
        let request = self
            .authorized(self.client.put(self.url(path)))
            .json(&serde_json::json!({ "owner_id": owner }));
        let response = request.send().await?;
        let status = response.status();

        let body = response.bytes().await?;
        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }

        let reason = serde_json::from_slice::<UpdateAck>(&body)
            .ok()
            .and_then(|ack| ack.error)
            .unwrap_or_else(|| format!("HTTP {}", status));
        Ok(UpdateAck::rejected(reason))
    }
}

#[async_trait]
impl CrmSource for PipedriveClient {
    async fn list_deals(&self, request: &PageRequest) -> Result<ListResponse<Deal>> {
        self.get_list("deals", &request.query_pairs()).await
    }

    async fn list_organizations(
        &self,
        request: &PageRequest,
    ) -> Result<ListResponse<Organization>> {
        self.get_list("organizations", &request.query_pairs()).await
    }

    async fn list_organization_persons(
        &self,
        organization: OrganizationId,
        request: &PageRequest,
    ) -> Result<ListResponse<Person>> {
        let path = format!("organizations/{}/persons", organization);
        self.get_list(&path, &request.query_pairs()).await
    }

    async fn list_users(&self) -> Result<ListResponse<User>> {
        self.get_list("users", &[]).await
    }

    async fn update_organization_owner(
        &self,
        organization: OrganizationId,
        owner: UserId,
    ) -> Result<UpdateAck> {
        self.put_owner(&format!("organizations/{}", organization), owner)
            .await
    }

    async fn update_person_owner(&self, person: PersonId, owner: UserId) -> Result<UpdateAck> {
        self.put_owner(&format!("persons/{}", person), owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::QueryParams;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_list_deals_sends_token_and_paging() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/deals")
                .query_param("api_token", "secret")
                .query_param("start", "500")
                .query_param("limit", "500");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "success": true,
                    "data": [{"id": 1, "title": "A", "status": "won"}],
                    "additional_data": {"pagination": {
                        "start": 500, "limit": 500, "more_items_in_collection": false
                    }}
                }));
        });

        let client = PipedriveClient::new(server.url(""), "secret");
        let page = client
            .list_deals(&PageRequest::new(500, 500, &QueryParams::new()))
            .await
            .unwrap();

        mock.assert();
        assert!(page.success);
        assert_eq!(page.data.unwrap()[0].id, 1);
    }

    #[tokio::test]
    async fn test_error_status_is_reported_as_unsuccessful() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/organizations");
            then.status(401)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({
                    "success": false,
                    "error": "unauthorized access"
                }));
        });

        let client = PipedriveClient::new(server.url("/"), "bad");
        let page = client
            .list_organizations(&PageRequest::new(0, 500, &QueryParams::new()))
            .await
            .unwrap();

        mock.assert();
        assert!(!page.success);
        assert_eq!(page.error.as_deref(), Some("unauthorized access"));
    }

    #[tokio::test]
    async fn test_error_status_with_plain_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/users");
            then.status(502).body("Bad Gateway");
        });

        let client = PipedriveClient::new(server.url(""), "t");
        let response = client.list_users().await.unwrap();

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("HTTP 502 Bad Gateway"));
    }

    #[tokio::test]
    async fn test_update_person_owner_puts_owner_id() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/persons/42")
                .query_param("api_token", "t")
                .json_body(serde_json::json!({"owner_id": 7}));
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"success": true, "data": {"id": 42}}));
        });

        let client = PipedriveClient::new(server.url(""), "t");
        let ack = client.update_person_owner(42, 7).await.unwrap();

        mock.assert();
        assert!(ack.success);
    }

    #[tokio::test]
    async fn test_rejected_update_carries_reason() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/organizations/9");
            then.status(403)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"success": false, "error": "forbidden"}));
        });

        let client = PipedriveClient::new(server.url(""), "t");
        let ack = client.update_organization_owner(9, 1).await.unwrap();

        assert!(!ack.success);
        assert_eq!(ack.error.as_deref(), Some("forbidden"));
    }
}
