//! Compute Engine REST client.
//!
//! Covers the three calls firewall cleanup needs: listing networks, listing
//! firewall rules, and deleting a rule. List calls follow `nextPageToken`
//! until the last page. Deletes wait for the global operation to finish.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, header};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::CloudError;

use super::token::AccessTokenSource;
use super::types::{Firewall, ListPage, Network, Operation};

/// Production Compute Engine endpoint.
pub const COMPUTE_API_URL: &str = "https://compute.googleapis.com/compute/v1";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Upper bound on `operations.wait` calls for one delete.
const MAX_OPERATION_WAITS: u32 = 10;

/// Network and firewall calls used by firewall cleanup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Lists networks in `project` matching `filter`.
    async fn list_networks(&self, project: &str, filter: &str) -> Result<Vec<Network>, CloudError>;

    /// Lists firewall rules in `project` matching `filter`.
    async fn list_firewalls(&self, project: &str, filter: &str) -> Result<Vec<Firewall>, CloudError>;

    /// Deletes a firewall rule and waits for the deletion to finish.
    async fn delete_firewall(&self, project: &str, name: &str) -> Result<(), CloudError>;
}

/// Compute Engine API client.
#[derive(Debug, Clone)]
pub struct ComputeClient {
    /// HTTP client.
    client: Client,
    /// API base URL, without a trailing slash.
    base_url: String,
    /// Credential source.
    tokens: AccessTokenSource,
}

impl ComputeClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str, tokens: AccessTokenSource) -> Result<Self, CloudError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| CloudError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn project_url(&self, project: &str, path: &str) -> String {
        format!("{}/projects/{project}/global/{path}", self.base_url)
    }

    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, CloudError> {
        let token = self.tokens.token().await?;
        Ok(self
            .client
            .request(method, url)
            .header(header::AUTHORIZATION, format!("Bearer {token}")))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, CloudError> {
        let response = request
            .send()
            .await
            .map_err(|e| CloudError::network(format!("Request failed: {e}")))?;
        let response = check_status(response).await?;
        response.json().await.map_err(|e| CloudError::InvalidResponse {
            message: format!("Failed to parse response: {e}"),
        })
    }

    async fn list_all<T: DeserializeOwned>(
        &self,
        project: &str,
        collection: &str,
        filter: &str,
    ) -> Result<Vec<T>, CloudError> {
        let url = self.project_url(project, collection);
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("filter", filter.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }
            trace!("GET {url} filter={filter}");
            let request = self.request(Method::GET, &url).await?.query(&query);
            let page: ListPage<T> = self.send(request).await?;
            items.extend(page.items);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Listed {} {collection} in project {project}", items.len());
        Ok(items)
    }

    async fn wait_for(&self, project: &str, mut operation: Operation) -> Result<(), CloudError> {
        let mut waits = 0;
        while !operation.is_done() {
            if waits == MAX_OPERATION_WAITS {
                return Err(CloudError::OperationFailed {
                    operation: operation.name,
                    message: String::from("operation did not finish"),
                });
            }
            waits += 1;
            let url = self.project_url(project, &format!("operations/{}/wait", operation.name));
            operation = self.send(self.request(Method::POST, &url).await?).await?;
        }

        match operation.failure() {
            Some(message) => Err(CloudError::OperationFailed {
                operation: operation.name,
                message,
            }),
            None => Ok(()),
        }
    }
}

async fn check_status(response: Response) -> Result<Response, CloudError> {
    let status = response.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        let body = response.text().await.unwrap_or_default();
        return Err(CloudError::AuthenticationFailed { message: body });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(CloudError::api_error(status.as_u16(), body));
    }
    Ok(response)
}

#[async_trait]
impl ComputeApi for ComputeClient {
    async fn list_networks(&self, project: &str, filter: &str) -> Result<Vec<Network>, CloudError> {
        self.list_all(project, "networks", filter).await
    }

    async fn list_firewalls(&self, project: &str, filter: &str) -> Result<Vec<Firewall>, CloudError> {
        self.list_all(project, "firewalls", filter).await
    }

    async fn delete_firewall(&self, project: &str, name: &str) -> Result<(), CloudError> {
        let url = self.project_url(project, &format!("firewalls/{name}"));
        debug!("DELETE {url}");
        let operation: Operation = self.send(self.request(Method::DELETE, &url).await?).await?;
        self.wait_for(project, operation).await
    }
}
