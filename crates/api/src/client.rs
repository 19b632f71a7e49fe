// crates/api/src/client.rs
//! HTTP client for the digest service.

use async_trait::async_trait;
use reqwest::{Client, Response};
use tracing::debug;

use crate::error::ApiError;
use crate::types::{CreateDigestResponse, DigestPeptidesResponse, DigestResponse, NewDigestRequest};

/// The consumed surface of the digest service.
///
/// [`DigestClient`] is the production implementation; tests substitute a
/// scripted mock so the tracking layer can be driven without a live server.
#[async_trait]
pub trait DigestApi: Send + Sync {
    /// Create a digest job. Returns the server-assigned digest id.
    async fn create_digest(&self, request: &NewDigestRequest) -> Result<String, ApiError>;

    /// Fetch the current state of one digest job.
    async fn get_digest(&self, user_id: &str, digest_id: &str)
        -> Result<DigestResponse, ApiError>;

    /// Fetch the peptide result set of a completed digest job.
    async fn get_peptides(
        &self,
        user_id: &str,
        digest_id: &str,
    ) -> Result<DigestPeptidesResponse, ApiError>;

    /// Delete one digest job.
    async fn delete_digest(&self, user_id: &str, digest_id: &str) -> Result<(), ApiError>;

    /// Delete the owning account; the server cascades to all owned digests.
    async fn delete_user(&self, user_id: &str) -> Result<(), ApiError>;
}

/// Reqwest-backed client for the digest service.
#[derive(Debug, Clone)]
pub struct DigestClient {
    client: Client,
    base_url: String,
}

impl DigestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn ok_or_error(response: Response, operation: &str) -> Result<Response, ApiError> {
        if !response.status().is_success() {
            return Err(ApiError::from_response(response, operation).await);
        }
        Ok(response)
    }
}

#[async_trait]
impl DigestApi for DigestClient {
    async fn create_digest(&self, request: &NewDigestRequest) -> Result<String, ApiError> {
        let response = self
            .client
            .post(self.url("v1/digest/job"))
            .json(request)
            .send()
            .await?;
        let response = Self::ok_or_error(response, "submit digest").await?;
        let created: CreateDigestResponse = response.json().await?;
        debug!(digest_id = %created.digest_id, "digest created");
        Ok(created.digest_id)
    }

    async fn get_digest(
        &self,
        user_id: &str,
        digest_id: &str,
    ) -> Result<DigestResponse, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("v1/digest/{user_id}/{digest_id}")))
            .send()
            .await?;
        let response = Self::ok_or_error(response, &format!("fetch digest {digest_id}")).await?;
        Ok(response.json().await?)
    }

    async fn get_peptides(
        &self,
        user_id: &str,
        digest_id: &str,
    ) -> Result<DigestPeptidesResponse, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("v1/digest/{user_id}/{digest_id}/peptides")))
            .send()
            .await?;
        let response = Self::ok_or_error(response, "fetch peptides").await?;
        Ok(response.json().await?)
    }

    async fn delete_digest(&self, user_id: &str, digest_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("v1/digest/delete/{user_id}/{digest_id}")))
            .send()
            .await?;
        Self::ok_or_error(response, &format!("delete digest {digest_id}")).await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("v1/users/{user_id}")))
            .send()
            .await?;
        Self::ok_or_error(response, "delete account").await?;
        Ok(())
    }
}
