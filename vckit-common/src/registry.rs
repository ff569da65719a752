use anyhow::{anyhow, Context, Result};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::info;

use crate::vm::ops::RecordStore;

/// Client for the configuration-management registry that holds node and
/// client records for provisioned machines. Only deletion is needed here;
/// record creation belongs to the provisioning tooling.
pub struct RegistryClient {
    base_url: String,
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl RegistryClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn delete_node(&self, name: &str) -> Result<()> {
        self.delete(&format!("/api/nodes/{name}"))
            .await
            .with_context(|| format!("Failed to delete node {name}"))?;
        info!("Deleted node {name}");
        Ok(())
    }

    pub async fn delete_client(&self, name: &str) -> Result<()> {
        self.delete(&format!("/api/clients/{name}"))
            .await
            .with_context(|| format!("Failed to delete client {name}"))?;
        info!("Deleted client {name}");
        Ok(())
    }

    #[tracing::instrument(name = "registry.delete", skip(self), fields(path = %path))]
    async fn delete(&self, path: &str) -> Result<()> {
        let uri: hyper::Uri = format!("{}{path}", self.base_url)
            .parse()
            .context("Invalid request path")?;

        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .body(Full::new(Bytes::new()))
            .context("Failed to build request")?;

        let response = self
            .client
            .request(request)
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .context("Failed to read response body")?
            .to_bytes();

        if !status.is_success() {
            let error_text = String::from_utf8_lossy(&body_bytes);
            return Err(anyhow!("Request failed with status {status}: {error_text}"));
        }

        Ok(())
    }
}

impl RecordStore for RegistryClient {
    async fn delete_node(&self, name: &str) -> Result<()> {
        RegistryClient::delete_node(self, name).await
    }

    async fn delete_client(&self, name: &str) -> Result<()> {
        RegistryClient::delete_client(self, name).await
    }
}
