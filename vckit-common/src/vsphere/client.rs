use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, info};

use crate::events::{Event, EventFilter, EventSource};
use crate::vm::ops::VmProvider;
use crate::vsphere::models::{ErrorResponse, VmSummary};

/// Header carrying the session token on authenticated requests.
const SESSION_HEADER: &str = "vmware-api-session-id";

/// HTTP client for the vCenter Automation API.
///
/// [`connect`](Self::connect) performs the session login; every other call
/// reuses the stored session token. All failures surface as `anyhow` errors
/// with the API's own error message where one is available.
pub struct VsphereClient {
    base_url: String,
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    session_id: String,
}

impl VsphereClient {
    /// Log in with basic auth and return an authenticated client.
    #[tracing::instrument(name = "vsphere.connect", skip(password))]
    pub async fn connect(base_url: &str, username: &str, password: &str) -> Result<Self> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("Failed to load native TLS roots")?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);

        let base_url = base_url.trim_end_matches('/').to_string();
        let uri: hyper::Uri = format!("{base_url}/api/session")
            .parse()
            .context("Invalid server URL")?;

        let credentials = BASE64.encode(format!("{username}:{password}"));
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("Authorization", format!("Basic {credentials}"))
            .body(Full::new(Bytes::new()))
            .context("Failed to build login request")?;

        let response = client
            .request(request)
            .await
            .context("Failed to reach the management API")?;

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .context("Failed to read login response")?
            .to_bytes();

        if !status.is_success() {
            return Err(api_error(status, &body_bytes).context("Session login failed"));
        }

        // The session endpoint returns the token as a bare JSON string.
        let session_id: String =
            serde_json::from_slice(&body_bytes).context("Failed to parse session token")?;

        info!("Authenticated against {base_url}");

        Ok(Self {
            base_url,
            client,
            session_id,
        })
    }

    /// Resolve a VM by name. An unknown name is `Ok(None)`, not an error;
    /// callers decide whether that is fatal.
    pub async fn find_vm(&self, name: &str) -> Result<Option<VmSummary>> {
        let path = format!("/api/vcenter/vm?names={name}");
        let vms: Vec<VmSummary> = self
            .get(&path)
            .await
            .with_context(|| format!("Failed to look up VM {name}"))?;
        Ok(vms.into_iter().find(|vm| vm.name == name))
    }

    /// Hard power-off (the platform's `stop` action).
    pub async fn power_off(&self, vm_id: &str) -> Result<()> {
        let path = format!("/api/vcenter/vm/{vm_id}/power?action=stop");
        self.send(Method::POST, &path, None)
            .await
            .with_context(|| format!("Failed to power off VM {vm_id}"))?;
        Ok(())
    }

    /// Destroy the VM and its disks.
    pub async fn delete_vm(&self, vm_id: &str) -> Result<()> {
        let path = format!("/api/vcenter/vm/{vm_id}");
        self.send(Method::DELETE, &path, None)
            .await
            .with_context(|| format!("Failed to delete VM {vm_id}"))?;
        Ok(())
    }

    /// Query the event log with a structured filter.
    pub async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        self.post("/api/vcenter/events?action=query", filter)
            .await
            .context("Failed to query events")
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.send(Method::GET, path, None).await?;
        serde_json::from_slice(&body).context("Failed to deserialize response")
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize,
        T: serde::de::DeserializeOwned,
    {
        let json = serde_json::to_vec(body).context("Failed to serialize request body")?;
        let body = self
            .send(Method::POST, path, Some(Bytes::from(json)))
            .await?;
        serde_json::from_slice(&body).context("Failed to deserialize response")
    }

    #[tracing::instrument(name = "vsphere.request", skip(self, body), fields(path = %path))]
    async fn send(&self, method: Method, path: &str, body: Option<Bytes>) -> Result<Bytes> {
        let uri: hyper::Uri = format!("{}{path}", self.base_url)
            .parse()
            .context("Invalid request path")?;

        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(SESSION_HEADER, &self.session_id);

        let request = match body {
            Some(bytes) => builder
                .header("Content-Type", "application/json")
                .body(Full::new(bytes)),
            None => builder.body(Full::new(Bytes::new())),
        }
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
            return Err(api_error(status, &body_bytes));
        }

        debug!("{} -> {}", path, status);
        Ok(body_bytes)
    }
}

/// Turn a non-2xx response into an error, preferring the API's own error
/// envelope over the raw body text.
fn api_error(status: StatusCode, body: &Bytes) -> anyhow::Error {
    if let Ok(error_response) = serde_json::from_slice::<ErrorResponse>(body) {
        let message = error_response
            .messages
            .first()
            .map_or(error_response.error_type.clone(), |m| {
                m.default_message.clone()
            });
        return anyhow!("API error ({status}): {message}");
    }

    let error_text = String::from_utf8_lossy(body);
    anyhow!("Request failed with status {status}: {error_text}")
}

impl EventSource for VsphereClient {
    async fn query_events(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        VsphereClient::query_events(self, filter).await
    }
}

impl VmProvider for VsphereClient {
    async fn find_vm(&self, name: &str) -> Result<Option<VmSummary>> {
        VsphereClient::find_vm(self, name).await
    }

    async fn power_off(&self, vm_id: &str) -> Result<()> {
        VsphereClient::power_off(self, vm_id).await
    }

    async fn destroy(&self, vm_id: &str) -> Result<()> {
        VsphereClient::delete_vm(self, vm_id).await
    }
}
