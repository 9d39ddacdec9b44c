// ABOUTME: JSON-over-HTTP client for the host-manager admin surface.
// ABOUTME: One short-lived HTTP/1 connection per registry call, no retries.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use std::path::Path;
use tokio::net::TcpStream;

use super::error::RegistryError;
use super::registry::HostRegistry;
use crate::types::{AppHandle, PoolHandle, PoolName, SiteHandle, VirtualPath};

/// Registry adapter speaking JSON to a host-manager admin endpoint.
///
/// Every call opens its own connection; the admin surface is low-traffic and
/// this keeps the adapter free of connection-pool state.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    /// `host:port` of the admin endpoint.
    endpoint: String,
}

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

/// 404 body from the admin surface naming which resource is absent.
#[derive(Deserialize)]
struct MissingResponse {
    resource: String,
}

impl HttpRegistry {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    async fn send(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(StatusCode, Bytes), RegistryError> {
        let stream = TcpStream::connect(&self.endpoint)
            .await
            .map_err(|e| RegistryError::Transport {
                message: format!("failed to connect to {}: {e}", self.endpoint),
            })?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) =
            hyper::client::conn::http1::handshake(io)
                .await
                .map_err(|e| RegistryError::Transport {
                    message: format!("HTTP handshake failed: {e}"),
                })?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::warn!("registry connection error: {}", e);
            }
        });

        let payload = match body {
            Some(value) => {
                serde_json::to_vec(&value).map_err(|e| RegistryError::Protocol {
                    message: format!("failed to encode request body: {e}"),
                })?
            }
            None => Vec::new(),
        };

        let req = hyper::Request::builder()
            .method(method)
            .uri(path)
            .header("Host", self.endpoint.as_str())
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(payload)))
            .map_err(|e| RegistryError::Protocol {
                message: format!("failed to build request: {e}"),
            })?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| RegistryError::Transport {
                message: format!("request failed: {e}"),
            })?;

        let status = resp.status();
        let bytes = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| RegistryError::Transport {
                message: format!("failed to read response: {e}"),
            })?
            .to_bytes();

        Ok((status, bytes))
    }

    /// Map a non-success status to the registry error for this call.
    fn check(
        status: StatusCode,
        body: Bytes,
        not_found: impl FnOnce() -> RegistryError,
    ) -> Result<Bytes, RegistryError> {
        if status.is_success() {
            return Ok(body);
        }
        let text = String::from_utf8_lossy(&body).into_owned();
        match status {
            StatusCode::NOT_FOUND => Err(not_found()),
            StatusCode::CONFLICT => Err(RegistryError::AlreadyExists { name: text }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(RegistryError::Denied { message: text })
            }
            _ => Err(RegistryError::Protocol {
                message: format!("{status}: {text}"),
            }),
        }
    }

    fn parse_id(body: &Bytes) -> Result<String, RegistryError> {
        serde_json::from_slice::<IdResponse>(body)
            .map(|r| r.id)
            .map_err(|e| RegistryError::Protocol {
                message: format!("response was not an id object: {e}"),
            })
    }
}

#[async_trait]
impl HostRegistry for HttpRegistry {
    async fn create_pool(
        &self,
        name: &PoolName,
        runtime_version: &str,
        is_32_bit: bool,
    ) -> Result<PoolHandle, RegistryError> {
        let body = serde_json::json!({
            "name": name.as_str(),
            "runtime_version": runtime_version,
            "is_32_bit": is_32_bit,
        });
        let (status, bytes) = self.send("POST", "/pools", Some(body)).await?;
        let bytes = Self::check(status, bytes, || RegistryError::PoolNotFound {
            name: name.to_string(),
        })?;
        Ok(PoolHandle::new(Self::parse_id(&bytes)?))
    }

    async fn find_or_create_site(
        &self,
        name: &str,
        root_dir: &Path,
        port: u16,
    ) -> Result<SiteHandle, RegistryError> {
        let body = serde_json::json!({
            "root_dir": root_dir.display().to_string(),
            "port": port,
        });
        let path = format!("/sites/{}", urlencoding::encode(name));
        let (status, bytes) = self.send("PUT", &path, Some(body)).await?;
        let bytes = Self::check(status, bytes, || RegistryError::SiteNotFound {
            name: name.to_string(),
        })?;
        Ok(SiteHandle::new(Self::parse_id(&bytes)?))
    }

    async fn add_application(
        &self,
        site: &SiteHandle,
        virtual_path: &VirtualPath,
        physical_path: &Path,
        pool: &PoolHandle,
    ) -> Result<AppHandle, RegistryError> {
        let body = serde_json::json!({
            "path": virtual_path.as_str(),
            "physical_path": physical_path.display().to_string(),
            "pool": pool.as_str(),
        });
        let path = format!("/sites/{}/applications", urlencoding::encode(site.as_str()));
        let (status, bytes) = self.send("POST", &path, Some(body)).await?;
        let bytes = Self::check(status, bytes, || RegistryError::SiteNotFound {
            name: site.to_string(),
        })?;
        Ok(AppHandle::new(Self::parse_id(&bytes)?))
    }

    async fn find_application(
        &self,
        site: &SiteHandle,
        virtual_path: &VirtualPath,
    ) -> Result<Option<AppHandle>, RegistryError> {
        let path = format!(
            "/sites/{}/applications/{}",
            urlencoding::encode(site.as_str()),
            urlencoding::encode(virtual_path.segment()),
        );
        let (status, bytes) = self.send("GET", &path, None).await?;
        if status == StatusCode::NOT_FOUND {
            // The 404 body says whether the site itself or only the
            // application is absent; a missing site is an error, a missing
            // application is a clean negative.
            if let Ok(missing) = serde_json::from_slice::<MissingResponse>(&bytes) {
                if missing.resource == "site" {
                    return Err(RegistryError::SiteNotFound {
                        name: site.to_string(),
                    });
                }
            }
            return Ok(None);
        }
        let bytes = Self::check(status, bytes, || RegistryError::SiteNotFound {
            name: site.to_string(),
        })?;
        Ok(Some(AppHandle::new(Self::parse_id(&bytes)?)))
    }

    async fn commit(&self) -> Result<(), RegistryError> {
        let (status, bytes) = self.send("POST", "/commit", None).await?;
        Self::check(status, bytes, || RegistryError::Protocol {
            message: "commit endpoint missing".to_string(),
        })?;
        Ok(())
    }

    async fn stop_pool(&self, pool: &PoolHandle) -> Result<(), RegistryError> {
        let path = format!("/pools/{}/stop", urlencoding::encode(pool.as_str()));
        let (status, bytes) = self.send("POST", &path, None).await?;
        // The admin surface answers 409 for a pool that is already stopped;
        // the contract treats that as success.
        if status == StatusCode::CONFLICT {
            return Ok(());
        }
        Self::check(status, bytes, || RegistryError::PoolNotFound {
            name: pool.to_string(),
        })?;
        Ok(())
    }

    async fn remove_application(
        &self,
        site: &SiteHandle,
        app: &AppHandle,
    ) -> Result<(), RegistryError> {
        let path = format!(
            "/sites/{}/applications/{}",
            urlencoding::encode(site.as_str()),
            urlencoding::encode(app.as_str()),
        );
        let (status, bytes) = self.send("DELETE", &path, None).await?;
        Self::check(status, bytes, || RegistryError::ApplicationNotFound {
            path: app.to_string(),
        })?;
        Ok(())
    }

    async fn remove_pool(&self, pool: &PoolHandle) -> Result<(), RegistryError> {
        let path = format!("/pools/{}", urlencoding::encode(pool.as_str()));
        let (status, bytes) = self.send("DELETE", &path, None).await?;
        Self::check(status, bytes, || RegistryError::PoolNotFound {
            name: pool.to_string(),
        })?;
        Ok(())
    }
}
