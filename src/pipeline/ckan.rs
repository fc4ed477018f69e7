//! Minimal CKAN action API client

use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// One resource of a CKAN package
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CkanResource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Whether the rows are served by the datastore
    #[serde(default)]
    pub datastore_active: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActionResponse<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Package {
    #[serde(default)]
    resources: Vec<CkanResource>,
}

/// CKAN portal client
pub struct CkanClient<'a> {
    client: &'a HttpClient,
    base_url: String,
}

impl<'a> CkanClient<'a> {
    pub fn new(client: &'a HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Resources of `package_id` via `package_show`
    pub async fn package_resources(&self, package_id: &str) -> Result<Vec<CkanResource>> {
        let package: Package = self.action("package_show", package_id).await?;
        debug!("Package {} has {} resources", package_id, package.resources.len());
        Ok(package.resources)
    }

    /// One resource via `resource_show`
    pub async fn resource(&self, resource_id: &str) -> Result<CkanResource> {
        self.action("resource_show", resource_id).await
    }

    /// URL of the full CSV dump of a datastore resource
    pub fn datastore_dump_url(&self, resource_id: &str) -> String {
        format!("{}/datastore/dump/{resource_id}", self.base_url)
    }

    /// Download a datastore resource as CSV text
    pub async fn datastore_dump(&self, resource_id: &str) -> Result<String> {
        self.client
            .get_text_with_config(&self.datastore_dump_url(resource_id), RequestConfig::new())
            .await
    }

    async fn action<T: DeserializeOwned>(&self, action: &str, id: &str) -> Result<T> {
        let url = format!("{}/api/3/action/{action}", self.base_url);
        let response: ActionResponse<T> = self
            .client
            .get_json_with_config(&url, RequestConfig::new().query("id", id))
            .await?;

        match response {
            ActionResponse {
                success: true,
                result: Some(result),
                ..
            } => Ok(result),
            ActionResponse { error, .. } => Err(Error::decode(format!(
                "CKAN {action} for '{id}' failed: {}",
                error.map_or_else(|| "no result".to_string(), |e| e.to_string())
            ))),
        }
    }
}
