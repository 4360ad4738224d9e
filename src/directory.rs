//! Device directory client.
//!
//! Fetches the tailnet device list over HTTP and decodes it into
//! [`DeviceRecord`]s for the registry builder.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::config::DirectoryConfig;
use crate::error::DnsError;

/// A device as reported by the directory, reduced to what DNS needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Directory-supplied name, usually `<host>.<tailnet suffix>`.
    pub name: String,
    /// Address strings in directory order (IPv4 and IPv6 mixed).
    pub addresses: Vec<String>,
    /// Free-text ACL tags, e.g. `tag:cname-api`.
    pub tags: Vec<String>,
}

impl DeviceRecord {
    /// Convenience constructor, mostly for tests.
    pub fn new<N, A, T>(name: N, addresses: A, tags: T) -> Self
    where
        N: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            name: name.into(),
            addresses: addresses.into_iter().map(Into::into).collect(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response body of `GET /api/v2/tailnet/{tailnet}/devices`.
#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default, deserialize_with = "null_as_default")]
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct Device {
    #[serde(default, deserialize_with = "null_as_default")]
    id: String,
    name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    hostname: String,
    #[serde(default, deserialize_with = "null_as_default")]
    os: String,
    #[serde(default, deserialize_with = "null_as_default")]
    authorized: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    addresses: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    tags: Vec<String>,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<Device> for DeviceRecord {
    fn from(device: Device) -> Self {
        Self {
            name: device.name,
            addresses: device.addresses,
            tags: device.tags,
        }
    }
}

/// Decode a directory response body, preserving device order.
pub fn parse_device_list(body: &[u8]) -> Result<Vec<DeviceRecord>, DnsError> {
    let list: DeviceList = serde_json::from_slice(body)?;
    Ok(list
        .devices
        .into_iter()
        .inspect(|d| {
            debug!(
                id = %d.id,
                name = %d.name,
                hostname = %d.hostname,
                os = %d.os,
                authorized = d.authorized,
                addresses = ?d.addresses,
                tags = ?d.tags,
                "directory device"
            );
        })
        .map(DeviceRecord::from)
        .collect())
}

/// Anything that can produce the current device list.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Fetch a full snapshot of the device list.
    async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, DnsError>;
}

/// HTTP client for the tailnet device directory.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: Client,
    url: String,
    api_key: String,
}

impl DirectoryClient {
    /// Create a client for the configured tailnet.
    pub fn new(config: &DirectoryConfig) -> Result<Self, DnsError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            url: devices_url(&config.api_url, &config.tailnet),
            api_key: config.api_key.clone(),
        })
    }

    /// Endpoint this client polls.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn devices_url(api_url: &str, tailnet: &str) -> String {
    format!(
        "{}/api/v2/tailnet/{}/devices",
        api_url.trim_end_matches('/'),
        tailnet
    )
}

#[async_trait]
impl DeviceSource for DirectoryClient {
    async fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, DnsError> {
        let response = self
            .http
            .get(&self.url)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(DnsError::status(status));
        }

        let body = response.bytes().await?;
        parse_device_list(&body)
    }
}
