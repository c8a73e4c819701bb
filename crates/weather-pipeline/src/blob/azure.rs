//! Azure Blob Storage over the REST `Put Blob` operation.
//!
//! Only SAS-authorized connection strings are supported. With overwrite
//! disabled the request carries `If-None-Match: *`, which the service
//! answers with `409 Conflict` and error code `BlobAlreadyExists` when the
//! blob already exists. Other conflicts (leases, container deletion) are
//! reported as the backend being unavailable.

use reqwest::{StatusCode, Url};

use super::{BlobError, BlobStore};
use crate::config::ConfigError;

const API_VERSION: &str = "2021-08-06";
const ERROR_CODE_HEADER: &str = "x-ms-error-code";
const BLOB_ALREADY_EXISTS: &str = "BlobAlreadyExists";

#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    client: reqwest::Client,
    endpoint: Url,
    sas: String,
}

impl AzureBlobStore {
    pub fn new(endpoint: &str, sas: &str) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/')).map_err(|e| {
            ConfigError::UnsupportedConnection(format!("invalid BlobEndpoint '{endpoint}': {e}"))
        })?;
        if endpoint.cannot_be_a_base() {
            return Err(ConfigError::UnsupportedConnection(format!(
                "BlobEndpoint '{endpoint}' cannot hold blob paths"
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            sas: sas.trim_start_matches('?').to_string(),
        })
    }

    /// Parse a `Key=Value;Key=Value` connection string.
    ///
    /// Needs `SharedAccessSignature` plus either `BlobEndpoint` or
    /// `AccountName` (with optional `DefaultEndpointsProtocol` and
    /// `EndpointSuffix`).
    pub fn from_connection_string(connection: &str) -> Result<Self, ConfigError> {
        let mut blob_endpoint = None;
        let mut account_name = None;
        let mut protocol = "https";
        let mut suffix = "core.windows.net";
        let mut sas = None;
        let mut has_account_key = false;

        for pair in connection.split(';').filter(|p| !p.trim().is_empty()) {
            let (k, v) = pair.split_once('=').ok_or_else(|| {
                ConfigError::UnsupportedConnection(format!("malformed segment '{pair}'"))
            })?;
            match k.trim() {
                "BlobEndpoint" => blob_endpoint = Some(v.trim().to_string()),
                "AccountName" => account_name = Some(v.trim()),
                "DefaultEndpointsProtocol" => protocol = v.trim(),
                "EndpointSuffix" => suffix = v.trim(),
                "SharedAccessSignature" => sas = Some(v.trim()),
                "AccountKey" => has_account_key = true,
                _ => {}
            }
        }

        let sas = match sas {
            Some(s) => s,
            None if has_account_key => {
                return Err(ConfigError::UnsupportedConnection(
                    "AccountKey authorization is not supported, use a SharedAccessSignature"
                        .into(),
                ))
            }
            None => {
                return Err(ConfigError::UnsupportedConnection(
                    "connection string has no SharedAccessSignature".into(),
                ))
            }
        };

        let endpoint = match (blob_endpoint, account_name) {
            (Some(endpoint), _) => endpoint,
            (None, Some(account)) => format!("{protocol}://{account}.blob.{suffix}"),
            (None, None) => {
                return Err(ConfigError::UnsupportedConnection(
                    "connection string needs BlobEndpoint or AccountName".into(),
                ))
            }
        };

        Self::new(&endpoint, sas)
    }

    /// Full request URL for `container/key`, SAS included.
    fn blob_url(&self, container: &str, key: &str) -> Result<Url, BlobError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| BlobError::Unavailable("endpoint cannot be a base URL".into()))?
            .pop_if_empty()
            .push(container)
            .extend(key.split('/'));
        url.set_query(Some(&self.sas));
        Ok(url)
    }

    /// Log-safe URL without the SAS token.
    fn display_url(&self, container: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            container,
            key
        )
    }
}

impl BlobStore for AzureBlobStore {
    async fn put(
        &self,
        container: &str,
        key: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> Result<(), BlobError> {
        let url = self.blob_url(container, key)?;
        log::info!("PUT {}", self.display_url(container, key));

        let mut request = self
            .client
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", API_VERSION)
            .header("Content-Type", "application/json")
            .body(bytes);
        if !overwrite {
            request = request.header("If-None-Match", "*");
        }

        let response = request
            .send()
            .await
            .map_err(|e| BlobError::Unavailable(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let error_code = response
            .headers()
            .get(ERROR_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if is_already_exists(status, &error_code) && !overwrite {
            return Err(BlobError::AlreadyExists {
                container: container.to_string(),
                key: key.to_string(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(BlobError::Unavailable(format!(
            "Azure returned {} ({}) for {}: {}",
            status,
            if error_code.is_empty() { "no error code" } else { error_code.as_str() },
            self.display_url(container, key),
            body.trim()
        )))
    }
}

fn is_already_exists(status: StatusCode, error_code: &str) -> bool {
    status == StatusCode::CONFLICT && error_code == BLOB_ALREADY_EXISTS
}
