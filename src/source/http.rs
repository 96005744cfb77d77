use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::debug;

use super::RepositorySource;
use super::index::{self, IndexRecord};
use crate::constants::http::{REQUEST_TIMEOUT, USER_AGENT};
use crate::core::{DeclaredDependency, PackageRef};
use crate::error::{DepVizError, Result};

/// Sparse registry index reached over HTTP(S)
pub struct HttpIndexSource {
    base_url: String,
    client: Client,
    cache: Mutex<HashMap<String, Arc<Vec<IndexRecord>>>>,
}

impl HttpIndexSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url
            .strip_prefix("sparse+")
            .unwrap_or(base_url)
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DepVizError::Repository {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url,
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn package_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, index::index_path(package))
    }

    fn fetch(&self, package: &str) -> Result<Vec<IndexRecord>> {
        let url = self.package_url(package);
        debug!(%url, "fetching index file");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DepVizError::Repository {
                message: format!("request to {url} failed: {e}"),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND
            | StatusCode::GONE
            | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => {
                return Err(DepVizError::PackageNotFound {
                    package: package.to_string(),
                });
            }
            status if !status.is_success() => {
                return Err(DepVizError::Repository {
                    message: format!("{url} answered with status {status}"),
                });
            }
            _ => {}
        }

        let body = response.text().map_err(|e| DepVizError::Repository {
            message: format!("failed to read response from {url}: {e}"),
        })?;
        index::parse_index_file(package, &body)
    }

    fn records(&self, package: &str) -> Result<Arc<Vec<IndexRecord>>> {
        let key = package.to_lowercase();
        if let Some(records) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(records));
        }

        let records = Arc::new(self.fetch(package)?);
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&records));
        Ok(records)
    }
}

impl RepositorySource for HttpIndexSource {
    fn available_versions(&self, package: &str) -> Result<Vec<String>> {
        Ok(index::available_versions(&self.records(package)?))
    }

    fn dependencies_of(&self, package: &PackageRef) -> Result<Vec<DeclaredDependency>> {
        index::dependencies_of(&self.records(package.name())?, package.version()).ok_or_else(
            || DepVizError::PackageNotFound {
                package: package.to_string(),
            },
        )
    }

    fn describe(&self) -> String {
        format!("HTTP index {}", self.base_url)
    }
}
