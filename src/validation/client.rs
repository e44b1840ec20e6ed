//! HTTP access to remote symbol sources.

use crate::{validation::ValidatorOptions, Error, Result};

/// Fetches symbol packages and PDBs over HTTP
pub trait SymbolClient: Send + Sync {
    /// `GET` `url` with the extra request `headers` and return the body.
    ///
    /// # Errors
    /// Returns [`Error::Network`] for connection failures, timeouts and non-success statuses.
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>>;
}

/// [`SymbolClient`] backed by a blocking `reqwest` client
pub struct HttpSymbolClient {
    client: reqwest::blocking::Client,
}

impl HttpSymbolClient {
    /// Create a client with the timeout and user agent of `options`.
    ///
    /// # Errors
    /// Returns [`Error::Network`] if the TLS backend cannot be initialized.
    pub fn new(options: &ValidatorOptions) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.network_timeout)
            .user_agent(options.user_agent.as_str())
            .build()?;

        Ok(HttpSymbolClient { client })
    }
}

impl SymbolClient for HttpSymbolClient {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(Error::Network(format!("HTTP {} from {url}", response.status())));
        }

        Ok(response.bytes()?.to_vec())
    }
}
