//! Validator configuration.

use std::time::Duration;

/// Base URL of the NuGet.org symbol package endpoint
pub const NUGET_ORG_SYMBOL_PACKAGES: &str = "https://www.nuget.org/api/v2/symbolpackage/";

/// Base URL of the Microsoft public symbol server
pub const MICROSOFT_SYMBOL_SERVER: &str = "https://msdl.microsoft.com/download/symbols/";

/// Settings of a [`crate::validation::SymbolValidator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Timeout of one HTTP request
    pub network_timeout: Duration,
    /// Time budget for decoding the debug data of one file
    pub decode_timeout: Duration,
    /// Base URL for `{id}/{version}` symbol package downloads
    pub nuget_symbol_url: String,
    /// Base URL for symbol key lookups
    pub symbol_server_url: String,
    /// User agent of HTTP requests
    pub user_agent: String,
    /// Skip every remote symbol source
    pub disable_network: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        ValidatorOptions {
            network_timeout: Duration::from_secs(10),
            decode_timeout: Duration::from_secs(10),
            nuget_symbol_url: NUGET_ORG_SYMBOL_PACKAGES.to_string(),
            symbol_server_url: MICROSOFT_SYMBOL_SERVER.to_string(),
            user_agent: concat!("symscope/", env!("CARGO_PKG_VERSION")).to_string(),
            disable_network: false,
        }
    }
}
