//! Config for connecting to A&AI.
use std::{num::NonZeroUsize, time::Duration};

use onap_client::{
    Client,
    aai::bulk::{AaiBulkConfig, BulkEndpoint},
};
use secrecy::{ExposeSecret, Secret};
use url::Url;

/// The A&AI endpoint of the ONAP demo deployment
pub const DEFAULT_AAI_URL: &str = "https://aai.api.sparky.simpledemo.onap.org:30233";

/// CLI config for the A&AI REST API.
#[derive(Debug, Clone, clap::Parser)]
pub struct AaiConfig {
    /// The base URL of the A&AI REST API
    #[clap(
        id = "aai_url",
        long = "aai-url",
        env = "ONAP_AAI_URL",
        default_value = DEFAULT_AAI_URL,
        action
    )]
    pub url: Url,

    /// The A&AI REST API version
    #[clap(
        id = "aai_api_version",
        long = "aai-api-version",
        env = "ONAP_AAI_API_VERSION",
        default_value = onap_client::aai::DEFAULT_API_VERSION,
        action
    )]
    pub api_version: String,

    /// Maximum number of operations sent in a single bulk request.
    #[clap(
        id = "aai_bulk_chunk",
        long = "aai-bulk-chunk",
        env = "ONAP_AAI_BULK_CHUNK",
        default_value = "30",
        action
    )]
    pub bulk_chunk: NonZeroUsize,

    /// The bulk API to send bulk requests to, `bulk` or `single-transaction`
    #[clap(
        id = "aai_bulk_endpoint",
        long = "aai-bulk-endpoint",
        env = "ONAP_AAI_BULK_ENDPOINT",
        default_value = "bulk",
        action
    )]
    pub bulk_endpoint: BulkEndpoint,

    /// Username for HTTP basic auth against A&AI
    #[clap(
        id = "aai_username",
        long = "aai-username",
        env = "ONAP_AAI_USERNAME",
        default_value = "AAI",
        action
    )]
    pub username: String,

    /// Password for HTTP basic auth against A&AI
    #[clap(
        id = "aai_password",
        long = "aai-password",
        env = "ONAP_AAI_PASSWORD",
        default_value = "AAI",
        hide_default_value = true,
        action
    )]
    pub password: Secret<String>,

    /// Value of the `X-FromAppId` header identifying the caller to A&AI
    #[clap(
        id = "aai_from_app_id",
        long = "aai-from-app-id",
        env = "ONAP_AAI_FROM_APP_ID",
        default_value = onap_client::DEFAULT_FROM_APP_ID,
        action
    )]
    pub from_app_id: String,

    /// Timeout for a single request to A&AI.
    ///
    /// Can be given in a human readable form, e.g., `500ms`, `30s` or `2m`.
    #[clap(
        id = "aai_request_timeout",
        long = "aai-request-timeout",
        env = "ONAP_AAI_REQUEST_TIMEOUT",
        default_value = "30s",
        value_parser = humantime::parse_duration,
        action
    )]
    pub request_timeout: Duration,
}

impl AaiConfig {
    /// Create a [`Client`] for the configured A&AI instance
    pub fn client(&self) -> Result<Client, onap_client::Error> {
        Client::new(self.url.clone())?
            .with_basic_auth(&self.username, self.password.expose_secret())
            .with_from_app_id(&self.from_app_id)
            .with_timeout(self.request_timeout)
    }

    /// The settings for an A&AI bulk submission engine
    pub fn bulk_config(&self) -> AaiBulkConfig {
        AaiBulkConfig::default()
            .with_api_version(&self.api_version)
            .with_chunk_size(self.bulk_chunk)
            .with_endpoint(self.bulk_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::Parser;

    #[test]
    fn test_defaults() {
        let config = AaiConfig::try_parse_from(["my_binary"]).unwrap();

        assert_eq!(config.url.as_str(), format!("{DEFAULT_AAI_URL}/"));
        assert_eq!(config.username, "AAI");
        assert_eq!(config.password.expose_secret(), "AAI");
        assert_eq!(config.from_app_id, "AAI");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(
            config.bulk_config(),
            AaiBulkConfig::default()
                .with_api_version("v27")
                .with_chunk_size(NonZeroUsize::new(30).unwrap())
                .with_endpoint(BulkEndpoint::Bulk)
        );
    }

    #[test]
    fn test_explicit() {
        let config = AaiConfig::try_parse_from([
            "my_binary",
            "--aai-url",
            "http://aai.onap:8443",
            "--aai-api-version",
            "v24",
            "--aai-bulk-chunk",
            "5",
            "--aai-bulk-endpoint",
            "single-transaction",
            "--aai-username",
            "admin",
            "--aai-password",
            "s3cr3t",
            "--aai-request-timeout",
            "1m 30s",
        ])
        .unwrap();

        assert_eq!(config.url.as_str(), "http://aai.onap:8443/");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password.expose_secret(), "s3cr3t");
        assert_eq!(config.request_timeout, Duration::from_secs(90));

        let bulk = config.bulk_config();
        assert_eq!(bulk.chunk_size.get(), 5);
        assert_eq!(bulk.endpoint, BulkEndpoint::SingleTransaction);
        assert_eq!(bulk.path(), "/aai/v24/bulk/single-transaction");

        let client = config.client().unwrap();
        assert_eq!(client.base_url().as_str(), "http://aai.onap:8443/");
    }

    #[test]
    fn test_invalid() {
        for args in [
            ["my_binary", "--aai-bulk-chunk", "0"],
            ["my_binary", "--aai-bulk-chunk", "-1"],
            ["my_binary", "--aai-bulk-endpoint", "batch"],
            ["my_binary", "--aai-url", "not a url"],
            ["my_binary", "--aai-request-timeout", "soon"],
        ] {
            assert!(
                AaiConfig::try_parse_from(args).is_err(),
                "accepted invalid args: {args:?}"
            );
        }
    }
}
