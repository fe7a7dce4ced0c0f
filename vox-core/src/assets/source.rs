//! Where the clip archive comes from.

use crate::error::Result;

/// Produces the raw bytes of the clip archive.
pub trait ArchiveSource: Send + Sync + 'static {
    /// Fetch the whole archive.
    ///
    /// # Errors
    /// Any transport or status failure.
    fn fetch(&self) -> Result<Vec<u8>>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

#[cfg(feature = "fetch")]
pub use http::HttpArchiveSource;

#[cfg(feature = "fetch")]
mod http {
    use std::time::Duration;

    use anyhow::Context;
    use reqwest::blocking::Client;
    use tracing::info;

    use super::ArchiveSource;
    use crate::error::Result;

    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Downloads the archive with a blocking HTTP GET.
    ///
    /// The client is built inside `fetch`, on the calling thread: a blocking
    /// `reqwest` client must not be created or dropped on an async worker.
    #[derive(Debug, Clone)]
    pub struct HttpArchiveSource {
        url: String,
        timeout: Duration,
    }

    impl HttpArchiveSource {
        /// `timeout` bounds the whole request, body included.
        pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
            Self {
                url: url.into(),
                timeout,
            }
        }

        pub fn url(&self) -> &str {
            &self.url
        }

        fn client(&self) -> Result<Client> {
            let client = Client::builder()
                .user_agent(concat!("vox-core/", env!("CARGO_PKG_VERSION")))
                .connect_timeout(CONNECT_TIMEOUT.min(self.timeout))
                .timeout(self.timeout)
                .build()
                .context("failed to build HTTP client")?;
            Ok(client)
        }
    }

    impl ArchiveSource for HttpArchiveSource {
        fn fetch(&self) -> Result<Vec<u8>> {
            info!(url = %self.url, "downloading clip archive");
            let response = self
                .client()?
                .get(&self.url)
                .send()
                .with_context(|| format!("GET {} failed", self.url))?
                .error_for_status()
                .with_context(|| format!("GET {} returned an error status", self.url))?;
            let bytes = response
                .bytes()
                .with_context(|| format!("reading body of {} failed", self.url))?;
            Ok(bytes.to_vec())
        }

        fn describe(&self) -> String {
            self.url.clone()
        }
    }
}
