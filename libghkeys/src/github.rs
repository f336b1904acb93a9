// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use reqwest::{Client, StatusCode};
use tracing::instrument;

use crate::error::Error;
use crate::http;

/// The public key listing GitHub serves for every account at
/// `<base_url>/<username>.keys`.
///
/// Validating a user and fetching its keys are two independent requests for
/// the same resource; nothing is cached between them.
#[derive(Clone, Debug)]
pub struct KeyListing {
    client: Client,
    base_url: String,
}

impl KeyListing {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL of the key listing for `username`.
    pub fn url(&self, username: &str) -> String {
        format!("{}/{}.keys", self.base_url, username)
    }

    /// Check that `username` is a GitHub account with a reachable key
    /// listing.
    ///
    /// Redirects are followed; only a final HTTP 200 counts as valid and any
    /// other status returns `Ok(false)`. Transport failures are returned as errors. The
    /// response body is never read.
    #[instrument(skip(self))]
    pub async fn check_username(&self, username: &str) -> Result<bool, Error> {
        tracing::info!(
            target: "libghkeys::github::check",
            "Checking for GitHub user {}",
            username
        );

        let response = http::get(&self.client, &self.url(username)).await?;
        if response.status() != StatusCode::OK {
            tracing::info!(
                target: "libghkeys::github::check",
                "{} is an invalid user",
                username
            );
            return Ok(false);
        }

        tracing::info!(
            target: "libghkeys::github::check",
            "Found valid user {}",
            username
        );
        Ok(true)
    }

    /// Stream the key listing of `username` into `path`, creating or
    /// truncating the file.
    ///
    /// Returns `Ok(true)` when the whole body was written. A failure while
    /// copying the body is logged and returns `Ok(false)`, leaving a possibly
    /// truncated file behind.
    #[instrument(skip(self, path))]
    pub async fn fetch_keys(
        &self,
        username: &str,
        path: &Path,
    ) -> Result<bool, Error> {
        tracing::info!(
            target: "libghkeys::ssh::authorized_keys",
            "Fetching keys for user {} into {}",
            username,
            path.display()
        );

        let mut authorized_keys = File::create(path)?;

        let url = self.url(username);
        let mut response = http::get(&self.client, &url).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::HttpStatus {
                endpoint: url,
                status,
            });
        }

        let mut written = 0_usize;
        loop {
            let copied = match response.chunk().await {
                Ok(Some(chunk)) => authorized_keys
                    .write_all(&chunk)
                    .map(|()| chunk.len())
                    .map_err(Error::from),
                Ok(None) => break,
                Err(error) => Err(Error::from(error)),
            };

            match copied {
                Ok(n) => written += n,
                Err(error) => {
                    tracing::warn!(
                        target: "libghkeys::ssh::authorized_keys",
                        ?error,
                        "Failed to copy keys for user {} after {} bytes",
                        username,
                        written
                    );
                    return Ok(false);
                }
            }
        }

        tracing::info!(
            target: "libghkeys::ssh::authorized_keys",
            "Wrote {} bytes of keys for user {}",
            written,
            username
        );
        Ok(true)
    }
}
