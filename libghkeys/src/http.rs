// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use reqwest::{header, redirect, Client};
use tracing::instrument;

use crate::error::Error;

/// Build the HTTP client shared by every request of a run.
///
/// Redirects are followed, up to 10 hops; the status of the final response
/// decides whether a user is valid.
pub(crate) fn client(request_timeout: Duration) -> Result<Client, Error> {
    let mut default_headers = header::HeaderMap::new();
    let user_agent = header::HeaderValue::from_static(concat!(
        "ghkeys-init/",
        env!("CARGO_PKG_VERSION")
    ));
    default_headers.insert(header::USER_AGENT, user_agent);

    Ok(Client::builder()
        .timeout(request_timeout)
        .redirect(redirect::Policy::limited(10))
        .default_headers(default_headers)
        .build()?)
}

/// Send a single HTTP GET request to the given URL with an empty body.
///
/// Any response, whatever its status, is returned to the caller; only
/// transport failures (connect, DNS, timeout) are errors. There is no retry.
#[instrument(err, skip(client), fields(http_status = tracing::field::Empty))]
pub(crate) async fn get(
    client: &Client,
    url: &str,
) -> Result<reqwest::Response, Error> {
    let response = client.get(url).send().await.map_err(|error| {
        tracing::error!(?error, "HTTP request failed to complete");
        error
    })?;

    let status = response.status();
    tracing::Span::current().record("http_status", status.as_u16());
    tracing::info!(
        target: "libghkeys::http::received",
        url = response.url().as_str(),
        "HTTP response received with status {}",
        status
    );

    Ok(response)
}
