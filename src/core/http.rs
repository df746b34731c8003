use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING};
use reqwest::Client;

use crate::core::error::UpdaterResult;

/// Sent with every registry and download request; Modrinth asks clients to
/// identify themselves.
pub const USER_AGENT: &str = concat!("server-updater/", env!("CARGO_PKG_VERSION"));

/// Client shared by the registry clients and the downloader.
pub fn build_http_client() -> UpdaterResult<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json, */*"));

    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(default_headers)
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn identifies_itself() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/ping")
                    .header("user-agent", USER_AGENT);
                then.status(204);
            })
            .await;

        let client = build_http_client().unwrap();
        let resp = client.get(server.url("/ping")).send().await.unwrap();

        mock.assert_async().await;
        assert_eq!(resp.status().as_u16(), 204);
    }
}
