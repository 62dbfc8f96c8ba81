pub mod config;
pub mod servers;

use crate::speedtest::error::FetchError;
use crate::speedtest::transport::Transport;
use log::debug;
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// A remote XML document.
pub trait Request {
    type Response: DeserializeOwned;

    /// Human readable name used in errors and logs.
    const RESOURCE: &'static str;

    fn endpoint(&self) -> Cow<'_, str>;
}

impl<R: Request> Request for &R {
    type Response = R::Response;

    const RESOURCE: &'static str = R::RESOURCE;

    fn endpoint(&self) -> Cow<'_, str> {
        (**self).endpoint()
    }
}

/// GET `request`'s endpoint and decode the body.
pub async fn fetch_document<R: Request + Send + Sync>(
    transport: &dyn Transport,
    request: R,
) -> Result<R::Response, FetchError> {
    let endpoint = request.endpoint();

    let response = transport.get(&endpoint).await?.error_for_status()?;
    let url = response.url.clone();
    let content = response.bytes().await?;

    debug!("Fetched {} ({} bytes) from {}", R::RESOURCE, content.len(), url);

    decode_xml(R::RESOURCE, &content).map_err(|e| e.with_url(&url))
}

pub fn decode_xml<T: DeserializeOwned>(
    resource: &'static str,
    content: &[u8],
) -> Result<T, FetchError> {
    quick_xml::de::from_reader(content).map_err(|e| FetchError::decode(resource, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speedtest::mock::MockTransport;
    use crate::speedtest::requests::servers::ServersRequest;

    const MIRROR: &str = "http://mirror.example.net/speedtest-servers.php";

    #[tokio::test]
    async fn test_decode_failure_names_fetched_url() {
        let body = r#"<settings><servers><server id="oops" url="http://a/upload.php" lat="0" lon="0"/></servers></settings>"#;
        let transport = MockTransport::new().with_body(MIRROR, body);

        let error = fetch_document(&transport, ServersRequest { url: MIRROR })
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::Decode { resource: "server list", .. }));
        assert!(error.to_string().contains(MIRROR), "{}", error);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_decode() {
        let transport = MockTransport::new().with_failure(MIRROR, "connection reset");

        let error = fetch_document(&transport, ServersRequest { url: MIRROR })
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::Transport(_)));
    }
}
