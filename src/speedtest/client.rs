use crate::speedtest::cache::ResourceCache;
use crate::speedtest::error::FetchError;
use crate::speedtest::requests::config::{Config, ConfigRequest};
use crate::speedtest::requests::fetch_document;
use crate::speedtest::requests::servers::SERVER_LIST_URLS;
use crate::speedtest::servers::{load_catalog, Server, ServerCatalog};
use crate::speedtest::transport::{ReqwestTransport, Transport, TransportOptions};
use log::info;
use std::sync::Arc;

/// Entry point to speedtest.net.
///
/// Configuration and the server catalog are fetched lazily, once per client,
/// and shared by every caller.
pub struct Client {
    transport: Arc<dyn Transport>,
    config: ResourceCache<Config>,
    servers: ResourceCache<ServerCatalog>,
    mirrors: Vec<&'static str>,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: ResourceCache::new("configuration"),
            servers: ResourceCache::new("server list"),
            mirrors: SERVER_LIST_URLS.to_vec(),
        }
    }

    /// A client talking HTTP through reqwest.
    pub fn with_options(options: &TransportOptions) -> Result<Self, FetchError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new(options)?)))
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.transport)
    }

    pub async fn config(&self) -> Result<Arc<Config>, FetchError> {
        let transport = self.transport();

        self.config
            .fetch(move || async move {
                info!("Retrieving speedtest.net configuration...");
                fetch_document(transport.as_ref(), ConfigRequest {}).await
            })
            .await
    }

    /// Every known server, closest first.
    pub async fn servers(&self) -> Result<Arc<ServerCatalog>, FetchError> {
        let config = self.config().await?;
        let transport = self.transport();
        let mirrors = self.mirrors.clone();

        self.servers
            .fetch(move || async move {
                info!("Retrieving speedtest.net server list...");
                load_catalog(transport.as_ref(), &mirrors, &config).await
            })
            .await
    }

    pub async fn closest_servers(&self, n: usize) -> Result<ServerCatalog, FetchError> {
        Ok(self.servers().await?.closest(n))
    }

    pub async fn find_server(&self, id: u64) -> Result<Server, FetchError> {
        self.servers()
            .await?
            .find(id)
            .cloned()
            .ok_or(FetchError::ServerNotFound(id))
    }
}
