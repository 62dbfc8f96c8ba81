//! Server catalog: merging mirror documents and ranking by distance.

use crate::geo::Coordinates;
use crate::speedtest::error::FetchError;
use crate::speedtest::requests::config::Config;
use crate::speedtest::requests::fetch_document;
use crate::speedtest::requests::servers::{ServerRecord, ServersRequest};
use crate::speedtest::transport::Transport;
use futures::future::join_all;
use log::{debug, info, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// A test server with its distance from the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Server {
    pub id: u64,
    pub name: String,
    pub sponsor: String,
    pub country: String,
    pub country_code: String,
    pub host: Option<String>,
    pub url: String,
    pub url2: Option<String>,
    pub coordinates: Coordinates,
    pub distance_km: f64,
    /// Best observed round trip, set by the latency probe.
    #[serde(skip)]
    pub latency: Option<Duration>,
}

impl Server {
    /// Build a server from its published record, measuring the distance to
    /// `origin`.
    pub fn ranked(record: ServerRecord, origin: &Coordinates) -> Self {
        let coordinates = record.coordinates();

        Self {
            id: record.id,
            name: record.name,
            sponsor: record.sponsor,
            country: record.country,
            country_code: record.country_code,
            host: record.host,
            url: record.url,
            url2: record.url2,
            distance_km: coordinates.distance_to(origin),
            coordinates,
            latency: None,
        }
    }

    /// URL of `path` in the same directory as the server's upload endpoint.
    ///
    /// Works for absolute and scheme-relative URLs.
    pub fn relative_url(&self, path: &str) -> String {
        let base = self.url.split('?').next().unwrap_or(&self.url);
        let authority = base.find("//").map(|i| i + 2).unwrap_or(0);

        match base[authority..].rfind('/') {
            Some(i) => format!("{}{}", &base[..authority + i + 1], path),
            None => format!("{}/{}", base, path),
        }
    }

    /// Measured latency truncated to whole milliseconds.
    pub fn latency_millis(&self) -> Option<u128> {
        self.latency.map(|latency| latency.as_millis())
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}, {}) --- {:.2} km",
            self.id, self.sponsor, self.name, self.country, self.distance_km
        )
    }
}

/// Servers unique by id, closest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ServerCatalog {
    servers: Vec<Server>,
}

impl ServerCatalog {
    /// Sort by distance (id breaks ties) and keep the first entry per id.
    pub fn rank(mut servers: Vec<Server>) -> Self {
        sort_by_distance(&mut servers);
        Self { servers: dedup_by_id(servers) }
    }

    pub fn from_records(records: Vec<ServerRecord>, origin: &Coordinates) -> Self {
        Self::rank(
            records.into_iter().map(|record| Server::ranked(record, origin)).collect(),
        )
    }

    /// Order already-probed servers by latency, id breaking ties.
    pub(crate) fn rank_by_latency(mut servers: Vec<Server>) -> Self {
        servers.sort_by(|a, b| {
            let a_latency = a.latency.unwrap_or(Duration::MAX);
            let b_latency = b.latency.unwrap_or(Duration::MAX);
            a_latency.cmp(&b_latency).then_with(|| a.id.cmp(&b.id))
        });
        Self { servers }
    }

    pub fn find(&self, id: u64) -> Option<&Server> {
        self.servers.iter().find(|server| server.id == id)
    }

    /// The first `n` servers, or all of them if there are fewer.
    pub fn closest(&self, n: usize) -> ServerCatalog {
        Self { servers: self.servers.iter().take(n).cloned().collect() }
    }

    pub fn first(&self) -> Option<&Server> {
        self.servers.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Server> {
        self.servers.iter()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl IntoIterator for ServerCatalog {
    type Item = Server;
    type IntoIter = std::vec::IntoIter<Server>;

    fn into_iter(self) -> Self::IntoIter {
        self.servers.into_iter()
    }
}

impl<'a> IntoIterator for &'a ServerCatalog {
    type Item = &'a Server;
    type IntoIter = std::slice::Iter<'a, Server>;

    fn into_iter(self) -> Self::IntoIter {
        self.servers.iter()
    }
}

impl fmt::Display for ServerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for server in &self.servers {
            writeln!(f, "{}", server)?;
        }
        Ok(())
    }
}

fn compare_distance(a: &Server, b: &Server) -> Ordering {
    a.distance_km.total_cmp(&b.distance_km).then_with(|| a.id.cmp(&b.id))
}

/// Stable sort by ascending distance, then ascending id.
pub(crate) fn sort_by_distance(servers: &mut [Server]) {
    servers.sort_by(compare_distance);
}

/// Keep the first occurrence of every id.
pub(crate) fn dedup_by_id(servers: Vec<Server>) -> Vec<Server> {
    let mut seen = HashSet::with_capacity(servers.len());
    servers.into_iter().filter(|server| seen.insert(server.id)).collect()
}

/// Fetch every mirror concurrently and rank the merged list around the
/// client's location.
pub async fn load_catalog(
    transport: &dyn Transport,
    mirrors: &[&str],
    config: &Config,
) -> Result<ServerCatalog, FetchError> {
    let fetches: Vec<_> =
        mirrors.iter().map(|url| fetch_mirror(transport, url)).collect();

    let records: Vec<ServerRecord> =
        join_all(fetches).await.into_iter().flatten().collect();

    if records.is_empty() {
        return Err(FetchError::NoServersAvailable);
    }

    let total = records.len();
    let catalog = ServerCatalog::from_records(records, &config.client.coordinates());

    info!("Loaded {} servers ({} entries across mirrors)", catalog.len(), total);

    Ok(catalog)
}

async fn fetch_mirror(transport: &dyn Transport, url: &str) -> Vec<ServerRecord> {
    match fetch_document(transport, ServersRequest { url }).await {
        Ok(document) => {
            let records = document.into_records();
            debug!("{} servers from {}", records.len(), url);
            records
        }
        Err(e) => {
            warn!("Failed to retrieve server list from {}: {}", url, e);
            Vec::new()
        }
    }
}
