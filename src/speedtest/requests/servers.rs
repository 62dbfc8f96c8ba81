extern crate serde;

use crate::geo::Coordinates;
use crate::speedtest::requests::Request;
use serde::Deserialize;
use std::borrow::Cow;

/// Mirrors publishing the server catalog. All of them are queried and merged.
pub const SERVER_LIST_URLS: [&str; 4] = [
    "://www.speedtest.net/speedtest-servers-static.php",
    "://c.speedtest.net/speedtest-servers-static.php",
    "://www.speedtest.net/speedtest-servers.php",
    "://c.speedtest.net/speedtest-servers.php",
];

/// One `<server>` entry as published by a mirror.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerRecord {
    #[serde(rename = "@id")]
    pub id: u64,
    #[serde(rename = "@url")]
    pub url: String,
    #[serde(rename = "@url2", default)]
    pub url2: Option<String>,
    #[serde(rename = "@lat")]
    pub latitude: f64,
    #[serde(rename = "@lon")]
    pub longitude: f64,
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "@country", default)]
    pub country: String,
    #[serde(rename = "@cc", default)]
    pub country_code: String,
    #[serde(rename = "@sponsor", default)]
    pub sponsor: String,
    #[serde(rename = "@host", default)]
    pub host: Option<String>,
}

impl ServerRecord {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ServersDocument {
    #[serde(default)]
    servers: ServerList,
}

#[derive(Debug, Default, Deserialize)]
struct ServerList {
    #[serde(rename = "server", default)]
    entries: Vec<ServerRecord>,
}

impl ServersDocument {
    pub fn into_records(self) -> Vec<ServerRecord> {
        self.servers.entries
    }
}

pub struct ServersRequest<'a> {
    pub url: &'a str,
}

impl Request for ServersRequest<'_> {
    type Response = ServersDocument;

    const RESOURCE: &'static str = "server list";

    fn endpoint(&self) -> Cow<'_, str> {
        self.url.into()
    }
}
