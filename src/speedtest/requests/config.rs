extern crate serde;

use crate::geo::Coordinates;
use crate::speedtest::requests::Request;
use serde::de::{Error, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::borrow::Cow;
use std::fmt::Formatter;

pub const CONFIG_URL: &str = "://www.speedtest.net/speedtest-config.php";

/// Upper bound on `dlN`/`ulN` positions accepted from the document.
const MAX_TRANSFER_HINTS: usize = 64;

/// The tester's own view of the world as reported by speedtest.net.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub client: ClientConfig,
    #[serde(default)]
    pub times: TransferHints,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientConfig {
    #[serde(rename = "@ip")]
    pub ip: String,
    #[serde(rename = "@isp")]
    pub isp: String,
    #[serde(rename = "@lat")]
    pub latitude: f64,
    #[serde(rename = "@lon")]
    pub longitude: f64,
    #[serde(rename = "@country", default)]
    pub country: String,
    #[serde(rename = "@isprating", default)]
    pub isp_rating: f32,
    #[serde(rename = "@rating", default)]
    pub rating: f32,
    #[serde(rename = "@ispdlavg", default)]
    pub isp_download_average: u32,
    #[serde(rename = "@ispulavg", default)]
    pub isp_upload_average: u32,
    #[serde(rename = "@loggedin", default)]
    pub logged_in: u8,
}

impl ClientConfig {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Historical (upload, download) duration hints for one schedule position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferHint {
    pub upload: u32,
    pub download: u32,
}

/// The `<times dl1=".." ul1=".." ...>` schedule, indexed from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferHints(Vec<TransferHint>);

impl TransferHints {
    pub fn get(&self, position: usize) -> Option<TransferHint> {
        self.0.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for TransferHints {
    fn deserialize<D>(deserializer: D) -> Result<TransferHints, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(TransferHintsVisitor)
    }
}

struct TransferHintsVisitor;

impl<'de> Visitor<'de> for TransferHintsVisitor {
    type Value = TransferHints;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("dlN/ulN attributes holding unsigned integers")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut hints: Vec<TransferHint> = Vec::new();

        while let Some(key) = map.next_key::<String>()? {
            let name = key.trim_start_matches('@');

            let (download, position) = if let Some(n) = name.strip_prefix("dl") {
                (true, n)
            } else if let Some(n) = name.strip_prefix("ul") {
                (false, n)
            } else {
                map.next_value::<IgnoredAny>()?;
                continue;
            };

            let position: usize = position.parse().map_err(|_| {
                A::Error::custom(format!("invalid transfer hint `{}`", name))
            })?;
            if position == 0 || position > MAX_TRANSFER_HINTS {
                return Err(A::Error::custom(format!(
                    "transfer hint `{}` out of range",
                    name
                )));
            }

            let value: String = map.next_value()?;
            let value: u32 = value.trim().parse().map_err(|_| {
                A::Error::custom(format!("invalid value `{}` for `{}`", value, name))
            })?;

            if hints.len() < position {
                hints.resize(position, TransferHint::default());
            }
            let hint = &mut hints[position - 1];
            if download {
                hint.download = value;
            } else {
                hint.upload = value;
            }
        }

        Ok(TransferHints(hints))
    }
}

pub struct ConfigRequest {}

impl Request for ConfigRequest {
    type Response = Config;

    const RESOURCE: &'static str = "configuration";

    fn endpoint(&self) -> Cow<'_, str> {
        CONFIG_URL.into()
    }
}
