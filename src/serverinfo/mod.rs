use serde::de::{Error as DeError, IgnoredAny, MapAccess, Unexpected, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

use crate::error::ScrapeError;

mod url;

pub use url::info_url;

/// Complete data received from the serverinfo endpoint of one scrape.
///
/// Decoding is all-or-nothing and the result is never mutated afterwards.
/// Sections a server version does not report decode to their zero value, so
/// callers never have to distinguish "absent" from "empty".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub meta: Meta,
    pub data: Data,
}

/// Result of the remote call as reported by the server itself, distinct from
/// the HTTP status.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Meta {
    pub status: String,
    #[serde(rename = "statuscode")]
    pub status_code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Data {
    pub nextcloud: Nextcloud,
    pub server: Server,
    #[serde(rename = "activeUsers")]
    pub active_users: ActiveUsers,
}

/// Information about the Nextcloud installation itself.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Nextcloud {
    pub system: System,
    pub storage: Storage,
    pub shares: Shares,
}

/// Nextcloud configuration and system information.
///
/// The boolean fields arrive as the literal strings "yes"/"no" on the wire;
/// see [`yes_no_bool`]. `freespace` is signed because some server versions
/// use negative sentinels for "unknown".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct System {
    pub version: String,
    pub theme: String,
    #[serde(deserialize_with = "yes_no_bool")]
    pub enable_avatars: bool,
    #[serde(deserialize_with = "yes_no_bool")]
    pub enable_previews: bool,
    #[serde(rename = "memcache.local")]
    pub memcache_local: String,
    #[serde(rename = "memcache.distributed")]
    pub memcache_distributed: String,
    #[serde(rename = "memcache.locking")]
    pub memcache_locking: String,
    #[serde(rename = "filelocking.enabled", deserialize_with = "yes_no_bool")]
    pub filelocking_enabled: bool,
    #[serde(deserialize_with = "yes_no_bool")]
    pub debug: bool,
    #[serde(rename = "freespace")]
    pub free_space: i64,
    pub apps: Apps,
}

/// App counts. Servers that were asked to skip the app listing (or that
/// predate it) simply omit the section, which decodes to zeros.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Apps {
    #[serde(rename = "num_installed")]
    pub installed: u64,
    #[serde(rename = "num_updates_available")]
    pub available_updates: u64,
}

/// Information about the Nextcloud storage system.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Storage {
    #[serde(rename = "num_users")]
    pub users: u64,
    #[serde(rename = "num_files")]
    pub files: u64,
    #[serde(rename = "num_storages")]
    pub storages: u64,
    #[serde(rename = "num_storages_local")]
    pub storages_local: u64,
    #[serde(rename = "num_storages_home")]
    pub storages_home: u64,
    #[serde(rename = "num_storages_other")]
    pub storages_other: u64,
}

/// Share counts by type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Shares {
    #[serde(rename = "num_shares")]
    pub total: u64,
    #[serde(rename = "num_shares_user")]
    pub user: u64,
    #[serde(rename = "num_shares_groups")]
    pub group: u64,
    #[serde(rename = "num_shares_link")]
    pub link: u64,
    #[serde(rename = "num_shares_link_no_password")]
    pub link_no_password: u64,
    #[serde(rename = "num_shares_mail")]
    pub mail: u64,
    #[serde(rename = "num_shares_room")]
    pub room: u64,
    #[serde(rename = "num_fed_shares_sent")]
    pub federated_sent: u64,
    #[serde(rename = "num_fed_shares_received")]
    pub federated_received: u64,
}

/// Information about the servers running Nextcloud.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Server {
    pub webserver: String,
    pub php: Php,
    pub database: Database,
}

/// PHP runtime configuration. The limits are signed 64-bit because `-1`
/// means "unlimited".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Php {
    pub version: String,
    pub memory_limit: i64,
    pub max_execution_time: i64,
    pub upload_max_filesize: i64,
}

/// Information about the database backing Nextcloud.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Database {
    #[serde(rename = "type")]
    pub db_type: String,
    pub version: String,
    #[serde(deserialize_with = "database_size")]
    pub size: u64,
}

/// Active user counts over the three windows the server reports.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ActiveUsers {
    #[serde(rename = "last5minutes")]
    pub last_5_minutes: u64,
    #[serde(rename = "last1hour")]
    pub last_hour: u64,
    #[serde(rename = "last24hours")]
    pub last_day: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OcsEnvelope {
    ocs: ServerInfo,
}

/// Decodes a JSON serverinfo payload, unwrapping the `{"ocs": ...}` envelope.
pub fn decode_json(bytes: &[u8]) -> Result<ServerInfo, ScrapeError> {
    match serde_json::from_slice::<OcsEnvelope>(bytes) {
        Ok(envelope) => Ok(envelope.ocs),
        Err(err) if err.classify() == serde_json::error::Category::Data => {
            Err(ScrapeError::FieldType(err.to_string()))
        }
        Err(err) => Err(ScrapeError::Decode(err.to_string())),
    }
}

/// Decodes a legacy XML serverinfo payload (`<ocs>` root element).
pub fn decode_xml(bytes: &[u8]) -> Result<ServerInfo, ScrapeError> {
    quick_xml::de::from_reader(bytes).map_err(|err| match err {
        quick_xml::DeError::Custom(msg) => ScrapeError::FieldType(msg),
        other => ScrapeError::Decode(other.to_string()),
    })
}

/// The XML deserializer answers `deserialize_any` for a text-bearing element
/// with a map that carries the text under the "$text" key. Extracting it here
/// lets both wire formats run through the same string logic in the visitors
/// below.
fn text_entry<'de, A>(map: &mut A) -> Result<Option<String>, A::Error>
where
    A: MapAccess<'de>,
{
    let mut text = None;
    while let Some(key) = map.next_key::<String>()? {
        if key == "$text" {
            text = Some(map.next_value()?);
        } else {
            map.next_value::<IgnoredAny>()?;
        }
    }
    Ok(text)
}

/// Servers transmit booleans as strings: exactly "yes" means true, any other
/// string (including "no", "true" or empty) means false. Actual JSON booleans
/// from newer versions pass through unchanged. Never an error.
fn yes_no_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct YesNoVisitor;

    impl<'de> Visitor<'de> for YesNoVisitor {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a \"yes\"/\"no\" string or a boolean")
        }

        fn visit_str<E: DeError>(self, value: &str) -> Result<bool, E> {
            Ok(value == "yes")
        }

        fn visit_bool<E: DeError>(self, value: bool) -> Result<bool, E> {
            Ok(value)
        }

        // An empty element carries no text at all; that is still "not yes".
        fn visit_unit<E: DeError>(self) -> Result<bool, E> {
            Ok(false)
        }

        fn visit_map<A>(self, mut map: A) -> Result<bool, A::Error>
        where
            A: MapAccess<'de>,
        {
            Ok(matches!(text_entry(&mut map)?.as_deref(), Some("yes")))
        }
    }

    deserializer.deserialize_any(YesNoVisitor)
}

/// The database size switches between a JSON number and a decimal string
/// depending on the server version, so both are accepted here. Negative
/// sizes and non-numeric strings are real decode failures; any other type
/// fails through the visitor's type error.
fn database_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct SizeVisitor;

    impl<'de> Visitor<'de> for SizeVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("database size as an integer or a string")
        }

        fn visit_u64<E: DeError>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: DeError>(self, value: i64) -> Result<u64, E> {
            if value < 0 {
                return Err(E::custom("negative database size"));
            }
            Ok(value as u64)
        }

        fn visit_f64<E: DeError>(self, value: f64) -> Result<u64, E> {
            if value < 0.0 {
                return Err(E::custom("negative database size"));
            }
            // Some engines report the size as a float-typed integer; a
            // fractional size is never valid.
            if value.fract() != 0.0 {
                return Err(E::custom(format!("can not parse {value:?} as integer")));
            }
            Ok(value as u64)
        }

        fn visit_str<E: DeError>(self, value: &str) -> Result<u64, E> {
            let size: i64 = value
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("can not parse {value:?} as integer")))?;
            self.visit_i64(size)
        }

        fn visit_map<A>(self, mut map: A) -> Result<u64, A::Error>
        where
            A: MapAccess<'de>,
        {
            match text_entry(&mut map)? {
                Some(text) => self.visit_str(&text),
                None => Err(DeError::invalid_type(Unexpected::Map, &self)),
            }
        }
    }

    deserializer.deserialize_any(SizeVisitor)
}
