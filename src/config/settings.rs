use serde::Deserialize;

use crate::broker::ListingLock;

/// Top-level configuration settings for the service.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub registry: RegistrySettings,
    pub logging: LoggingSettings,
}

/// Address the WebSocket server binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Registry limits and behaviour.
#[derive(Debug, Deserialize, Clone)]
pub struct RegistrySettings {
    /// Namespace every topic path starts with.
    pub topic_prefix: String,
    /// Longest request body accepted by a write; the rest is dropped.
    pub max_message_len: usize,
    /// Upper bound on live control surfaces (four per topic).
    pub max_surfaces: usize,
    /// Bytes handed out per listing read on the wire.
    pub list_chunk_len: usize,
    pub listing_lock: ListingLock,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub registry: Option<PartialRegistrySettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRegistrySettings {
    pub topic_prefix: Option<String>,
    pub max_message_len: Option<usize>,
    pub max_surfaces: Option<usize>,
    pub list_chunk_len: Option<usize>,
    pub listing_lock: Option<ListingLock>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            registry: RegistrySettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            topic_prefix: "psipc/topics/".to_string(),
            max_message_len: 100,
            max_surfaces: 4096,
            list_chunk_len: 4096,
            listing_lock: ListingLock::PerTopic,
        }
    }
}
