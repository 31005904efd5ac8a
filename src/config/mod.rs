mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{LoggingSettings, RegistrySettings, ServerSettings, Settings};

/// Loads the configuration from `config/default` (if present) and
/// `PSIPC__<SECTION>__<KEY>` environment variables, then fills anything
/// missing from the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("PSIPC")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    let server = partial.server.as_ref();
    let registry = partial.registry.as_ref();
    let logging = partial.logging.as_ref();

    Ok(Settings {
        server: ServerSettings {
            host: server
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server.and_then(|s| s.port).unwrap_or(default.server.port),
        },
        registry: RegistrySettings {
            topic_prefix: registry
                .and_then(|r| r.topic_prefix.clone())
                .unwrap_or(default.registry.topic_prefix),
            max_message_len: registry
                .and_then(|r| r.max_message_len)
                .unwrap_or(default.registry.max_message_len),
            max_surfaces: registry
                .and_then(|r| r.max_surfaces)
                .unwrap_or(default.registry.max_surfaces),
            list_chunk_len: registry
                .and_then(|r| r.list_chunk_len)
                .unwrap_or(default.registry.list_chunk_len),
            listing_lock: registry
                .and_then(|r| r.listing_lock)
                .unwrap_or(default.registry.listing_lock),
        },
        logging: LoggingSettings {
            level: logging
                .and_then(|l| l.level.clone())
                .unwrap_or(default.logging.level),
        },
    })
}
