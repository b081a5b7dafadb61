use serde_derive::Deserialize;


const ENV_PREFIX: &str = "OCTOPUS";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub port: u16,
    pub backlog: i32,
    /// Value of the `Server` response header.
    pub name: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8080,
            backlog: 128,
            name: crate::response::DEFAULT_SERVER_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StaticSettings {
    pub enabled: bool,
    pub root: String,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self { enabled: true, root: "./public".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `console` or `file`
    pub kind: String,
    pub level: String,
    pub file: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            kind: "console".to_string(),
            level: "info".to_string(),
            file: "octopus.log".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub static_files: StaticSettings,
    pub log: LogSettings,
}

impl Settings {
    /// Load settings from an optional file, then `OCTOPUS_*` environment
    /// variables (`OCTOPUS_SERVER__PORT=9000`). Missing keys keep their defaults.
    pub fn load(path: Option<&str>) -> Result<Settings, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()
    }
}
