use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: Some(4) }
    }
}

/// What a collection does when its backing file does not exist yet.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OnMissing {
    /// Reading fails with a storage error.
    Fail,
    /// Write an empty collection and carry on.
    InitializeEmpty,
}

/// How product ids are assigned on creation.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Random v4 UUID, ignoring any id in the input.
    #[default]
    Random,
    /// The caller provides the id; it must be unique.
    CallerSupplied,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_products_file")]
    pub products_file: String,
    #[serde(default = "default_carts_file")]
    pub carts_file: String,
    #[serde(default = "default_products_on_missing")]
    pub products_on_missing: OnMissing,
    #[serde(default = "default_carts_on_missing")]
    pub carts_on_missing: OnMissing,
    #[serde(default)]
    pub product_ids: IdStrategy,
    #[serde(default = "default_public_dir")]
    pub public_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            products_file: default_products_file(),
            carts_file: default_carts_file(),
            products_on_missing: default_products_on_missing(),
            carts_on_missing: default_carts_on_missing(),
            product_ids: IdStrategy::default(),
            public_dir: default_public_dir(),
        }
    }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_data_dir() -> String { "data".into() }
fn default_products_file() -> String { "data/products.json".into() }
fn default_carts_file() -> String { "data/carts.json".into() }
fn default_products_on_missing() -> OnMissing { OnMissing::Fail }
fn default_carts_on_missing() -> OnMissing { OnMissing::InitializeEmpty }
fn default_public_dir() -> String { "public".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// File config when present, otherwise defaults with `SERVER_HOST` /
    /// `SERVER_PORT` applied. A file that exists but does not parse or
    /// validate is an error.
    pub fn load_or_env() -> Result<Self> {
        match Self::load_and_validate() {
            Ok(cfg) => Ok(cfg),
            Err(e) if !is_not_found(&e) => Err(e),
            Err(_) => {
                let mut cfg = AppConfig::default();
                if let Ok(host) = std::env::var("SERVER_HOST") {
                    cfg.server.host = host;
                }
                if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
                    cfg.server.port = port;
                }
                cfg.normalize_and_validate()?;
                Ok(cfg)
            }
        }
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.storage.validate()?;
        Ok(())
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.products_file.trim().is_empty() || self.carts_file.trim().is_empty() {
            return Err(anyhow!("storage.products_file and storage.carts_file must not be empty"));
        }
        if self.products_file == self.carts_file {
            return Err(anyhow!("products and carts cannot share one file"));
        }
        Ok(())
    }
}
