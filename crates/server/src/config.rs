//! Server configuration: RON file with defaults, overridden from the command line.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write config: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[source] ron::error::SpannedError),
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub world: WorldConfig,
    pub server: TickConfig,
    pub dashboard: DashboardConfig,
    /// Fallback filter when `RUST_LOG` is unset.
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_addr: String,
    pub max_players: usize,
    /// How long a fresh connection has to send `Join`.
    pub join_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    /// Save directory (region files, entity records, `level.ron`).
    pub dir: PathBuf,
    /// 0 picks a random seed on first start.
    pub seed: u64,
    pub template: String,
    /// Chunks around spawn generated before the server accepts players.
    pub spawn_radius: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TickConfig {
    pub render_distance: u32,
    /// 0 means `num_cpus - 2`, at least one.
    pub generation_workers: usize,
    pub autosave_secs: u64,
    pub max_tick_delta_ms: u64,
    pub tick_sleep_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            world: WorldConfig::default(),
            server: TickConfig::default(),
            dashboard: DashboardConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:25575".to_string(),
            max_players: 20,
            join_timeout_secs: 10,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("world"),
            seed: 0,
            template: voxelcraft_engine::content::OVERWORLD.to_string(),
            spawn_radius: 2,
        }
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            render_distance: 4,
            generation_workers: 0,
            autosave_secs: 300,
            max_tick_delta_ms: 250,
            tick_sleep_ms: 5,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Load `path`, or write the defaults there when it does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
            let config: ServerConfig = ron::from_str(&contents).map_err(ConfigError::Parse)?;
            tracing::info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = ServerConfig::default();
            config.save(path)?;
            tracing::info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;
        std::fs::write(path, serialized).map_err(ConfigError::Write)
    }

    /// Worker threads for chunk generation, leaving two cores for the tick
    /// thread and the network runtime.
    pub fn generation_workers(&self) -> usize {
        match self.server.generation_workers {
            0 => num_cpus::get().saturating_sub(2).max(1),
            n => n,
        }
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref bind) = args.bind {
            self.network.bind_addr = bind.clone();
        }
        if let Some(ref dir) = args.world {
            self.world.dir = dir.clone();
        }
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(rd) = args.render_distance {
            self.server.render_distance = rd;
        }
        if let Some(port) = args.dashboard_port {
            self.dashboard.port = port;
        }
        if let Some(ref level) = args.log_level {
            self.log_level = level.clone();
        }
    }
}

/// Command-line arguments. Values given here override `server.ron`.
#[derive(Parser, Debug)]
#[command(name = "voxelcraft-server", about = "Voxelcraft dedicated server")]
pub struct CliArgs {
    /// Path to the config file.
    #[arg(long, default_value = "server.ron")]
    pub config: PathBuf,

    /// Listen address, e.g. 0.0.0.0:25575.
    #[arg(long)]
    pub bind: Option<String>,

    /// World save directory.
    #[arg(long)]
    pub world: Option<PathBuf>,

    /// World seed (only used when the world is created).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Render distance in chunks.
    #[arg(long)]
    pub render_distance: Option<u32>,

    /// Dashboard HTTP port.
    #[arg(long)]
    pub dashboard_port: Option<u16>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_ron() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.ron");

        let created = ServerConfig::load_or_default(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created, ServerConfig::default());
        assert_eq!(created.network.bind_addr, "0.0.0.0:25575");
        assert_eq!(created.dashboard.port, 8000);

        let mut edited = created.clone();
        edited.world.seed = 1234;
        edited.server.render_distance = 7;
        edited.save(&path).unwrap();
        assert_eq!(ServerConfig::load_or_default(&path).unwrap(), edited);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: ServerConfig = ron::from_str("(world: (seed: 99))").unwrap();
        assert_eq!(config.world.seed, 99);
        assert_eq!(config.world.spawn_radius, 2);
        assert_eq!(config.network.max_players, 20);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.ron");
        std::fs::write(&path, "(network: [").unwrap();
        assert!(matches!(
            ServerConfig::load_or_default(&path),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn cli_overrides_only_given_fields() {
        let mut config = ServerConfig::default();
        let args = CliArgs::parse_from([
            "voxelcraft-server",
            "--bind",
            "127.0.0.1:4000",
            "--seed",
            "7",
            "--log-level",
            "debug",
        ]);
        config.apply_cli_overrides(&args);
        assert_eq!(config.network.bind_addr, "127.0.0.1:4000");
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.server.render_distance, 4);
        assert_eq!(config.dashboard.port, 8000);
        assert_eq!(args.config, PathBuf::from("server.ron"));
    }

    #[test]
    fn zero_workers_means_automatic() {
        let mut config = ServerConfig::default();
        assert!(config.generation_workers() >= 1);
        config.server.generation_workers = 3;
        assert_eq!(config.generation_workers(), 3);
    }
}
