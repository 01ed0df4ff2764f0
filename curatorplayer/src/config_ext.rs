//! Player settings stored in curatorconfig

use anyhow::Result;
use curatorconfig::Config;

const STORE_DIRECTORY: &[&str] = &["player", "store", "directory"];
const VOLUME: &[&str] = &["player", "volume"];

/// Default track store directory, relative to the config directory
const DEFAULT_STORE_DIRECTORY: &str = "cache";

/// File name of the SQLite track store inside the store directory
pub const TRACK_STORE_FILE: &str = "tracks.db";

/// Typed access to the `player` section of the configuration
pub trait PlayerConfigExt {
    /// Absolute track store directory, created if needed (default: `<config_dir>/cache`)
    fn get_track_store_dir(&self) -> Result<String>;

    /// Absolute or config-relative directory
    fn set_track_store_dir(&self, directory: String) -> Result<()>;

    /// Initial transport volume, clamped to 0..1 (default: 1.0)
    fn get_player_volume(&self) -> f32;

    fn set_player_volume(&self, volume: f32) -> Result<()>;
}

impl PlayerConfigExt for Config {
    fn get_track_store_dir(&self) -> Result<String> {
        self.get_managed_dir(STORE_DIRECTORY, DEFAULT_STORE_DIRECTORY)
    }

    fn set_track_store_dir(&self, directory: String) -> Result<()> {
        self.set_managed_dir(STORE_DIRECTORY, directory)
    }

    fn get_player_volume(&self) -> f32 {
        (self.get_f64(VOLUME, 1.0) as f32).clamp(0.0, 1.0)
    }

    fn set_player_volume(&self, volume: f32) -> Result<()> {
        self.set_f64(VOLUME, volume.clamp(0.0, 1.0) as f64)
    }
}
