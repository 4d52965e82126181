//! Configuration loading and management
//!
//! Handles parsing of `.routine.toml` in the data root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::trackers::{DrillPlan, ScheduleView};

pub const CONFIG_FILENAME: &str = ".routine.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where the file-backed remote keeps its tables
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Drill counter configuration
    #[serde(default)]
    pub drill: DrillConfig,

    /// Schedule log configuration
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// File-backed remote configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Table directory; relative paths resolve against the data root
    #[serde(default = "default_remote_dir")]
    pub dir: PathBuf,

    /// How long to wait for a table lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_remote_dir() -> PathBuf {
    PathBuf::from("tables")
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            dir: default_remote_dir(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl RemoteConfig {
    pub fn resolve_dir(&self, root: &Path) -> PathBuf {
        if self.dir.is_absolute() {
            self.dir.clone()
        } else {
            root.join(&self.dir)
        }
    }
}

/// Drill counter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillConfig {
    /// Amount added or removed per increment/decrement
    #[serde(default = "default_drill_step")]
    pub step: u32,

    /// Target for months without an override
    #[serde(default = "default_drill_target")]
    pub default_target: u32,

    /// Per-month targets keyed by `YYYY-MM`
    #[serde(default)]
    pub monthly_targets: BTreeMap<String, u32>,
}

fn default_drill_step() -> u32 {
    1
}

fn default_drill_target() -> u32 {
    20
}

impl Default for DrillConfig {
    fn default() -> Self {
        Self {
            step: default_drill_step(),
            default_target: default_drill_target(),
            monthly_targets: BTreeMap::new(),
        }
    }
}

impl DrillConfig {
    pub fn plan(&self) -> DrillPlan {
        DrillPlan {
            step: self.step,
            default_target: self.default_target,
            monthly_targets: self.monthly_targets.clone(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.step == 0 {
            return Err(Error::InvalidConfig("drill.step must be > 0".to_string()));
        }
        if self.default_target == 0 {
            return Err(Error::InvalidConfig(
                "drill.default_target must be > 0".to_string(),
            ));
        }
        for (label, target) in &self.monthly_targets {
            validate_month_label(label)?;
            if *target == 0 {
                return Err(Error::InvalidConfig(format!(
                    "drill.monthly_targets.{label} must be > 0"
                )));
            }
        }
        Ok(())
    }
}

fn validate_month_label(label: &str) -> Result<()> {
    let valid = label.len() == 7
        && format!("{label}-01").parse::<crate::datekey::DateKey>().is_ok();
    if !valid {
        return Err(Error::InvalidConfig(format!(
            "drill.monthly_targets: invalid month '{label}' (expected YYYY-MM)"
        )));
    }
    Ok(())
}

/// Schedule log configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// View for a new day: auto (by weekday), weekday, or weekend
    #[serde(default = "default_schedule_view")]
    pub default_view: String,
}

fn default_schedule_view() -> String {
    "auto".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_view: default_schedule_view(),
        }
    }
}

impl ScheduleConfig {
    /// Pinned default view, or `None` for auto.
    pub fn fixed_view(&self) -> Option<ScheduleView> {
        match self.default_view.trim() {
            "auto" => None,
            other => other.parse().ok(),
        }
    }

    fn validate(&self) -> Result<()> {
        let view = self.default_view.trim();
        if view == "auto" || view.parse::<ScheduleView>().is_ok() {
            return Ok(());
        }
        Err(Error::InvalidConfig(format!(
            "schedule.default_view: invalid view '{view}' (expected auto|weekday|weekend)"
        )))
    }
}

impl Config {
    /// Load configuration from a `.routine.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the data root, or return defaults
    pub fn load_from_root(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.drill.validate()?;
        self.schedule.validate()?;
        if self.remote.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "remote.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.remote.dir, PathBuf::from("tables"));
        assert_eq!(cfg.remote.lock_timeout_ms, DEFAULT_LOCK_TIMEOUT_MS);
        assert_eq!(cfg.drill.step, 1);
        assert_eq!(cfg.drill.default_target, 20);
        assert!(cfg.drill.monthly_targets.is_empty());
        assert_eq!(cfg.schedule.default_view, "auto");
        assert_eq!(cfg.schedule.fixed_view(), None);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILENAME);
        let content = r#"
[remote]
dir = "/srv/routine"
lock_timeout_ms = 250

[drill]
step = 5
default_target = 100

[drill.monthly_targets]
"2024-02" = 80
"2024-03" = 120

[schedule]
default_view = "weekend"
"#;
        fs::write(&path, content.trim()).expect("write config");

        let cfg = Config::load(&path).expect("load config");
        assert_eq!(cfg.remote.dir, PathBuf::from("/srv/routine"));
        assert_eq!(cfg.remote.lock_timeout_ms, 250);
        assert_eq!(cfg.drill.step, 5);
        let plan = cfg.drill.plan();
        assert_eq!(plan.target_for("2024-02"), 80);
        assert_eq!(plan.target_for("2024-04"), 100);
        assert_eq!(cfg.schedule.fixed_view(), Some(ScheduleView::Weekend));
    }

    #[test]
    fn invalid_values_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILENAME);

        for content in [
            "[drill]\nstep = 0\n",
            "[drill]\ndefault_target = 0\n",
            "[drill.monthly_targets]\n\"2024-13\" = 5\n",
            "[drill.monthly_targets]\n\"March\" = 5\n",
            "[schedule]\ndefault_view = \"holiday\"\n",
            "[remote]\nlock_timeout_ms = 0\n",
        ] {
            fs::write(&path, content).expect("write config");
            let err = Config::load(&path).unwrap_err();
            assert!(
                matches!(err, Error::InvalidConfig(_)),
                "expected InvalidConfig for {content:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn load_from_root_defaults_when_missing_or_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(Config::load_from_root(dir.path()), Config::default());

        fs::write(dir.path().join(CONFIG_FILENAME), "drill = 3").expect("write");
        assert_eq!(Config::load_from_root(dir.path()), Config::default());
    }

    #[test]
    fn relative_remote_dir_resolves_against_root() {
        let cfg = Config::default();
        assert_eq!(
            cfg.remote.resolve_dir(Path::new("/data")),
            PathBuf::from("/data/tables")
        );
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILENAME);
        let mut cfg = Config::default();
        cfg.drill.monthly_targets.insert("2024-05".to_string(), 31);

        cfg.save(&path).expect("save");
        let loaded = Config::load(&path).expect("load");
        assert_eq!(loaded, cfg);
    }
}
