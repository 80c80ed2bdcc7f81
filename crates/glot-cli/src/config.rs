//! Configuration vault – reads/writes `~/.glot/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted user configuration stored in `~/.glot/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Toolchain binary invoked on each cell (resolved through `PATH`).
    #[serde(default = "default_toolchain")]
    pub toolchain: String,

    /// Arguments inserted before the scratch-file path.
    #[serde(default)]
    pub toolchain_args: Vec<String>,

    /// Directory prepended to the child's `PATH`, for toolchains installed
    /// outside the default search path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolchain_bin_dir: Option<String>,

    /// File extension for scratch files handed to the toolchain.
    #[serde(default = "default_source_ext")]
    pub source_ext: String,

    /// Language name recorded in the kernelspec.
    #[serde(default = "default_language")]
    pub language: String,

    /// Human-facing kernel name recorded in the kernelspec.
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Directory name under the Jupyter kernels dir.
    #[serde(default = "default_kernel_name")]
    pub kernel_name: String,

    /// Where cell scratch files are written. Defaults to a `glot/`
    /// directory under the system temp dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<String>,

    /// Working directory for the toolchain child process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,

    /// Directories searched by `%include`, in order.
    #[serde(default = "default_include_dirs")]
    pub include_dirs: Vec<String>,

    /// Emit `#sourceLocation` directives into preprocessed cells.
    #[serde(default = "default_true")]
    pub source_location_directives: bool,
}

fn default_toolchain() -> String {
    "swift".to_string()
}
fn default_source_ext() -> String {
    "swift".to_string()
}
fn default_language() -> String {
    "swift".to_string()
}
fn default_display_name() -> String {
    "Swift".to_string()
}
fn default_kernel_name() -> String {
    "swift".to_string()
}
fn default_include_dirs() -> Vec<String> {
    vec!["/opt/swift/include".to_string()]
}
fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            toolchain: default_toolchain(),
            toolchain_args: Vec::new(),
            toolchain_bin_dir: None,
            source_ext: default_source_ext(),
            language: default_language(),
            display_name: default_display_name(),
            kernel_name: default_kernel_name(),
            scratch_dir: None,
            workdir: None,
            include_dirs: default_include_dirs(),
            source_location_directives: default_true(),
        }
    }
}

impl Config {
    /// Effective scratch directory: the configured one, or `$TMPDIR/glot`.
    pub fn effective_scratch_dir(&self) -> PathBuf {
        match &self.scratch_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("glot"),
        }
    }
}

/// Return the path to `~/.glot/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".glot").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Defaults with `GLOT_*` overrides applied.
///
/// Every fallback path (first run, unreadable config) goes through this,
/// so the environment overrides hold whether or not a config file exists.
pub fn default_with_overrides() -> Config {
    let mut cfg = Config::default();
    apply_env_overrides(&mut cfg);
    cfg
}

/// Apply `GLOT_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `GLOT_TOOLCHAIN` | `toolchain` |
/// | `GLOT_SCRATCH_DIR` | `scratch_dir` |
/// | `GLOT_WORKDIR` | `workdir` |
/// | `GLOT_KERNEL_NAME` | `kernel_name` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("GLOT_TOOLCHAIN") {
        cfg.toolchain = v;
    }
    if let Ok(v) = std::env::var("GLOT_SCRATCH_DIR") {
        cfg.scratch_dir = Some(v);
    }
    if let Ok(v) = std::env::var("GLOT_WORKDIR") {
        cfg.workdir = Some(v);
    }
    if let Ok(v) = std::env::var("GLOT_KERNEL_NAME") {
        cfg.kernel_name = v;
    }
}

/// Save the config to disk, creating `~/.glot/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Write the file with owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let file_meta = std::fs::metadata(&path).expect("file metadata");
        let file_mode = file_meta.permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");

        let dir_meta = std::fs::metadata(path.parent().unwrap()).expect("dir metadata");
        let dir_mode = dir_meta.permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700, "config directory must have 0o700 permissions");
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        // Only assert fields without GLOT_* overrides; the override tests
        // mutate process-global env vars and may run concurrently.
        assert_eq!(loaded.source_ext, "swift");
        assert_eq!(loaded.display_name, "Swift");
        assert_eq!(loaded.include_dirs, vec!["/opt/swift/include".to_string()]);
        assert!(loaded.source_location_directives);
    }

    #[test]
    fn config_path_points_to_glot_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".glot"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[test]
    fn effective_scratch_dir_defaults_under_tmp() {
        let cfg = Config::default();
        assert!(cfg.effective_scratch_dir().ends_with("glot"));

        let mut cfg = Config::default();
        cfg.scratch_dir = Some("/var/lib/glot/cells".to_string());
        assert_eq!(
            cfg.effective_scratch_dir(),
            PathBuf::from("/var/lib/glot/cells")
        );
    }

    #[test]
    fn overrides_apply_when_no_config_file_exists() {
        // SAFETY: no other test touches GLOT_WORKDIR.
        unsafe { std::env::set_var("GLOT_WORKDIR", "/srv/glot/cells") };
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("load ok").is_none());

        let cfg = default_with_overrides();
        assert_eq!(cfg.workdir.as_deref(), Some("/srv/glot/cells"));
        unsafe { std::env::remove_var("GLOT_WORKDIR") };
    }

    #[test]
    fn apply_env_overrides_changes_toolchain() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("GLOT_TOOLCHAIN", "/opt/toolchain/bin/swift") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.toolchain, "/opt/toolchain/bin/swift");
        unsafe { std::env::remove_var("GLOT_TOOLCHAIN") };
    }

    #[test]
    fn apply_env_overrides_changes_scratch_dir() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("GLOT_SCRATCH_DIR", "/tmp/elsewhere") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.scratch_dir.as_deref(), Some("/tmp/elsewhere"));
        unsafe { std::env::remove_var("GLOT_SCRATCH_DIR") };
    }

    #[test]
    fn apply_env_overrides_changes_kernel_name() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("GLOT_KERNEL_NAME", "swift-dev") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.kernel_name, "swift-dev");
        unsafe { std::env::remove_var("GLOT_KERNEL_NAME") };
    }
}
