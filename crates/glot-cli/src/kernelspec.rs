//! Kernelspec registration – writes a Jupyter `kernel.json` so notebook
//! hosts can discover and launch this front-end.
//!
//! The spec's `argv` points at the current executable with the standard
//! `-f {connection_file}` convention. The environment map prepends the
//! toolchain bin directory to `PATH` when one is configured, so the child
//! toolchain resolves the same way it did at install time.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::toolchain;

/// The JSON document written as `kernel.json`.
#[derive(Debug, Clone, Serialize)]
pub struct KernelSpec {
    pub argv: Vec<String>,
    pub display_name: String,
    pub language: String,
    pub env: BTreeMap<String, String>,
}

/// Build the kernelspec for the current executable and `cfg`.
pub fn build_spec(cfg: &Config) -> Result<KernelSpec, String> {
    let exe = std::env::current_exe()
        .map_err(|e| format!("cannot determine current executable: {}", e))?;

    let mut env = BTreeMap::new();
    if let Some(bin_dir) = &cfg.toolchain_bin_dir {
        let path = std::env::var("PATH").unwrap_or_default();
        env.insert("PATH".to_string(), format!("{}:{}", bin_dir, path));
    }

    Ok(KernelSpec {
        argv: vec![
            exe.to_string_lossy().into_owned(),
            "-f".to_string(),
            "{connection_file}".to_string(),
        ],
        display_name: cfg.display_name.clone(),
        language: cfg.language.clone(),
        env,
    })
}

/// Directory Jupyter scans for user kernelspecs:
/// `$XDG_DATA_HOME/jupyter/kernels`, defaulting to
/// `~/.local/share/jupyter/kernels`.
pub fn kernels_dir() -> Result<PathBuf, String> {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return Ok(PathBuf::from(data_home).join("jupyter").join("kernels"));
    }
    let home = std::env::var("HOME").map_err(|_| "HOME is not set".to_string())?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("share")
        .join("jupyter")
        .join("kernels"))
}

/// Validate the environment the kernelspec will rely on: the toolchain
/// binary must be resolvable.
pub fn validate_kernel_env(cfg: &Config) -> Result<(), String> {
    if let Some(bin_dir) = &cfg.toolchain_bin_dir {
        let candidate = Path::new(bin_dir).join(&cfg.toolchain);
        if candidate.exists() {
            return Ok(());
        }
    }
    if toolchain::is_available(&cfg.toolchain) {
        return Ok(());
    }
    Err(format!(
        "toolchain '{}' is not installed or not on PATH",
        cfg.toolchain
    ))
}

/// Register the kernelspec, returning the path of the written
/// `kernel.json`.
pub fn install(cfg: &Config) -> Result<PathBuf, String> {
    validate_kernel_env(cfg)?;
    let spec = build_spec(cfg)?;
    install_to(cfg, &spec, &kernels_dir()?)
}

/// Write `kernel.json` for `spec` under `base/<kernel_name>/`.
pub(crate) fn install_to(cfg: &Config, spec: &KernelSpec, base: &Path) -> Result<PathBuf, String> {
    let dir = base.join(&cfg.kernel_name);
    fs::create_dir_all(&dir)
        .map_err(|e| format!("failed to create {}: {}", dir.display(), e))?;
    // The kernels dir must be world-readable for the notebook server.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755))
            .map_err(|e| format!("failed to set permissions on {}: {}", dir.display(), e))?;
    }

    let path = dir.join("kernel.json");
    let json = serde_json::to_string_pretty(spec)
        .map_err(|e| format!("failed to serialize kernelspec: {}", e))?;
    fs::write(&path, json).map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
    Ok(path)
}
