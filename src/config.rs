#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_TUTORTUBE_PORT: u16 = 8080;
pub const DEFAULT_TUTORTUBE_HOST: &str = "127.0.0.1";

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub www_root: PathBuf,
    pub tutortube_port: u16,
    pub tutortube_host: String,
}

#[derive(Debug, Clone, Default)]
pub struct RuntimeOverrides {
    pub www_root: Option<PathBuf>,
    pub tutortube_port: Option<u16>,
    pub tutortube_host: Option<String>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_runtime_settings(overrides: RuntimeOverrides) -> Result<RuntimeSettings> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_runtime_settings_with_overrides(&file_vars, env_var_string, overrides)
}

#[cfg(test)]
fn build_runtime_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Result<RuntimeSettings> {
    build_runtime_settings_with_overrides(file_vars, env_lookup, RuntimeOverrides::default())
}

fn build_runtime_settings_with_overrides(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: RuntimeOverrides,
) -> Result<RuntimeSettings> {
    let www_root = overrides
        .www_root
        .map(|path| path.to_string_lossy().into_owned())
        .or_else(|| lookup_value("WWW_ROOT", file_vars, &env_lookup))
        .ok_or_else(|| anyhow!("WWW_ROOT not set"))?;
    let tutortube_port = overrides
        .tutortube_port
        .or_else(|| {
            lookup_value("TUTORTUBE_PORT", file_vars, &env_lookup)
                .and_then(|value| value.parse::<u16>().ok())
        })
        .unwrap_or(DEFAULT_TUTORTUBE_PORT);
    let tutortube_host = overrides
        .tutortube_host
        .and_then(|value| {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        })
        .or_else(|| lookup_value("TUTORTUBE_HOST", file_vars, &env_lookup))
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_TUTORTUBE_HOST.to_string());
    Ok(RuntimeSettings {
        www_root: PathBuf::from(www_root),
        tutortube_port,
        tutortube_host,
    })
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| file_vars.get(key).cloned())
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
