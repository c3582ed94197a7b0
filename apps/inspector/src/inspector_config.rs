use std::env;
use std::path::PathBuf;
use std::time::Duration;

use rbac_inspector_core::{AppError, AppResult};
use rbac_inspector_infrastructure::KubernetesConnectionConfig;

#[derive(Debug, Clone)]
pub struct InspectorConfig {
    pub connection: KubernetesConnectionConfig,
    pub resolve_roles: bool,
    pub list_on_start: bool,
}

impl InspectorConfig {
    pub fn load() -> AppResult<Self> {
        let host = required_env("KUBE_HOST")?;
        let token_file = PathBuf::from(required_env("KUBE_TOKEN_FILE")?);
        let insecure_skip_tls_verify = parse_env_bool("KUBE_INSECURE_SKIP_TLS_VERIFY", true)?;
        let connect_timeout_ms = parse_env_u64("INSPECTOR_CONNECT_TIMEOUT_MS", 5_000)?;
        let request_timeout_ms = parse_env_u64("INSPECTOR_REQUEST_TIMEOUT_MS", 15_000)?;
        let resolve_roles = parse_env_bool("INSPECTOR_RESOLVE_ROLES", true)?;
        let list_on_start = parse_env_bool("INSPECTOR_LIST_ON_START", true)?;

        if connect_timeout_ms == 0 || request_timeout_ms == 0 {
            return Err(AppError::Validation(
                "INSPECTOR_CONNECT_TIMEOUT_MS and INSPECTOR_REQUEST_TIMEOUT_MS must be greater than zero"
                    .to_owned(),
            ));
        }

        Ok(Self {
            connection: KubernetesConnectionConfig {
                host,
                token_file,
                insecure_skip_tls_verify,
                connect_timeout: Duration::from_millis(connect_timeout_ms),
                request_timeout: Duration::from_millis(request_timeout_ms),
            },
            resolve_roles,
            list_on_start,
        })
    }
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => parse_bool(name, value.as_str()),
        Err(_) => Ok(default),
    }
}

fn parse_bool(name: &str, value: &str) -> AppResult<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") || value == "1" {
        return Ok(true);
    }
    if value.eq_ignore_ascii_case("false") || value == "0" {
        return Ok(false);
    }

    Err(AppError::Validation(format!(
        "invalid {name} value '{value}': expected true or false"
    )))
}
