use std::path::Path;

use tracing::{info, warn};

use crate::error::AppError;

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

/// Settings read from the process environment after the env files are loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub otlp_endpoint: Option<String>,
    pub otlp_api_key: Option<String>,
    pub deployment_environment: String,
}

fn non_empty_var(name: &str) -> Option<String> {
    dotenvy::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = non_empty_var("DATABASE_URL").ok_or_else(|| {
            AppError::Internal("DATABASE_URL environment variable not set".to_string())
        })?;

        Ok(Self {
            database_url,
            otlp_endpoint: non_empty_var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            otlp_api_key: non_empty_var("OTEL_API_KEY"),
            deployment_environment: non_empty_var("DEPLOYMENT_ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),
        })
    }
}
