//! Vote-store connection configuration.
//!
//! Credentials arrive through a mounted secret file of `key=value` lines
//! (typically injected by the orchestrator); host and database name come from
//! the CLI. A missing or incomplete file is fatal at startup.

use crate::error::{Result, TallycastError};
use std::fs;
use std::path::Path;

/// Username and password read from the mounted secret file.
#[derive(Debug, Clone)]
pub struct StoreCredentials {
    pub username: String,
    pub password: String,
}

/// Everything needed to reach the vote store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub host: String,
    pub dbname: String,
    pub credentials: StoreCredentials,
}

impl StoreConfig {
    pub fn new(host: String, dbname: String, credentials: StoreCredentials) -> Self {
        Self {
            host,
            dbname,
            credentials,
        }
    }

    /// Postgres connection URL for this store.
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}/{}",
            self.credentials.username, self.credentials.password, self.host, self.dbname
        )
    }
}

/// Read credentials from the secret file.
pub fn load_credentials(path: &Path) -> Result<StoreCredentials> {
    let raw = fs::read_to_string(path).map_err(|e| {
        TallycastError::Config(format!(
            "failed to read credentials file {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_credentials(&raw)
}

fn parse_credentials(raw: &str) -> Result<StoreCredentials> {
    let mut username = None;
    let mut password = None;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "username" => username = Some(value.trim().to_string()),
                "password" => password = Some(value.trim().to_string()),
                _ => {},
            }
        }
    }

    match (username, password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            Ok(StoreCredentials { username, password })
        },
        _ => Err(TallycastError::Config(
            "missing username or password in credentials file".to_string(),
        )),
    }
}
