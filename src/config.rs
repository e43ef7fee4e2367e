use std::env;

use anyhow::{bail, Context};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub session_secret: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = require("PORTAL_DB_URL")?;
        let session_secret = require("PORTAL_SECRET")?;
        if session_secret.len() < 16 {
            bail!("PORTAL_SECRET must be at least 16 characters long!");
        }
        let port = match env::var("PORTAL_PORT") {
            Ok(raw) => raw
                .parse()
                .context("PORTAL_PORT is not a valid port number")?,
            Err(_) => 3000,
        };
        Ok(Config {
            port,
            database_url,
            session_secret,
        })
    }
}

fn require(key: &str) -> anyhow::Result<String> {
    let value =
        env::var(key).with_context(|| format!("Missing required environment variable {}", key))?;
    if value.is_empty() {
        bail!("Environment variable {} is empty!", key);
    }
    Ok(value)
}
