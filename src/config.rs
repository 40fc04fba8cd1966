use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::sync::ApiFlavor;

/// Start-up options. Every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "dentrack", version, about = "NFC scan client for denture fabrication tracking")]
pub struct Config {
    /// Tracking server host. Falls back to the last host used, then localhost.
    #[arg(long, env = "DENTRACK_HOST")]
    pub host: Option<String>,

    /// Server API: `dentures` (port 5001) or `rows` (port 5000).
    #[arg(long, env = "DENTRACK_FLAVOR", default_value = "dentures")]
    pub flavor: ApiFlavor,

    /// Where settings.json lives.
    #[arg(long, env = "DENTRACK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, env = "DENTRACK_REQUEST_TIMEOUT", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Run as if the device had no NFC hardware.
    #[arg(long)]
    pub no_nfc: bool,
}

impl Config {
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("dentrack")))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Explicit host wins, then the remembered one.
    pub fn resolve_host(&self, remembered: Option<String>) -> String {
        self.host
            .clone()
            .filter(|host| !host.trim().is_empty())
            .or(remembered)
            .unwrap_or_else(|| crate::sync::DEFAULT_HOST.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::parse_from(["dentrack"]);
        assert_eq!(config.flavor, ApiFlavor::Dentures);
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(!config.no_nfc);
    }

    #[test]
    fn host_precedence() {
        let config = Config::parse_from(["dentrack", "--flavor", "rows"]);
        assert_eq!(config.flavor, ApiFlavor::Rows);
        assert_eq!(config.resolve_host(Some("10.0.0.7".into())), "10.0.0.7");
        assert_eq!(config.resolve_host(None), crate::sync::DEFAULT_HOST);

        let config = Config::parse_from(["dentrack", "--host", "lab.local"]);
        assert_eq!(config.resolve_host(Some("10.0.0.7".into())), "lab.local");
    }
}
