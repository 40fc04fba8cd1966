use std::{fmt, str::FromStr};

use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOST: &str = "localhost";

/// Which server the client talks to.
///
/// `Dentures` is the scan-tracking server; `Rows` is the older generic table
/// server, which only supports form-driven create/update/delete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ApiFlavor {
    #[default]
    Dentures,
    Rows,
}

impl ApiFlavor {
    pub fn port(&self) -> u16 {
        match self {
            ApiFlavor::Dentures => 5001,
            ApiFlavor::Rows => 5000,
        }
    }

    pub fn collection(&self) -> &'static str {
        match self {
            ApiFlavor::Dentures => "dentures",
            ApiFlavor::Rows => "rows",
        }
    }

    pub fn supports_scan(&self) -> bool {
        matches!(self, ApiFlavor::Dentures)
    }

    pub fn supports_forms(&self) -> bool {
        matches!(self, ApiFlavor::Rows)
    }
}

impl fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for ApiFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dentures" | "denture" => Ok(ApiFlavor::Dentures),
            "rows" | "table" => Ok(ApiFlavor::Rows),
            other => Err(format!("unknown server flavor '{other}'")),
        }
    }
}

/// Host plus flavor. The port is fixed by the flavor and never configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    flavor: ApiFlavor,
    port: u16,
}

impl Endpoint {
    /// Blank hosts fall back to `localhost`. A scheme, path or `:port` typed
    /// along with the host is dropped; the flavor decides the port.
    pub fn new(host: &str, flavor: ApiFlavor) -> Self {
        let host = bare_host(host);
        Self {
            host: if host.is_empty() { DEFAULT_HOST.to_string() } else { host.to_string() },
            flavor,
            port: flavor.port(),
        }
    }

    /// Local stub servers listen on whatever port the OS hands out.
    #[cfg(test)]
    pub(crate) fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn flavor(&self) -> ApiFlavor {
        self.flavor
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn scan_url(&self) -> String {
        format!("{}/api/scan", self.base_url())
    }

    pub fn collection_url(&self) -> String {
        format!("{}/api/{}", self.base_url(), self.flavor.collection())
    }

    /// The id is pushed as a single, percent-encoded path segment.
    pub fn item_url(&self, id: &str) -> String {
        let collection = self.collection_url();
        match Url::parse(&collection) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.push(id);
                }
                url.to_string()
            }
            // Unparseable host; let the HTTP layer report it.
            Err(_) => format!("{collection}/{id}"),
        }
    }
}

fn bare_host(input: &str) -> &str {
    let mut host = input.trim();
    for scheme in ["http://", "https://"] {
        if host
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        {
            host = &host[scheme.len()..];
        }
    }
    if let Some((authority, _path)) = host.split_once('/') {
        host = authority;
    }

    // Bracketed IPv6 keeps its colons.
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.split_once(':') {
        Some((name, port))
            if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) =>
        {
            name
        }
        _ => host,
    }
}
