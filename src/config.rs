//! OCI CLI configuration file loading.
//!
//! The file is the INI format shared by the OCI CLI and SDKs:
//!
//! ```text
//! [DEFAULT]
//! user=ocid1.user.oc1..aaaa
//! fingerprint=12:34:...:ef
//! key_file=~/.oci/oci_api_key.pem
//! tenancy=ocid1.tenancy.oc1..aaaa
//! region=eu-frankfurt-1
//!
//! [ADMIN]
//! user=ocid1.user.oc1..bbbb
//! ```
//!
//! Named profiles inherit any key they do not set from `[DEFAULT]`.

use crate::error::{Error, Result};
use ini::{Ini, ParseOption};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "DEFAULT";
pub const CONFIG_FILE_ENV: &str = "OCI_CONFIG_FILE";
const DEFAULT_CONFIG_PATH: &str = "~/.oci/config";

/// Credentials and target region of one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciConfig {
    pub profile: String,
    pub user: String,
    pub fingerprint: String,
    pub tenancy: String,
    pub region: String,
    pub key_file: PathBuf,
    pub pass_phrase: Option<String>,
}

impl OciConfig {
    /// Load `profile` from `path`, falling back to `$OCI_CONFIG_FILE` and then
    /// `~/.oci/config`.
    pub fn load(path: Option<&str>, profile: &str) -> Result<Self> {
        let path = resolve_config_path(path);
        let contents = fs::read_to_string(&path).map_err(|e| {
            Error::AuthConfig(format!(
                "cannot read OCI config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_ini_str(&contents, profile)
            .map_err(|e| Error::AuthConfig(format!("{} ({})", strip_prefix(&e), path.display())))
    }

    pub fn from_ini_str(contents: &str, profile: &str) -> Result<Self> {
        // Windows key paths contain backslashes; keep them literal.
        let options = ParseOption {
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(contents, options)
            .map_err(|e| Error::AuthConfig(format!("malformed OCI config: {}", e)))?;

        let section_name = ini
            .sections()
            .flatten()
            .find(|name| *name == profile)
            .or_else(|| {
                ini.sections()
                    .flatten()
                    .find(|name| name.eq_ignore_ascii_case(profile))
            })
            .ok_or_else(|| Error::AuthConfig(format!("profile '{}' not found", profile)))?;

        let section = ini.section(Some(section_name));
        let defaults = ini.section(Some(DEFAULT_PROFILE));
        let lookup = |key: &str| {
            section
                .and_then(|s| s.get(key))
                .or_else(|| defaults.and_then(|s| s.get(key)))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            lookup(key).map(str::to_string).ok_or_else(|| {
                Error::AuthConfig(format!(
                    "profile '{}' is missing required key '{}'",
                    section_name, key
                ))
            })
        };

        Ok(Self {
            profile: section_name.to_string(),
            user: require("user")?,
            fingerprint: require("fingerprint")?,
            tenancy: require("tenancy")?,
            region: require("region")?,
            key_file: expand_home(&require("key_file")?),
            pass_phrase: lookup("pass_phrase").map(str::to_string),
        })
    }

    /// `keyId` used in request signatures.
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy, self.user, self.fingerprint)
    }

    pub fn read_private_key(&self) -> Result<String> {
        fs::read_to_string(&self.key_file).map_err(|e| {
            Error::AuthConfig(format!(
                "cannot read API key {}: {}",
                self.key_file.display(),
                e
            ))
        })
    }
}

/// Config file location: explicit path, `$OCI_CONFIG_FILE`, then `~/.oci/config`.
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    let raw = explicit
        .map(str::to_string)
        .or_else(|| env::var(CONFIG_FILE_ENV).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    expand_home(&raw)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home = || {
        env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    };
    if path == "~" {
        if let Some(home) = home() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}

fn strip_prefix(err: &Error) -> String {
    match err {
        Error::AuthConfig(message) => message.clone(),
        other => other.to_string(),
    }
}
