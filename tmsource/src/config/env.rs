//! Environment variable access that can be replaced in tests.
//!
//! - [`OsEnv`]: the process environment
//! - [`FauxEnv`]: a fixed set of variables

use std::collections::HashMap;
use std::env;
use std::ffi::OsString;

use log::warn;
use subst::VariableMap;

/// Environment variable access, also usable for `${VAR}` substitution in
/// configuration files.
pub trait Env<'a>: VariableMap<'a> {
    /// Get an environment variable as an [`OsString`] without Unicode validation.
    fn var_os(&self, key: &str) -> Option<OsString>;

    /// Get an environment variable as a UTF-8 validated [`String`].
    ///
    /// Logs a warning and returns `None` if the variable contains invalid Unicode.
    #[must_use]
    fn get_env_str(&self, key: &str) -> Option<String> {
        match self.var_os(key)?.into_string() {
            Ok(v) => Some(v),
            Err(v) => {
                let v = v.to_string_lossy();
                warn!("Environment variable {key} has invalid unicode. Lossy representation: {v}");
                None
            }
        }
    }
}

/// The environment of the current process.
#[derive(Debug, Default)]
pub struct OsEnv;

impl Env<'_> for OsEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        env::var_os(key)
    }
}

impl<'a> VariableMap<'a> for OsEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        env::var(key).ok()
    }
}

/// A fixed set of environment variables.
#[derive(Debug, Default)]
pub struct FauxEnv(pub HashMap<&'static str, OsString>);

impl<'a> VariableMap<'a> for FauxEnv {
    type Value = String;

    fn get(&'a self, key: &str) -> Option<Self::Value> {
        self.0.get(key).map(|s| s.to_string_lossy().to_string())
    }
}

impl Env<'_> for FauxEnv {
    fn var_os(&self, key: &str) -> Option<OsString> {
        self.0.get(key).map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_env_str() {
        let env = FauxEnv::default();
        assert_eq!(env.get_env_str("TMSOURCE_FORMAT"), None);

        let env = FauxEnv([("TMSOURCE_FORMAT", OsString::from("json"))].into());
        assert_eq!(env.get_env_str("TMSOURCE_FORMAT"), Some("json".to_string()));
    }

    #[test]
    #[cfg(unix)]
    fn bad_os_str() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt as _;

        let bad_utf8 = [0x66, 0x6f, 0x80, 0x6f];
        let os_str = OsStr::from_bytes(&bad_utf8[..]);
        let env = FauxEnv([("BAD", os_str.to_owned())].into());
        assert!(env.0.contains_key("BAD"));
        assert_eq!(env.get_env_str("BAD"), None);
    }
}
