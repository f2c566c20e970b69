//! Connection settings derived from the ambient environment.
//!
//! Everything here is a pure function of an [`EnvSnapshot`], so callers can
//! hand in a synthetic environment instead of touching the real process state.

use std::collections::BTreeMap;

pub const S9S_HOME: &str = "S9S_HOME";
pub const CC_HOST: &str = "CC_HOST";
pub const CC_PORT: &str = "CC_PORT";
pub const CC_USER: &str = "CC_USER";
pub const CC_PASS: &str = "CC_PASS";
pub const CC_KEYFILE: &str = "CC_KEYFILE";

/// Overrides the path of the `s9s` binary.
pub const S9S_BIN: &str = "S9S_BIN";

/// Bare binary name, resolved on `PATH` when `S9S_BIN` is unset.
pub const DEFAULT_BINARY: &str = "s9s";

/// Keys forwarded to the subprocess environment.
pub const CONNECTION_KEYS: [&str; 6] =
    [S9S_HOME, CC_HOST, CC_USER, CC_PASS, CC_KEYFILE, CC_PORT];

/// Point-in-time view of a process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot(BTreeMap<String, String>);

impl EnvSnapshot {
    /// Read the current process environment. Non UTF-8 entries are skipped.
    pub fn capture() -> Self {
        Self(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// The subset of connection-related variables actually present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSettings(BTreeMap<&'static str, String>);

impl ConnectionSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Collect the connection settings present in `env`.
///
/// Empty values are treated as absent. Values are passed through untouched;
/// `CC_PORT` in particular is never parsed.
pub fn resolve(env: &EnvSnapshot) -> ConnectionSettings {
    ConnectionSettings(
        CONNECTION_KEYS
            .iter()
            .filter_map(|k| {
                env.get(k)
                    .filter(|v| !v.is_empty())
                    .map(|v| (*k, v.to_string()))
            })
            .collect(),
    )
}

/// Binary to spawn: `S9S_BIN` when set, otherwise `s9s`.
pub fn binary(env: &EnvSnapshot) -> String {
    env.get(S9S_BIN)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_BINARY)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_keeps_only_present_keys() {
        let env: EnvSnapshot = [
            ("CC_HOST", "10.0.0.5"),
            ("CC_USER", "admin"),
            ("PATH", "/usr/bin"),
        ]
        .into_iter()
        .collect();
        let settings = resolve(&env);
        assert_eq!(settings.get(CC_HOST), Some("10.0.0.5"));
        assert_eq!(settings.get(CC_USER), Some("admin"));
        assert_eq!(settings.get(CC_PORT), None);
        assert_eq!(settings.get("PATH"), None);
        assert_eq!(settings.iter().count(), 2);
    }

    #[test]
    fn empty_values_are_absent() {
        let env: EnvSnapshot = [("CC_PASS", ""), ("S9S_HOME", "/home/s9s")]
            .into_iter()
            .collect();
        let settings = resolve(&env);
        assert_eq!(settings.get(CC_PASS), None);
        assert_eq!(settings.get(S9S_HOME), Some("/home/s9s"));
    }

    #[test]
    fn port_is_passed_through_as_text() {
        let env: EnvSnapshot = [("CC_PORT", "not-a-number")].into_iter().collect();
        assert_eq!(resolve(&env).get(CC_PORT), Some("not-a-number"));
    }

    #[test]
    fn binary_override() {
        assert_eq!(binary(&EnvSnapshot::default()), "s9s");
        let env: EnvSnapshot = [("S9S_BIN", "/opt/s9s/bin/s9s")].into_iter().collect();
        assert_eq!(binary(&env), "/opt/s9s/bin/s9s");
        let blank: EnvSnapshot = [("S9S_BIN", "  ")].into_iter().collect();
        assert_eq!(binary(&blank), "s9s");
    }
}
