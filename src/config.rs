use log::{info, warn};
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

const DEFAULT_PORT: &str = "3000";
const DEFAULT_DATA_DIR: &str = "database";
const DEFAULT_SESSION_HOURS: &str = "24";

/// Longest session lifetime accepted from the environment, one year
pub const MAX_SESSION_HOURS: u64 = 365 * 24;

/// Runtime settings, read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Root of everything persisted: users file and progress records
    pub data_dir: PathBuf,
    pub session_hours: u64,
    /// Plain-text problem sheet loaded into the catalog at startup
    pub seed_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            session_hours: 24,
            seed_file: None,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(|key| var(key).ok())
    }

    /// Build the config from `lookup` instead of the process environment
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let session_hours: u64 =
            try_load_with(&lookup, "CLASSMATE_SESSION_HOURS", DEFAULT_SESSION_HOURS);
        if session_hours > MAX_SESSION_HOURS {
            warn!(
                "CLASSMATE_SESSION_HOURS {} exceeds {}, capping it",
                session_hours, MAX_SESSION_HOURS
            );
        }

        Self {
            port: try_load_with(&lookup, "CLASSMATE_PORT", DEFAULT_PORT),
            data_dir: PathBuf::from(try_load_with::<String>(
                &lookup,
                "CLASSMATE_DATA_DIR",
                DEFAULT_DATA_DIR,
            )),
            session_hours: session_hours.min(MAX_SESSION_HOURS),
            seed_file: lookup("CLASSMATE_SEED_FILE").map(PathBuf::from),
        }
    }

    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn progress_dir(&self) -> PathBuf {
        self.data_dir.join("progress")
    }

    /// How long a login stays valid
    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_hours.saturating_mul(60 * 60))
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not set");
    })
}

/// Parse `key` from `lookup`, falling back to `default` when it is unset or
/// does not parse
fn try_load_with<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            parse_default(key, default)
        }
    }
}

fn parse_default<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    default
        .parse()
        .unwrap_or_else(|e| panic!("Built-in default for {key} does not parse: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn paths_hang_off_the_data_dir() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/classmate"),
            ..Config::default()
        };
        assert_eq!(config.users_file(), PathBuf::from("/tmp/classmate/users.json"));
        assert_eq!(config.progress_dir(), PathBuf::from("/tmp/classmate/progress"));
    }

    #[test]
    fn empty_environment_gives_the_defaults() {
        assert_eq!(Config::load_from(env_of(&[])), Config::default());
    }

    #[test]
    fn values_are_read_from_the_environment() {
        let config = Config::load_from(env_of(&[
            ("CLASSMATE_PORT", "8080"),
            ("CLASSMATE_DATA_DIR", "/srv/classmate"),
            ("CLASSMATE_SESSION_HOURS", "2"),
            ("CLASSMATE_SEED_FILE", "problems.md"),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("/srv/classmate"));
        assert_eq!(config.session_lifetime(), Duration::from_secs(2 * 60 * 60));
        assert_eq!(config.seed_file, Some(PathBuf::from("problems.md")));
    }

    #[test]
    fn unparseable_value_falls_back_to_default() {
        let config = Config::load_from(env_of(&[("CLASSMATE_PORT", "not-a-port")]));
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn huge_session_hours_are_capped() {
        let config = Config::load_from(env_of(&[(
            "CLASSMATE_SESSION_HOURS",
            "18446744073709551615",
        )]));
        assert_eq!(config.session_hours, MAX_SESSION_HOURS);

        let unchecked = Config {
            session_hours: u64::MAX,
            ..Config::default()
        };
        assert_eq!(unchecked.session_lifetime(), Duration::from_secs(u64::MAX));
    }
}
