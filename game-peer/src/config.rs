use game_types::Difficulty;
use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Where puzzle words come from.
#[derive(Debug, Clone, PartialEq)]
pub enum WordSource {
    Http(String),
    Directory(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub display_name: String,
    pub avatar: String,
    pub word_source: WordSource,
    pub flavor_text_url: Option<String>,
    pub computer_difficulty: Difficulty,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` is this over the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let host = var("HOST", "127.0.0.1");
        let port = var("PORT", "0");
        let difficulty = var("COMPUTER_DIFFICULTY", "easy");

        let word_source = match non_empty("WORD_SUPPLIER_URL") {
            Some(url) => WordSource::Http(url),
            None => WordSource::Directory(PathBuf::from(var("WORDS_DIRECTORY", "./shared/themes"))),
        };

        Ok(Self {
            host: host.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HOST",
                value: host.clone(),
            })?,
            port: port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PORT",
                value: port.clone(),
            })?,
            display_name: var("DISPLAY_NAME", "Player"),
            avatar: var("AVATAR", "sgt_stealth"),
            word_source,
            flavor_text_url: non_empty("FLAVOR_TEXT_URL"),
            computer_difficulty: difficulty.parse().map_err(|_| ConfigError::InvalidValue {
                key: "COMPUTER_DIFFICULTY",
                value: difficulty.clone(),
            })?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host.to_string(), "127.0.0.1");
        assert_eq!(config.port, 0);
        assert_eq!(
            config.word_source,
            WordSource::Directory(PathBuf::from("./shared/themes"))
        );
        assert_eq!(config.flavor_text_url, None);
        assert_eq!(config.computer_difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_supplier_url_wins_over_directory() {
        let config = Config::from_lookup(lookup(&[
            ("WORD_SUPPLIER_URL", "http://words.local/fetch"),
            ("WORDS_DIRECTORY", "/tmp/words"),
            ("COMPUTER_DIFFICULTY", "Hard"),
        ]))
        .unwrap();
        assert_eq!(
            config.word_source,
            WordSource::Http("http://words.local/fetch".to_string())
        );
        assert_eq!(config.computer_difficulty, Difficulty::Hard);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "PORT",
                value: "eighty".to_string()
            }
        );
        assert!(Config::from_lookup(lookup(&[("COMPUTER_DIFFICULTY", "brutal")])).is_err());
        assert!(Config::from_lookup(lookup(&[("HOST", "not-an-ip")])).is_err());
    }
}
