use async_trait::async_trait;
use game_core::FlavorRequest;
use game_types::{Contestant, ContestantId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::{Config, WordSource};

pub const MIN_WORD_LENGTH: usize = 4;
pub const MAX_WORD_LENGTH: usize = 8;

static NON_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Z]").expect("valid pattern"));
static QUOTES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["“”]"#).expect("valid pattern"));

#[derive(Debug, thiserror::Error)]
pub enum SupplierError {
    #[error("word supplier request failed: {0}")]
    Request(String),
    #[error("no word list for theme '{theme}' at {path}")]
    UnknownTheme { theme: String, path: String },
}

/// Turns a theme into candidate puzzle words.
#[async_trait]
pub trait WordSupplier: Send + Sync {
    async fn fetch_words(&self, theme: &str, count: usize) -> Result<Vec<String>, SupplierError>;
}

/// Produces one in-character line for the computer opponent; empty means stay quiet.
#[async_trait]
pub trait FlavorTextGenerator: Send + Sync {
    async fn generate_line(&self, request: &FlavorRequest) -> String;
}

#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn record_result(&self, winner: &Contestant, loser: &Contestant);
    async fn stats_for(&self, contestant_id: ContestantId) -> Option<ContestantStats>;
}

/// Uppercase, strip anything but A-Z, keep 4-8 letter words, drop repeats.
pub fn sanitize_words(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|word| NON_LETTERS.replace_all(&word.to_uppercase(), "").into_owned())
        .filter(|word| (MIN_WORD_LENGTH..=MAX_WORD_LENGTH).contains(&word.len()))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

/// File stem for a theme: "Cooking & Baking" becomes "cooking-baking".
pub fn theme_slug(theme: &str) -> String {
    theme
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Serialize)]
struct WordRequest<'a> {
    theme: &'a str,
    count: usize,
}

#[derive(Deserialize)]
struct WordResponse {
    words: Vec<String>,
}

pub struct HttpWordSupplier {
    client: Client,
    url: String,
}

impl HttpWordSupplier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl WordSupplier for HttpWordSupplier {
    async fn fetch_words(&self, theme: &str, count: usize) -> Result<Vec<String>, SupplierError> {
        debug!("Requesting {} words for '{}' from {}", count, theme, self.url);

        let response = self
            .client
            .post(&self.url)
            .json(&WordRequest { theme, count })
            .send()
            .await
            .map_err(|e| SupplierError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SupplierError::Request(format!(
                "status {}",
                response.status()
            )));
        }

        let body: WordResponse = response
            .json()
            .await
            .map_err(|e| SupplierError::Request(e.to_string()))?;

        let mut words = sanitize_words(body.words);
        words.truncate(count);
        Ok(words)
    }
}

/// Reads `<theme-slug>.txt` lists: one word per line, `#` comments and blanks ignored.
pub struct DirectoryWordSupplier {
    directory: PathBuf,
    rng: Mutex<StdRng>,
}

impl DirectoryWordSupplier {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(directory: impl AsRef<Path>, seed: u64) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn path_for(&self, theme: &str) -> PathBuf {
        self.directory.join(format!("{}.txt", theme_slug(theme)))
    }

    fn parse_list(content: &str) -> Vec<String> {
        sanitize_words(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        )
    }
}

#[async_trait]
impl WordSupplier for DirectoryWordSupplier {
    async fn fetch_words(&self, theme: &str, count: usize) -> Result<Vec<String>, SupplierError> {
        let path = self.path_for(theme);
        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|_| SupplierError::UnknownTheme {
                    theme: theme.to_string(),
                    path: path.display().to_string(),
                })?;

        let mut words = Self::parse_list(&content);
        if let Ok(mut rng) = self.rng.lock() {
            words.shuffle(&mut *rng);
        }
        words.truncate(count);
        debug!("Loaded {} words for '{}' from {}", words.len(), theme, path.display());
        Ok(words)
    }
}

/// Strip quotation marks a model tends to wrap lines in.
pub fn clean_line(line: &str) -> String {
    QUOTES.replace_all(line, "").trim().to_string()
}

#[derive(Deserialize)]
struct FlavorResponse {
    line: String,
}

pub struct HttpFlavorText {
    client: Client,
    url: String,
}

impl HttpFlavorText {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl FlavorTextGenerator for HttpFlavorText {
    async fn generate_line(&self, request: &FlavorRequest) -> String {
        let response = match self.client.post(&self.url).json(request).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Flavor text returned status {}", response.status());
                return String::new();
            }
            Err(e) => {
                warn!("Flavor text request failed: {}", e);
                return String::new();
            }
        };

        match response.json::<FlavorResponse>().await {
            Ok(body) => clean_line(&body.line),
            Err(e) => {
                warn!("Flavor text response unreadable: {}", e);
                String::new()
            }
        }
    }
}

pub struct SilentFlavorText;

#[async_trait]
impl FlavorTextGenerator for SilentFlavorText {
    async fn generate_line(&self, _request: &FlavorRequest) -> String {
        String::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContestantStats {
    pub display_name: String,
    pub wins: u32,
    pub losses: u32,
    pub total_bonus_chunks: u32,
}

#[derive(Default)]
pub struct InMemoryStatsStore {
    stats: RwLock<HashMap<ContestantId, ContestantStats>>,
}

impl InMemoryStatsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsStore for InMemoryStatsStore {
    async fn record_result(&self, winner: &Contestant, loser: &Contestant) {
        let mut stats = self.stats.write().await;
        for (contestant, won) in [(winner, true), (loser, false)] {
            let entry = stats.entry(contestant.id).or_default();
            entry.display_name = contestant.display_name.clone();
            if won {
                entry.wins += 1;
            } else {
                entry.losses += 1;
            }
            entry.total_bonus_chunks += contestant.bonus_chunks_earned;
        }
        info!("Recorded win for {} over {}", winner.display_name, loser.display_name);
    }

    async fn stats_for(&self, contestant_id: ContestantId) -> Option<ContestantStats> {
        self.stats.read().await.get(&contestant_id).cloned()
    }
}

/// The collaborators a coordinator talks to, built once per application.
#[derive(Clone)]
pub struct Services {
    pub words: Arc<dyn WordSupplier>,
    pub flavor: Arc<dyn FlavorTextGenerator>,
    pub stats: Arc<dyn StatsStore>,
}

impl Services {
    pub fn from_config(config: &Config) -> Self {
        let words: Arc<dyn WordSupplier> = match &config.word_source {
            WordSource::Http(url) => {
                info!("Fetching words from {}", url);
                Arc::new(HttpWordSupplier::new(url.clone()))
            }
            WordSource::Directory(dir) => {
                info!("Loading words from directory: {}", dir.display());
                Arc::new(DirectoryWordSupplier::new(dir))
            }
        };
        let flavor: Arc<dyn FlavorTextGenerator> = match &config.flavor_text_url {
            Some(url) => Arc::new(HttpFlavorText::new(url.clone())),
            None => Arc::new(SilentFlavorText),
        };

        Self {
            words,
            flavor,
            stats: Arc::new(InMemoryStatsStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_types::Identity;

    #[test]
    fn test_sanitize_words() {
        let raw = ["coral", "Sea-Horse", "eel", "STARFISHES", "kelp", "KELP", "o'ct"]
            .iter()
            .map(|w| w.to_string());
        // Too short, too long and repeated words are dropped
        assert_eq!(sanitize_words(raw), vec!["CORAL", "SEAHORSE", "KELP"]);
    }

    #[test]
    fn test_theme_slug() {
        assert_eq!(theme_slug("Cooking & Baking"), "cooking-baking");
        assert_eq!(theme_slug("In the Garden"), "in-the-garden");
        assert_eq!(theme_slug("Astronomy"), "astronomy");
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("\"Nice find, rookie.\""), "Nice find, rookie.");
        assert_eq!(clean_line("“Watch this.” "), "Watch this.");
    }

    #[test]
    fn test_parse_list_skips_comments() {
        let words = DirectoryWordSupplier::parse_list("# ocean\n\ncoral\n  whale \n#kelp\nsquid\n");
        assert_eq!(words, vec!["CORAL", "WHALE", "SQUID"]);
    }

    #[tokio::test]
    async fn test_stats_accumulate() {
        let store = InMemoryStatsStore::new();
        let mut ada = Contestant::new(&Identity::human("Ada", "fox"));
        let ben = Contestant::new(&Identity::human("Ben", "owl"));
        ada.bonus_chunks_earned = 2;

        store.record_result(&ada, &ben).await;
        store.record_result(&ben, &ada).await;

        let stats = store.stats_for(ada.id).await.unwrap();
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.total_bonus_chunks, 4);
        assert!(store.stats_for(uuid::Uuid::new_v4()).await.is_none());
    }
}
