use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde_derive::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::issue::{InvalidRepository, Repository};

pub const CONFIG_FILE: &str = "config.json";

/// Discord accepts at most this many choices for one option.
pub const MAX_REPOSITORIES: usize = 25;

const PLACEHOLDER_PREFIX: &str = "YOUR_";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Template(#[from] serde_json::Error),
    #[error("`{0}` still holds its placeholder value")]
    Placeholder(&'static str),
    #[error("`discord.allowed_user` must be a Discord user id, got '{0}'")]
    InvalidUser(String),
    #[error(transparent)]
    Repository(#[from] InvalidRepository),
    #[error("`github.repositories` lists no repository")]
    NoRepositories,
    #[error("`github.repositories` lists {0} repositories, at most {MAX_REPOSITORIES} are supported")]
    TooManyRepositories(usize),
    #[error("`github.repositories` lists {0} more than once")]
    DuplicateRepository(String),
    #[error("`forms.{0}` must be positive")]
    InvalidForms(&'static str),
}

#[derive(Debug, Clone)]
pub struct Discord {
    pub token: String,
    pub allowed_user: u64,
}

#[derive(Debug, Clone)]
pub struct GitHub {
    pub token: String,
    pub repositories: Vec<Repository>,
    pub duplicate_check: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Forms {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
}

impl Forms {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for Forms {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_pending: default_max_pending(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    900
}

fn default_max_pending() -> usize {
    256
}

fn default_duplicate_check() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord: Discord,
    pub github: GitHub,
    pub forms: Forms,
}

#[derive(Debug)]
pub enum Loaded {
    Ready(Settings),
    /// No configuration existed; a template was written at this path.
    TemplateWritten(PathBuf),
}

#[derive(Debug, Deserialize)]
struct RawDiscord {
    token: String,
    allowed_user: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRepository {
    Compound(String),
    Split { owner: String, repo: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRepositories {
    Many(Vec<RawRepository>),
    One(RawRepository),
}

#[derive(Debug, Deserialize)]
struct RawGitHub {
    token: String,
    repositories: RawRepositories,
    #[serde(default = "default_duplicate_check")]
    duplicate_check: bool,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    discord: RawDiscord,
    github: RawGitHub,
    #[serde(default)]
    forms: Forms,
}

impl Settings {
    pub fn load() -> Result<Loaded, SettingsError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Loaded, SettingsError> {
        if !path.exists() {
            write_template(path)?;
            return Ok(Loaded::TemplateWritten(path.to_path_buf()));
        }

        debug!("Loading configuration from {}", path.display());

        let config = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Json))
            .add_source(
                Environment::with_prefix("ISSUEBOT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let raw: RawSettings = config.try_deserialize()?;
        raw.validate().map(Loaded::Ready)
    }
}

impl RawSettings {
    fn validate(self) -> Result<Settings, SettingsError> {
        let discord_token = not_placeholder("discord.token", self.discord.token)?;
        let allowed_user = not_placeholder("discord.allowed_user", self.discord.allowed_user)?;
        let allowed_user = allowed_user
            .trim()
            .parse::<u64>()
            .map_err(|_| SettingsError::InvalidUser(allowed_user.clone()))?;
        let github_token = not_placeholder("github.token", self.github.token)?;

        let raw_repositories = match self.github.repositories {
            RawRepositories::One(repo) => vec![repo],
            RawRepositories::Many(repos) => repos,
        };

        let mut repositories: Vec<Repository> = Vec::with_capacity(raw_repositories.len());
        for raw in raw_repositories {
            let repo = match raw {
                RawRepository::Compound(id) => {
                    not_placeholder("github.repositories", id)?.parse::<Repository>()?
                }
                RawRepository::Split { owner, repo } => Repository::new(
                    not_placeholder("github.repositories", owner)?,
                    not_placeholder("github.repositories", repo)?,
                )?,
            };
            if repositories.contains(&repo) {
                return Err(SettingsError::DuplicateRepository(repo.to_string()));
            }
            repositories.push(repo);
        }

        match repositories.len() {
            0 => return Err(SettingsError::NoRepositories),
            n if n > MAX_REPOSITORIES => return Err(SettingsError::TooManyRepositories(n)),
            _ => {}
        }

        if self.forms.ttl_secs == 0 {
            return Err(SettingsError::InvalidForms("ttl_secs"));
        }
        if self.forms.max_pending == 0 {
            return Err(SettingsError::InvalidForms("max_pending"));
        }

        Ok(Settings {
            discord: Discord {
                token: discord_token,
                allowed_user,
            },
            github: GitHub {
                token: github_token,
                repositories,
                duplicate_check: self.github.duplicate_check,
            },
            forms: self.forms,
        })
    }
}

fn not_placeholder(key: &'static str, value: String) -> Result<String, SettingsError> {
    if value.starts_with(PLACEHOLDER_PREFIX) || value.contains(&format!("/{PLACEHOLDER_PREFIX}")) {
        return Err(SettingsError::Placeholder(key));
    }
    Ok(value)
}

fn write_template(path: &Path) -> Result<(), SettingsError> {
    let template = serde_json::json!({
        "discord": {
            "token": "YOUR_DISCORD_BOT_TOKEN",
            "allowed_user": "YOUR_DISCORD_USER_ID"
        },
        "github": {
            "token": "YOUR_GITHUB_PERSONAL_ACCESS_TOKEN",
            "repositories": ["YOUR_GITHUB_OWNER/YOUR_GITHUB_REPO"],
            "duplicate_check": true
        },
        "forms": {
            "ttl_secs": default_ttl_secs(),
            "max_pending": default_max_pending()
        }
    });

    let contents = serde_json::to_string_pretty(&template)?;
    fs::write(path, contents).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}
