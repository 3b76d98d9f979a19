//! User settings: theme and language.
//!
//! Each setting resolves from, in order: an explicit value on the page URL
//! (`?theme=dark&lang=en`), the persisted preference, the configured
//! default. Unknown values are ignored and the next layer decides.
//!
//! [`SettingsManager`] is the only writer. Changes are persisted and then
//! published to every subscriber.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;

use crate::store::StoreDb;
use crate::{AppConfig, Error};

const THEME_KEY: &str = "theme";
const LANGUAGE_KEY: &str = "language";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(Error::InvalidInput(format!("unknown theme: {other}"))),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Pt => "pt",
            Language::En => "en",
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    /// Accepts region-tagged forms too (`pt-BR`, `en_US`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let primary = lower.split(['-', '_']).next().unwrap_or_default();
        match primary {
            "pt" => Ok(Language::Pt),
            "en" => Ok(Language::En),
            _ => Err(Error::InvalidInput(format!("unknown language: {s}"))),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Settings {
    pub theme: Theme,
    pub language: Language,
}

/// Values picked explicitly by the page. Unrecognised values are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub theme: Option<Theme>,
    pub language: Option<Language>,
}

impl SettingsOverrides {
    /// Read `theme=` and `lang=` from a page URL's query string.
    pub fn from_query(url: &Url) -> Self {
        let mut overrides = Self::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "theme" => overrides.theme = value.parse().ok().or(overrides.theme),
                "lang" => overrides.language = value.parse().ok().or(overrides.language),
                _ => {}
            }
        }
        overrides
    }

    /// Layer these values over `base`.
    pub fn apply(self, base: Settings) -> Settings {
        Settings { theme: self.theme.unwrap_or(base.theme), language: self.language.unwrap_or(base.language) }
    }
}

/// Owns the current settings and their persistence.
pub struct SettingsManager {
    db: StoreDb,
    tx: watch::Sender<Settings>,
}

impl SettingsManager {
    /// Resolve settings and start publishing them.
    ///
    /// A preference that fails to load is logged and treated as absent.
    pub async fn load(db: StoreDb, config: &AppConfig, overrides: SettingsOverrides) -> Self {
        let stored_theme = read_preference::<Theme>(&db, THEME_KEY).await;
        let stored_language = read_preference::<Language>(&db, LANGUAGE_KEY).await;

        let stored = Settings {
            theme: stored_theme.unwrap_or(config.default_theme),
            language: stored_language.unwrap_or(config.default_language),
        };
        let settings = overrides.apply(stored);
        tracing::debug!(theme = %settings.theme, language = %settings.language, "settings resolved");

        let (tx, _) = watch::channel(settings);
        Self { db, tx }
    }

    pub fn current(&self) -> Settings {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    /// Persist and publish a theme change.
    pub async fn set_theme(&self, theme: Theme) -> Result<Settings, Error> {
        self.db.set_preference(THEME_KEY, theme.as_str()).await?;
        self.tx.send_modify(|settings| settings.theme = theme);
        Ok(self.current())
    }

    /// Persist and publish a language change.
    pub async fn set_language(&self, language: Language) -> Result<Settings, Error> {
        self.db.set_preference(LANGUAGE_KEY, language.as_str()).await?;
        self.tx.send_modify(|settings| settings.language = language);
        Ok(self.current())
    }
}

async fn read_preference<T: FromStr<Err = Error>>(db: &StoreDb, key: &str) -> Option<T> {
    match db.get_preference(key).await {
        Ok(Some(value)) => match value.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "ignoring stored preference");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key = %key, error = %e, "failed to read preference");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
        assert_eq!("pt-BR".parse::<Language>().unwrap(), Language::Pt);
        assert_eq!("en_US".parse::<Language>().unwrap(), Language::En);
        assert!("fr".parse::<Language>().is_err());
    }

    #[test]
    fn test_overrides_from_query() {
        let url = Url::parse("https://example.org/?theme=dark&lang=xx&page=2").unwrap();
        let overrides = SettingsOverrides::from_query(&url);
        assert_eq!(overrides.theme, Some(Theme::Dark));
        assert_eq!(overrides.language, None);
    }

    #[tokio::test]
    async fn test_defaults_when_nothing_stored() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let manager = SettingsManager::load(db, &AppConfig::default(), SettingsOverrides::default()).await;
        assert_eq!(manager.current(), Settings { theme: Theme::Light, language: Language::Pt });
    }

    #[tokio::test]
    async fn test_resolution_order() {
        let db = StoreDb::open_in_memory().await.unwrap();
        db.set_preference("theme", "dark").await.unwrap();
        db.set_preference("language", "klingon").await.unwrap();
        let config = AppConfig { default_language: Language::En, ..Default::default() };

        let manager = SettingsManager::load(db.clone(), &config, SettingsOverrides::default()).await;
        assert_eq!(manager.current(), Settings { theme: Theme::Dark, language: Language::En });

        let overrides = SettingsOverrides { theme: Some(Theme::Light), language: None };
        let manager = SettingsManager::load(db, &config, overrides).await;
        assert_eq!(manager.current().theme, Theme::Light);
    }

    #[tokio::test]
    async fn test_set_persists_and_publishes() {
        let db = StoreDb::open_in_memory().await.unwrap();
        let manager = SettingsManager::load(db.clone(), &AppConfig::default(), SettingsOverrides::default()).await;
        let mut rx = manager.subscribe();

        let settings = manager.set_theme(Theme::Dark).await.unwrap();
        assert_eq!(settings.theme, Theme::Dark);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().theme, Theme::Dark);

        manager.set_language(Language::En).await.unwrap();
        assert_eq!(db.get_preference("theme").await.unwrap().as_deref(), Some("dark"));
        assert_eq!(db.get_preference("language").await.unwrap().as_deref(), Some("en"));

        let reloaded = SettingsManager::load(db, &AppConfig::default(), SettingsOverrides::default()).await;
        assert_eq!(reloaded.current(), Settings { theme: Theme::Dark, language: Language::En });
    }
}
