//! settings_get / settings_set tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use biblio_core::settings::SettingsOverrides;
use biblio_core::{Error, Language, SettingsManager, Theme};

use super::json_result;
use crate::error::ToolError;

/// Parameters for the settings_get tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SettingsGetParams {
    /// Page URL whose `theme=` / `lang=` query values take precedence.
    #[serde(default)]
    pub page_url: Option<String>,
}

/// Parameters for the settings_set tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SettingsSetParams {
    /// "light" or "dark".
    #[serde(default)]
    pub theme: Option<String>,

    /// "pt" or "en".
    #[serde(default)]
    pub language: Option<String>,
}

/// Implementation of the settings_get tool.
pub async fn get_impl(settings: &SettingsManager, params: SettingsGetParams) -> Result<CallToolResult, McpError> {
    let current = settings.current();
    let effective = match params.page_url {
        Some(page) => {
            let page = Url::parse(&page).map_err(|e| Error::InvalidUrl(format!("{page}: {e}")))?;
            SettingsOverrides::from_query(&page).apply(current)
        }
        None => current,
    };
    json_result(&effective)
}

/// Implementation of the settings_set tool.
pub async fn set_impl(settings: &SettingsManager, params: SettingsSetParams) -> Result<CallToolResult, McpError> {
    if params.theme.is_none() && params.language.is_none() {
        return Err(ToolError::InvalidInput("At least one of theme or language must be specified".to_string()).into());
    }

    let theme = params.theme.as_deref().map(str::parse::<Theme>).transpose()?;
    let language = params.language.as_deref().map(str::parse::<Language>).transpose()?;

    if let Some(theme) = theme {
        settings.set_theme(theme).await?;
    }
    if let Some(language) = language {
        settings.set_language(language).await?;
    }

    json_result(&settings.current())
}
