//! Widget activation options.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Everything the widget needs before it may activate. All fields are
/// required; missing keys deserialize as empty and are caught by
/// [`WidgetConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetConfig {
    /// Document or collection the thread is attached to.
    pub document_id: String,
    /// Display name of the current user, sent with every new comment.
    pub user_name: String,
    pub fetch_all_url: String,
    pub new_series_url: String,
    pub reply_url: String,
    pub delete_url: String,
    pub notify_url: String,
}

impl WidgetConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("documentId", &self.document_id),
            ("userName", &self.user_name),
            ("fetchAllUrl", &self.fetch_all_url),
            ("newSeriesUrl", &self.new_series_url),
            ("replyUrl", &self.reply_url),
            ("deleteUrl", &self.delete_url),
            ("notifyUrl", &self.notify_url),
        ]
    }

    /// Fails on the first empty option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.fields().into_iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(ConfigError::MissingField(name)),
            None => Ok(()),
        }
    }
}
