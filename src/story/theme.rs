//! Theme preference persistence

use crate::core::{PreferenceError, PreferenceStore};

use super::state::ThemeMode;

/// Preference key the theme is stored under
pub const THEME_KEY: &str = "storyatl-theme";

/// Stored theme, else the system preference.
///
/// A store that can't be read is treated like an empty one.
pub async fn load_theme(store: &dyn PreferenceStore, system_prefers_dark: bool) -> ThemeMode {
    let stored = match store.get(THEME_KEY).await {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(error = %err, "theme preference unavailable");
            None
        }
    };

    stored
        .as_deref()
        .and_then(ThemeMode::parse)
        .unwrap_or(if system_prefers_dark {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        })
}

/// Write the theme; called on every toggle
pub async fn persist_theme(
    store: &dyn PreferenceStore,
    theme: ThemeMode,
) -> Result<(), PreferenceError> {
    store.set(THEME_KEY, theme.as_str()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MemoryPreferences, SqlitePreferences};
    use async_trait::async_trait;

    struct BrokenStore;

    #[async_trait]
    impl PreferenceStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, PreferenceError> {
            Err(PreferenceError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "storage disabled",
            )))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), PreferenceError> {
            Err(PreferenceError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "storage disabled",
            )))
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_system_preference() {
        let store = MemoryPreferences::default();
        assert_eq!(load_theme(&store, true).await, ThemeMode::Dark);
        assert_eq!(load_theme(&store, false).await, ThemeMode::Light);

        store.set(THEME_KEY, "sepia").await.unwrap();
        assert_eq!(load_theme(&store, true).await, ThemeMode::Dark);
    }

    #[tokio::test]
    async fn test_stored_theme_wins() {
        let store = SqlitePreferences::new_in_memory().await.unwrap();
        persist_theme(&store, ThemeMode::Light).await.unwrap();
        assert_eq!(load_theme(&store, true).await, ThemeMode::Light);

        persist_theme(&store, ThemeMode::Light.toggled()).await.unwrap();
        assert_eq!(store.get(THEME_KEY).await.unwrap().as_deref(), Some("dark"));
        assert_eq!(load_theme(&store, false).await, ThemeMode::Dark);
    }

    #[tokio::test]
    async fn test_unavailable_storage_is_ignored() {
        assert_eq!(load_theme(&BrokenStore, true).await, ThemeMode::Dark);
        assert!(persist_theme(&BrokenStore, ThemeMode::Dark).await.is_err());
    }
}
