//! Voice Catalog
//!
//! Tracks the platform's available synthetic voices and the user's selection.
//! The platform may re-fire its voices-changed notification at any time, so
//! refresh must be idempotent and keep the user's pick when the voice survives.

use crate::error::{AvaError, AvaResult};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Name substrings the auto-default heuristic treats as male-associated
const MALE_MARKERS: &[&str] = &["Male", "David", "Mark"];

/// Immutable snapshot of one platform voice
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    /// Stable identifier within the platform voice list
    pub id: String,
    /// Display name
    pub name: String,
    /// BCP-47-ish language tag, e.g. "en-US"
    pub lang: String,
    /// Whether the platform marks this voice as its own default
    pub is_platform_default: bool,
}

impl Voice {
    pub fn new(id: &str, name: &str, lang: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            lang: lang.to_string(),
            is_platform_default: false,
        }
    }

    /// Label shown in the voice picker
    pub fn label(&self) -> String {
        if self.is_platform_default {
            format!("{} ({}) ★", self.name, self.lang)
        } else {
            format!("{} ({})", self.name, self.lang)
        }
    }
}

/// One row of the rendered voice picker
#[derive(Debug, Clone)]
pub struct VoiceOption {
    pub label: String,
    pub selected: bool,
}

/// Source of the platform voice list
#[async_trait]
pub trait VoiceSource: Send + Sync + std::fmt::Debug {
    /// Enumerate the currently available voices
    async fn voices(&self) -> anyhow::Result<Vec<Voice>>;
}

/// Fixed voice list, used by the scripted engine and in tests
#[derive(Debug, Clone, Default)]
pub struct StaticVoices {
    voices: Vec<Voice>,
}

impl StaticVoices {
    pub fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    /// Demo voice list for engines with no real enumeration
    pub fn builtin() -> Self {
        Self::new(vec![
            Voice::new("builtin/zira", "Zira", "en-US"),
            Voice::new("builtin/david", "David", "en-US"),
            Voice::new("builtin/hazel", "Hazel", "en-GB"),
            Voice::new("builtin/amelie", "Amelie", "fr-FR"),
        ])
    }
}

#[async_trait]
impl VoiceSource for StaticVoices {
    async fn voices(&self) -> anyhow::Result<Vec<Voice>> {
        Ok(self.voices.clone())
    }
}

/// Owns the voice list and the current selection.
///
/// Selection rules: index 0 until the first non-empty refresh applies the
/// auto-default heuristic; after that only `select()` or a refresh that
/// drops the selected voice may move it.
#[derive(Debug)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
    selected: usize,
    defaulted: bool,
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceCatalog {
    pub fn new() -> Self {
        Self {
            voices: Vec::new(),
            selected: 0,
            defaulted: false,
        }
    }

    /// Re-read the voice list from the source.
    ///
    /// A failing source degrades to an empty catalog. Safe to call
    /// repeatedly; the selection follows the voice id across refreshes and
    /// is re-defaulted if the selected voice disappeared.
    pub async fn refresh(&mut self, source: &dyn VoiceSource) {
        let fresh = match source.voices().await {
            Ok(v) => v,
            Err(e) => {
                warn!("⚠️ Voice enumeration failed: {}", e);
                Vec::new()
            }
        };

        let prev_id = self.voices.get(self.selected).map(|v| v.id.clone());
        self.voices = fresh;

        if self.voices.is_empty() {
            self.selected = 0;
            return;
        }

        if let Some(id) = prev_id {
            if let Some(idx) = self.voices.iter().position(|v| v.id == id) {
                self.selected = idx;
                return;
            }
            // Selected voice vanished from the list; fall through and
            // re-run the default heuristic rather than clamping.
            debug!("Selected voice '{}' disappeared, re-defaulting", id);
            self.selected = default_index(&self.voices);
            return;
        }

        if !self.defaulted {
            self.selected = default_index(&self.voices);
            self.defaulted = true;
            info!(
                "🎙️ Auto-selected voice: {}",
                self.voices[self.selected].label()
            );
        }
    }

    /// Explicit user selection; out-of-range indices are rejected
    pub fn select(&mut self, index: usize) -> AvaResult<()> {
        if index >= self.voices.len() {
            return Err(AvaError::Selection {
                index,
                len: self.voices.len(),
            });
        }
        self.selected = index;
        info!("📌 Voice selected: {}", self.voices[index].label());
        Ok(())
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// The currently selected voice, if the catalog is non-empty
    pub fn selected_voice(&self) -> Option<&Voice> {
        self.voices.get(self.selected)
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Rows for the voice picker, highlighting the current selection
    pub fn options(&self) -> Vec<VoiceOption> {
        self.voices
            .iter()
            .enumerate()
            .map(|(idx, v)| VoiceOption {
                label: v.label(),
                selected: idx == self.selected,
            })
            .collect()
    }
}

/// Default-selection heuristic: prefer an English voice with a
/// male-associated name marker, then any English voice, then index 0.
pub fn default_index(voices: &[Voice]) -> usize {
    if let Some(idx) = voices
        .iter()
        .position(|v| v.lang.contains("en") && MALE_MARKERS.iter().any(|m| v.name.contains(m)))
    {
        return idx;
    }
    if let Some(idx) = voices.iter().position(|v| v.lang.contains("en")) {
        return idx;
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_of(voices: Vec<Voice>) -> (VoiceCatalog, StaticVoices) {
        (VoiceCatalog::new(), StaticVoices::new(voices))
    }

    #[tokio::test]
    async fn test_default_prefers_male_marker() {
        let (mut catalog, source) = catalog_of(vec![
            Voice::new("v0", "Zira", "en-US"),
            Voice::new("v1", "David", "en-US"),
        ]);
        catalog.refresh(&source).await;
        assert_eq!(catalog.selected_index(), 1);
        assert_eq!(catalog.selected_voice().unwrap().name, "David");
    }

    #[tokio::test]
    async fn test_default_falls_back_to_english() {
        let (mut catalog, source) = catalog_of(vec![
            Voice::new("v0", "Amelie", "fr-FR"),
            Voice::new("v1", "Zira", "en-US"),
        ]);
        catalog.refresh(&source).await;
        assert_eq!(catalog.selected_index(), 1);
    }

    #[tokio::test]
    async fn test_default_index_zero_when_no_english() {
        let (mut catalog, source) = catalog_of(vec![
            Voice::new("v0", "Amelie", "fr-FR"),
            Voice::new("v1", "Anna", "de-DE"),
        ]);
        catalog.refresh(&source).await;
        assert_eq!(catalog.selected_index(), 0);
    }

    #[tokio::test]
    async fn test_select_rejects_out_of_range() {
        let (mut catalog, source) = catalog_of(vec![Voice::new("v0", "Zira", "en-US")]);
        catalog.refresh(&source).await;

        let err = catalog.select(5).unwrap_err();
        assert!(matches!(
            err,
            AvaError::Selection { index: 5, len: 1 }
        ));
        // Selection untouched after the rejected call
        assert_eq!(catalog.selected_index(), 0);
    }

    #[tokio::test]
    async fn test_refresh_preserves_selection_by_id() {
        let mut catalog = VoiceCatalog::new();
        catalog
            .refresh(&StaticVoices::new(vec![
                Voice::new("v0", "Zira", "en-US"),
                Voice::new("v1", "Hazel", "en-GB"),
            ]))
            .await;
        catalog.select(1).unwrap();

        // Same voices, reordered: selection should follow the id
        catalog
            .refresh(&StaticVoices::new(vec![
                Voice::new("v1", "Hazel", "en-GB"),
                Voice::new("v0", "Zira", "en-US"),
            ]))
            .await;
        assert_eq!(catalog.selected_voice().unwrap().id, "v1");
    }

    #[tokio::test]
    async fn test_refresh_redefaults_when_selection_vanishes() {
        let mut catalog = VoiceCatalog::new();
        catalog
            .refresh(&StaticVoices::new(vec![
                Voice::new("v0", "Zira", "en-US"),
                Voice::new("v1", "Hazel", "en-GB"),
                Voice::new("v2", "David", "en-US"),
            ]))
            .await;
        catalog.select(1).unwrap();

        // Hazel is gone after the shrink
        catalog
            .refresh(&StaticVoices::new(vec![
                Voice::new("v0", "Zira", "en-US"),
                Voice::new("v2", "David", "en-US"),
            ]))
            .await;
        assert_eq!(catalog.selected_voice().unwrap().name, "David");
    }

    #[tokio::test]
    async fn test_failing_source_degrades_to_empty() {
        #[derive(Debug)]
        struct BrokenSource;

        #[async_trait]
        impl VoiceSource for BrokenSource {
            async fn voices(&self) -> anyhow::Result<Vec<Voice>> {
                Err(anyhow::anyhow!("platform unavailable"))
            }
        }

        let mut catalog = VoiceCatalog::new();
        catalog.refresh(&BrokenSource).await;
        assert!(catalog.is_empty());
        assert!(catalog.selected_voice().is_none());
    }

    #[tokio::test]
    async fn test_options_highlight_selection() {
        let (mut catalog, source) = catalog_of(vec![
            Voice::new("v0", "Zira", "en-US"),
            Voice::new("v1", "David", "en-US"),
        ]);
        catalog.refresh(&source).await;

        let options = catalog.options();
        assert_eq!(options.len(), 2);
        assert!(!options[0].selected);
        assert!(options[1].selected);
        assert_eq!(options[1].label, "David (en-US)");
    }
}
