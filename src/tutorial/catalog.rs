//! Step catalog — the ordered, immutable list of tutorial steps.
//!
//! Built once at startup from the base steps plus an optional operator file
//! of custom steps (base first, then custom). Never mutated afterwards.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::TutorialError;

/// A single step as authored (base list or custom steps file).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepDefinition {
    pub title: String,
    pub description: String,
    pub action_prompt: String,
    pub emoji: String,
}

impl StepDefinition {
    fn new(title: &str, description: &str, action_prompt: &str, emoji: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            action_prompt: action_prompt.to_string(),
            emoji: emoji.to_string(),
        }
    }
}

/// A step with its position in the catalog.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TutorialStep {
    /// 0-based, contiguous.
    pub index: usize,
    pub title: String,
    pub description: String,
    pub action_prompt: String,
    pub emoji: String,
}

/// The steps every server gets unless base steps are disabled.
pub fn base_steps() -> Vec<StepDefinition> {
    vec![
        StepDefinition::new(
            "Welcome!",
            "Welcome to the server! We'll show you around step by step.",
            "Say a quick hello in the introductions channel.",
            "👋",
        ),
        StepDefinition::new(
            "Read the rules",
            "Check the server rules so everyone can have a good time.",
            "Open #rules and react with ✅ once you've read them.",
            "📜",
        ),
        StepDefinition::new(
            "Pick your roles",
            "Choose roles that match your interests and what you do.",
            "Head to #role-selection and pick the roles you like.",
            "🏷️",
        ),
        StepDefinition::new(
            "Start talking",
            "Time to meet the other members!",
            "Post a message or a question in #general.",
            "🗣️",
        ),
        StepDefinition::new(
            "Notification settings",
            "Set things up so you only get the notifications you want.",
            "Right-click the server name and open Notification Settings.",
            "🔔",
        ),
        StepDefinition::new(
            "Getting help",
            "Whenever something is unclear, just ask us.",
            "Type `help` at any time to see what you can do.",
            "🆘",
        ),
    ]
}

/// Ordered, immutable list of tutorial steps. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StepCatalog {
    steps: Arc<[TutorialStep]>,
}

impl StepCatalog {
    /// Build a catalog from definitions, assigning contiguous indices.
    ///
    /// Fails with `CatalogEmpty` when there are no steps at all.
    pub fn new(definitions: Vec<StepDefinition>) -> Result<Self, TutorialError> {
        if definitions.is_empty() {
            return Err(TutorialError::CatalogEmpty);
        }
        let steps: Vec<TutorialStep> = definitions
            .into_iter()
            .enumerate()
            .map(|(index, def)| TutorialStep {
                index,
                title: def.title,
                description: def.description,
                action_prompt: def.action_prompt,
                emoji: def.emoji,
            })
            .collect();
        Ok(Self {
            steps: steps.into(),
        })
    }

    /// Load base steps (optionally) followed by the custom steps file.
    ///
    /// A missing custom file is normal. A present but unreadable or malformed
    /// file is logged and skipped so the base steps still load.
    pub async fn load(
        include_base: bool,
        custom_path: Option<&Path>,
    ) -> Result<Self, TutorialError> {
        let mut definitions = if include_base {
            base_steps()
        } else {
            Vec::new()
        };
        let base_count = definitions.len();

        if let Some(path) = custom_path {
            definitions.extend(load_custom_steps(path).await);
        }

        let catalog = Self::new(definitions)?;
        info!(
            total = catalog.len(),
            base = base_count,
            custom = catalog.len() - base_count,
            "Tutorial catalog loaded"
        );
        Ok(catalog)
    }

    /// All steps in order.
    pub fn steps(&self) -> &[TutorialStep] {
        &self.steps
    }

    pub fn get(&self, index: usize) -> Option<&TutorialStep> {
        self.steps.get(index)
    }

    /// Number of steps (`N`). A record at `current_step == N` is finished.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a constructed catalog; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

async fn load_custom_steps(path: &Path) -> Vec<StepDefinition> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read custom tutorial steps");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<StepDefinition>>(&raw) {
        Ok(steps) => steps,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed custom tutorial steps");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_contiguous_from_zero() {
        let catalog = StepCatalog::new(base_steps()).unwrap();
        for (i, step) in catalog.steps().iter().enumerate() {
            assert_eq!(step.index, i);
        }
        assert_eq!(catalog.len(), 6);
    }

    #[test]
    fn empty_definitions_rejected() {
        let err = StepCatalog::new(Vec::new()).unwrap_err();
        assert!(matches!(err, TutorialError::CatalogEmpty));
    }

    #[tokio::test]
    async fn custom_steps_appended_after_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        let custom = vec![StepDefinition::new("Projects", "Join a project.", "Visit #projects.", "🚀")];
        std::fs::write(&path, serde_json::to_string(&custom).unwrap()).unwrap();

        let catalog = StepCatalog::load(true, Some(&path)).await.unwrap();
        assert_eq!(catalog.len(), 7);
        let last = catalog.get(6).unwrap();
        assert_eq!(last.index, 6);
        assert_eq!(last.title, "Projects");
        assert_eq!(catalog.get(0).unwrap().title, "Welcome!");
    }

    #[tokio::test]
    async fn missing_custom_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = StepCatalog::load(true, Some(&dir.path().join("nope.json")))
            .await
            .unwrap();
        assert_eq!(catalog.len(), base_steps().len());
    }

    #[tokio::test]
    async fn malformed_custom_file_falls_back_to_base() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, "{ not json").unwrap();

        let catalog = StepCatalog::load(true, Some(&path)).await.unwrap();
        assert_eq!(catalog.len(), base_steps().len());
    }

    #[tokio::test]
    async fn no_base_and_no_custom_is_fatal() {
        let err = StepCatalog::load(false, None).await.unwrap_err();
        assert!(matches!(err, TutorialError::CatalogEmpty));
    }

    #[tokio::test]
    async fn custom_only_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(
            &path,
            r#"[{"title":"Only","description":"d","action_prompt":"a","emoji":"✨"}]"#,
        )
        .unwrap();

        let catalog = StepCatalog::load(false, Some(&path)).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(0).unwrap().title, "Only");
    }
}
