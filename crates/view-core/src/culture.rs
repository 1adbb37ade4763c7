//! Culture names for a render.

use serde::{Deserialize, Serialize};

/// Culture and UI culture in effect for a render.
///
/// Passed explicitly to anything that varies on culture. The default is the
/// invariant culture, whose names are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestCulture {
    /// Culture used for formatting (e.g. `fr-FR`).
    pub culture: String,
    /// Culture used for resource lookup.
    pub ui_culture: String,
}

impl RequestCulture {
    /// Create a culture pair.
    pub fn new(culture: impl Into<String>, ui_culture: impl Into<String>) -> Self {
        Self {
            culture: culture.into(),
            ui_culture: ui_culture.into(),
        }
    }

    /// Use the same name for culture and UI culture.
    pub fn single(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            culture: name.clone(),
            ui_culture: name,
        }
    }

    /// The invariant culture.
    pub fn invariant() -> Self {
        Self::default()
    }

    /// Check if this is the invariant culture.
    pub fn is_invariant(&self) -> bool {
        self.culture.is_empty() && self.ui_culture.is_empty()
    }
}
