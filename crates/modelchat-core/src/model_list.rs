//! Model picker state - the option list rendered from a catalog

use crate::ModelCatalog;
use serde::{Deserialize, Serialize};

/// Label of the leading placeholder option.
pub const PLACEHOLDER_LABEL: &str = "请选择模型...";

/// One entry in the model picker. The placeholder has an empty value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelOption {
    pub value: String,
    pub label: String,
}

/// Model list - owns picker options and the loading flag
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelList {
    /// Placeholder first, then one option per model
    pub options: Vec<ModelOption>,
    /// Fetching `/models`
    pub loading: bool,
}

impl ModelList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_loading(&mut self) {
        self.loading = true;
    }

    pub fn set_catalog(&mut self, catalog: &ModelCatalog) {
        self.options = std::iter::once(ModelOption {
            value: String::new(),
            label: PLACEHOLDER_LABEL.to_string(),
        })
        .chain(catalog.iter().map(|m| ModelOption {
            value: m.id.clone(),
            label: m.label(),
        }))
        .collect();
        self.loading = false;
    }

    pub fn has_models(&self) -> bool {
        self.options.len() > 1
    }

    pub fn contains(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }
}
