use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};

/// Metadata for one model the backend can download and serve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub size: String,
    pub downloaded: bool,
    /// Backend architecture hint (`type` on the wire).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    pub downloading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModelDescriptor {
    /// Label used in model pickers, e.g. `Llama (7B)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.size)
    }
}

#[derive(Debug, Deserialize)]
struct DescriptorFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: String,
    #[serde(default)]
    downloaded: bool,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    downloading: bool,
    #[serde(default)]
    error: Option<String>,
}

impl DescriptorFields {
    fn into_descriptor(self, id: String) -> ModelDescriptor {
        ModelDescriptor {
            id,
            name: self.name,
            size: self.size,
            downloaded: self.downloaded,
            kind: self.kind,
            progress: self.progress,
            downloading: self.downloading,
            error: self.error.filter(|e| !e.is_empty()),
        }
    }
}

/// The `/models` mapping, kept in the order the backend listed it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        Self { models }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Resolve a 1-based list index or a literal id.
    pub fn resolve(&self, input: &str) -> Option<&ModelDescriptor> {
        if let Ok(index) = input.parse::<usize>() {
            return index.checked_sub(1).and_then(|i| self.models.get(i));
        }
        self.get(input)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Model to select after the list is loaded.
    ///
    /// Every downloaded model is taken in turn, so the last downloaded one in
    /// list order wins. Without any downloaded model the first entry is used.
    pub fn initial_selection(&self) -> Option<&ModelDescriptor> {
        self.models
            .iter()
            .rev()
            .find(|m| m.downloaded)
            .or_else(|| self.models.first())
    }
}

impl<'de> Deserialize<'de> for ModelCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let models = raw
            .into_iter()
            .map(|(id, value)| {
                serde_json::from_value::<DescriptorFields>(value)
                    .map(|fields| fields.into_descriptor(id))
                    .map_err(D::Error::custom)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { models })
    }
}

impl<'a> IntoIterator for &'a ModelCatalog {
    type Item = &'a ModelDescriptor;
    type IntoIter = std::slice::Iter<'a, ModelDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}
