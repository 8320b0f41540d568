use super::preview::PropsEditor;
use super::schema::{coerce, initial_value, ComponentSchema, ObjectField};
use folio_model::Node;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub type DefaultPropsFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// A registered custom block type
#[derive(Clone)]
pub struct ComponentBlockDefinition {
    pub key: String,
    pub label: String,
    pub schema: ComponentSchema,
    /// Rendered without the editor's frame and toolbar
    pub chromeless: bool,
    /// Named editable regions, in order. A block without slots is void.
    pub slots: Vec<String>,
    /// Extra search terms for the insert menu
    pub keywords: Vec<String>,
    default_props: Option<DefaultPropsFactory>,
}

impl fmt::Debug for ComponentBlockDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBlockDefinition")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("chromeless", &self.chromeless)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl ComponentBlockDefinition {
    pub fn new<K: Into<String>>(
        key: &str,
        label: &str,
        fields: impl IntoIterator<Item = (K, ComponentSchema)>,
    ) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            schema: ComponentSchema::Object(ObjectField {
                fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            }),
            chromeless: false,
            slots: Vec::new(),
            keywords: Vec::new(),
            default_props: None,
        }
    }

    pub fn chromeless(mut self, chromeless: bool) -> Self {
        self.chromeless = chromeless;
        self
    }

    pub fn with_slot(mut self, name: &str) -> Self {
        self.slots.push(name.to_string());
        self
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Props for new blocks; coerced against the schema on use
    pub fn with_default_props(mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default_props = Some(Arc::new(factory));
        self
    }

    pub fn default_props(&self) -> Value {
        match &self.default_props {
            Some(factory) => coerce(&self.schema, &factory()),
            None => initial_value(&self.schema),
        }
    }

    /// A new block node with default props and one empty paragraph per slot
    pub fn create_node(&self) -> Node {
        let slots = self
            .slots
            .iter()
            .map(|name| Node::component_slot(name.as_str(), vec![Node::empty_paragraph()]))
            .collect();
        Node::component_block(self.key.as_str(), self.default_props(), slots)
    }

    pub fn props_editor(&self, props: &Value) -> PropsEditor {
        PropsEditor::new(self.schema.clone(), props)
    }
}

/// Component blocks available to one editor, keyed by component key
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    blocks: BTreeMap<String, Arc<ComponentBlockDefinition>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: ComponentBlockDefinition) -> &mut Self {
        self.blocks.insert(definition.key.clone(), Arc::new(definition));
        self
    }

    pub fn with(mut self, definition: ComponentBlockDefinition) -> Self {
        self.register(definition);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Arc<ComponentBlockDefinition>> {
        self.blocks.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentBlockDefinition>> {
        self.blocks.values()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
