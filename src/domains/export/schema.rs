use crate::config::ExtensionsConfig;
use crate::domains::export::types::{base_column, type_column};
use crate::types::{is_system_property, Entity, SYSTEM_PROPERTIES};
use indexmap::IndexSet;

/// Ordered CSV column set: the system columns, then every property followed
/// by its `@type` column, in first-seen order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    columns: IndexSet<String>,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            columns: SYSTEM_PROPERTIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `property` and its type column unless already present
    pub fn add_property(&mut self, property: &str) {
        if !self.columns.contains(property) {
            self.columns.insert(property.to_string());
        }
        let tag_column = type_column(property);
        if !self.columns.contains(&tag_column) {
            self.columns.insert(tag_column);
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn column(&self, index: usize) -> Option<&str> {
        self.columns.get_index(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Properties that have a value column, in header order
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.columns()
            .filter(|c| !is_system_property(c) && base_column(c).is_none())
    }
}

/// Builds a [`Header`] while collecting every scanned entity.
///
/// Rows can only be rendered once the header is final, so the whole result
/// set stays in memory for one export.
#[derive(Debug, Default)]
pub struct SchemaDiscoverer {
    header: Header,
    config: ExtensionsConfig,
    entities: Vec<Entity>,
}

impl SchemaDiscoverer {
    /// Properties in `config.ignored_properties` never get a column
    pub fn new(config: &ExtensionsConfig) -> Self {
        Self {
            header: Header::new(),
            config: config.clone(),
            entities: Vec::new(),
        }
    }

    pub fn observe(&mut self, entity: Entity) {
        for (name, _) in entity.properties() {
            // system columns are always present already
            if is_system_property(name) || self.config.is_ignored(name) {
                continue;
            }
            self.header.add_property(name);
        }
        self.entities.push(entity);
    }

    pub fn observe_all<I: IntoIterator<Item = Entity>>(&mut self, entities: I) {
        for entity in entities {
            self.observe(entity);
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn finish(self) -> (Header, Vec<Entity>) {
        (self.header, self.entities)
    }
}
