//! # Schema
//!
//! A minimal registry of what may go where. Converters consult it before
//! inserting model content; nothing here mutates the tree.
//!
//! Names starting with `$` are generic groups: `$root`, `$block` (anything
//! allowed where blocks go), `$text` and `$marker`.

use std::collections::BTreeMap;
use tracing::debug;

/// Registration for one model item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaItem {
    /// Parents this item may be inserted into
    pub allow_in: Vec<String>,
    /// Inherit `allow_in` from another item (`$block`)
    pub allow_where: Option<String>,
    /// Accept the same children as another item (`$root`, `$block`)
    pub allow_content_of: Option<String>,
    pub allow_attributes: Vec<String>,
    pub is_block: bool,
    pub is_object: bool,
    pub is_limit: bool,
}

impl SchemaItem {
    pub fn allow_in(mut self, parent: impl Into<String>) -> Self {
        self.allow_in.push(parent.into());
        self
    }

    pub fn allow_where(mut self, item: impl Into<String>) -> Self {
        self.allow_where = Some(item.into());
        self
    }

    pub fn allow_content_of(mut self, item: impl Into<String>) -> Self {
        self.allow_content_of = Some(item.into());
        self
    }

    pub fn allow_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_attributes.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn block(mut self) -> Self {
        self.is_block = true;
        self
    }

    pub fn object(mut self) -> Self {
        self.is_object = true;
        self
    }

    pub fn limit(mut self) -> Self {
        self.is_limit = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    items: BTreeMap<String, SchemaItem>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// Schema with the generic items every editor has: `$root`, `$block`,
    /// `$text`, `$marker` and `paragraph`.
    pub fn new() -> Self {
        let mut schema = Self {
            items: BTreeMap::new(),
        };
        schema.register("$root", SchemaItem::default().limit());
        schema.register("$block", SchemaItem::default().allow_in("$root").block());
        schema.register("$text", SchemaItem::default().allow_in("$block"));
        schema.register("$marker", SchemaItem::default());
        schema.register(
            "paragraph",
            SchemaItem::default()
                .allow_where("$block")
                .allow_content_of("$block")
                .block(),
        );
        schema
    }

    /// Schema with nothing registered
    pub fn empty() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, item: SchemaItem) {
        let name = name.into();
        debug!(item = %name, "registering schema item");
        self.items.insert(name, item);
    }

    /// Add to an existing registration, creating it if needed
    pub fn extend(&mut self, name: &str, extend: impl FnOnce(&mut SchemaItem)) {
        extend(self.items.entry(name.to_string()).or_default());
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    pub fn item(&self, name: &str) -> Option<&SchemaItem> {
        self.items.get(name)
    }

    pub fn is_block(&self, name: &str) -> bool {
        self.items.get(name).is_some_and(|item| item.is_block)
    }

    pub fn is_object(&self, name: &str) -> bool {
        self.items.get(name).is_some_and(|item| item.is_object)
    }

    pub fn is_limit(&self, name: &str) -> bool {
        self.items.get(name).is_some_and(|item| item.is_limit || item.is_object)
    }

    /// Parents `name` may be inserted into, with `allow_where` resolved
    fn allowed_parents(&self, name: &str) -> Vec<&str> {
        let mut parents = Vec::new();
        let mut current = Some(name);
        let mut seen = Vec::new();

        while let Some(item_name) = current {
            if seen.contains(&item_name) {
                break;
            }
            seen.push(item_name);
            let Some(item) = self.items.get(item_name) else {
                break;
            };
            parents.extend(item.allow_in.iter().map(String::as_str));
            current = item.allow_where.as_deref();
        }

        parents
    }

    /// Names whose content `parent` accepts, following `allow_content_of`
    fn content_sources<'a>(&'a self, parent: &'a str) -> Vec<&'a str> {
        let mut sources = vec![parent];
        let mut current = parent;

        while let Some(next) = self.items.get(current).and_then(|item| item.allow_content_of.as_deref()) {
            if sources.contains(&next) {
                break;
            }
            sources.push(next);
            current = next;
        }

        sources
    }

    /// Whether `child` (an element name or `$text`) may be a child of `parent`
    pub fn check_child(&self, parent: &str, child: &str) -> bool {
        if child == "$marker" {
            return true;
        }
        if !self.items.contains_key(parent) || !self.items.contains_key(child) {
            return false;
        }

        let allowed = self.allowed_parents(child);
        self.content_sources(parent)
            .iter()
            .any(|source| allowed.contains(source))
    }

    /// Whether `key` may be set on `item` (an element name or `$text`)
    pub fn check_attribute(&self, item: &str, key: &str) -> bool {
        let mut current = Some(item);
        let mut depth = 0;

        while let Some(name) = current {
            let Some(registered) = self.items.get(name) else {
                return false;
            };
            if registered.allow_attributes.iter().any(|allowed| allowed == key) {
                return true;
            }
            current = registered.allow_where.as_deref();
            depth += 1;
            if depth > self.items.len() {
                break;
            }
        }

        false
    }

    /// Whether `child` would fit into a paragraph inserted into `parent`
    pub fn is_paragraphable(&self, parent: &str, child: &str) -> bool {
        self.check_child(parent, "paragraph") && self.check_child("paragraph", child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_items() {
        let schema = Schema::new();

        assert!(schema.check_child("$root", "paragraph"));
        assert!(schema.check_child("paragraph", "$text"));
        assert!(!schema.check_child("$root", "$text"));
        assert!(!schema.check_child("paragraph", "paragraph"));
        assert!(schema.check_child("$root", "$marker"));
        assert!(!schema.check_child("$root", "unknown"));
    }

    #[test]
    fn test_attributes_follow_allow_where() {
        let mut schema = Schema::new();
        schema.extend("$text", |item| item.allow_attributes.push("bold".to_string()));
        schema.extend("$block", |item| item.allow_attributes.push("alignment".to_string()));

        assert!(schema.check_attribute("$text", "bold"));
        assert!(schema.check_attribute("paragraph", "alignment"));
        assert!(!schema.check_attribute("paragraph", "bold"));
    }

    #[test]
    fn test_paragraphable() {
        let schema = Schema::new();

        assert!(schema.is_paragraphable("$root", "$text"));
        assert!(!schema.is_paragraphable("paragraph", "$text"));
    }
}
