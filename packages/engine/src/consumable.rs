//! # Consumables
//!
//! Per-pass bookkeeping of what converters have already claimed, so that
//! independent converters can share one pass without converting the same
//! thing twice.
//!
//! ## View side
//!
//! Every view element has separate aspects: its name, each class, each
//! attribute and each style. Text nodes have a single aspect. Converters
//! `test` first, then `consume`, which hands back a [`Claim`]. The upcast
//! API only inserts content for a caller holding a claim, and `revert` takes
//! the claim back to make the aspects available again.
//!
//! ## Model side
//!
//! Downcast consumables track `(item, event)` pairs: an element, a text range
//! or a marker range against `insert:paragraph`, `attribute:bold:$text`,
//! `addMarker:comment`.

use quire_model::{ElementId, Range};
use quire_view::{ViewDocumentFragment, ViewElement, ViewNode, ViewNodeId};
use std::collections::{BTreeMap, HashMap};

/// Which aspects of a view element a converter is after.
///
/// The attribute names `class` and `style` stand for all classes and all
/// styles of the element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Match {
    pub name: bool,
    pub classes: Vec<String>,
    pub attributes: Vec<String>,
    pub styles: Vec<String>,
}

impl Match {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only the element name
    pub fn name() -> Self {
        Self {
            name: true,
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>) -> Self {
        self.attributes.push(key.into());
        self
    }

    pub fn with_style(mut self, key: impl Into<String>) -> Self {
        self.styles.push(key.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.name && self.classes.is_empty() && self.attributes.is_empty() && self.styles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Aspect {
    Name,
    Class(String),
    Attribute(String),
    Style(String),
}

/// Proof that a converter consumed some aspects of a view item.
///
/// Not `Clone`: a claim is spent by [`ViewConsumable::revert`].
#[derive(Debug, PartialEq)]
pub struct Claim {
    item: ViewNodeId,
    aspects: Vec<Aspect>,
}

impl Claim {
    pub fn item(&self) -> ViewNodeId {
        self.item
    }
}

#[derive(Debug, Clone, Default)]
struct ElementAspects {
    name: bool,
    classes: BTreeMap<String, bool>,
    attributes: BTreeMap<String, bool>,
    styles: BTreeMap<String, bool>,
}

impl ElementAspects {
    fn of(element: &ViewElement) -> Self {
        Self {
            name: true,
            classes: element.classes.iter().map(|class| (class.clone(), true)).collect(),
            attributes: element.attributes.keys().map(|key| (key.clone(), true)).collect(),
            styles: element.styles.keys().map(|key| (key.clone(), true)).collect(),
        }
    }

    fn expand(&self, descriptor: &Match) -> Vec<Aspect> {
        let mut aspects = Vec::new();
        if descriptor.name {
            aspects.push(Aspect::Name);
        }
        aspects.extend(descriptor.classes.iter().cloned().map(Aspect::Class));
        for key in &descriptor.attributes {
            match key.as_str() {
                "class" => aspects.extend(self.classes.keys().cloned().map(Aspect::Class)),
                "style" => aspects.extend(self.styles.keys().cloned().map(Aspect::Style)),
                _ => aspects.push(Aspect::Attribute(key.clone())),
            }
        }
        aspects.extend(descriptor.styles.iter().cloned().map(Aspect::Style));
        aspects
    }

    fn slot(&mut self, aspect: &Aspect) -> Option<&mut bool> {
        match aspect {
            Aspect::Name => Some(&mut self.name),
            Aspect::Class(class) => self.classes.get_mut(class),
            Aspect::Attribute(key) => self.attributes.get_mut(key),
            Aspect::Style(key) => self.styles.get_mut(key),
        }
    }

    fn get(&self, aspect: &Aspect) -> Option<bool> {
        match aspect {
            Aspect::Name => Some(self.name),
            Aspect::Class(class) => self.classes.get(class).copied(),
            Aspect::Attribute(key) => self.attributes.get(key).copied(),
            Aspect::Style(key) => self.styles.get(key).copied(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewConsumable {
    elements: HashMap<ViewNodeId, ElementAspects>,
    texts: HashMap<ViewNodeId, bool>,
}

impl ViewConsumable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every item below the fragment root
    pub fn create_from(fragment: &ViewDocumentFragment) -> Self {
        let mut consumable = Self::new();
        for child in fragment.children() {
            consumable.add_deep(child);
        }
        consumable
    }

    /// Register one item with all its aspects available
    pub fn add(&mut self, item: &ViewNode) {
        match item {
            ViewNode::Element(element) => {
                self.elements.insert(element.id, ElementAspects::of(element));
            }
            ViewNode::Text(text) => {
                self.texts.insert(text.id, true);
            }
        }
    }

    fn add_deep(&mut self, item: &ViewNode) {
        self.add(item);
        if let ViewNode::Element(element) = item {
            for child in &element.children {
                self.add_deep(child);
            }
        }
    }

    /// `None` when the item or an aspect is unknown, `Some(false)` when
    /// anything asked for is already consumed.
    pub fn test(&self, item: &ViewNode, descriptor: &Match) -> Option<bool> {
        match item {
            ViewNode::Text(text) => self.texts.get(&text.id).copied(),
            ViewNode::Element(element) => {
                let aspects = self.elements.get(&element.id)?;
                let wanted = aspects.expand(descriptor);
                if wanted.is_empty() {
                    return None;
                }
                let mut available = true;
                for aspect in &wanted {
                    available &= aspects.get(aspect)?;
                }
                Some(available)
            }
        }
    }

    /// Consume the aspects if all are available
    pub fn consume(&mut self, item: &ViewNode, descriptor: &Match) -> Option<Claim> {
        if self.test(item, descriptor) != Some(true) {
            return None;
        }

        match item {
            ViewNode::Text(text) => {
                self.texts.insert(text.id, false);
                Some(Claim {
                    item: text.id,
                    aspects: vec![Aspect::Name],
                })
            }
            ViewNode::Element(element) => {
                let aspects = self.elements.get_mut(&element.id)?;
                let wanted = aspects.expand(descriptor);
                for aspect in &wanted {
                    if let Some(slot) = aspects.slot(aspect) {
                        *slot = false;
                    }
                }
                Some(Claim {
                    item: element.id,
                    aspects: wanted,
                })
            }
        }
    }

    /// Whether every aspect of `claim` is consumed here
    pub fn holds(&self, claim: &Claim) -> bool {
        if let Some(available) = self.texts.get(&claim.item) {
            return !available;
        }
        self.elements
            .get(&claim.item)
            .is_some_and(|aspects| claim.aspects.iter().all(|aspect| aspects.get(aspect) == Some(false)))
    }

    /// Make the claimed aspects available again
    pub fn revert(&mut self, claim: Claim) {
        if let Some(available) = self.texts.get_mut(&claim.item) {
            *available = true;
            return;
        }
        if let Some(aspects) = self.elements.get_mut(&claim.item) {
            for aspect in &claim.aspects {
                if let Some(slot) = aspects.slot(aspect) {
                    *slot = true;
                }
            }
        }
    }
}

/// Downcast item key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModelItem {
    Element(ElementId),
    /// Text range, or the whole range of a marker
    Range(Range),
}

#[derive(Debug, Clone, Default)]
pub struct ModelConsumable {
    items: HashMap<(ModelItem, String), bool>,
}

impl ModelConsumable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: ModelItem, event: impl Into<String>) {
        self.items.insert((item, event.into()), true);
    }

    pub fn test(&self, item: &ModelItem, event: &str) -> Option<bool> {
        self.items.get(&(item.clone(), event.to_string())).copied()
    }

    pub fn consume(&mut self, item: &ModelItem, event: &str) -> bool {
        match self.items.get_mut(&(item.clone(), event.to_string())) {
            Some(available) if *available => {
                *available = false;
                true
            }
            _ => false,
        }
    }

    /// Make a consumed pair available again; `false` when it was never added
    pub fn revert(&mut self, item: &ModelItem, event: &str) -> bool {
        match self.items.get_mut(&(item.clone(), event.to_string())) {
            Some(available) => {
                *available = true;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_view::notation;

    fn figure() -> (ViewConsumable, ViewNode) {
        let fragment = notation::parse(r#"<figure class="table wide" style="width:50%" id="f"><table></table></figure>"#).unwrap();
        let consumable = ViewConsumable::create_from(&fragment);
        (consumable, fragment.children()[0].clone())
    }

    #[test]
    fn test_consume_twice_then_revert() {
        let (mut consumable, figure) = figure();
        let descriptor = Match::name().with_class("table");

        assert_eq!(consumable.test(&figure, &descriptor), Some(true));
        let claim = consumable.consume(&figure, &descriptor);
        assert!(claim.is_some());
        assert!(consumable.consume(&figure, &descriptor).is_none());
        assert_eq!(consumable.test(&figure, &descriptor), Some(false));

        consumable.revert(claim.unwrap());
        assert_eq!(consumable.test(&figure, &descriptor), Some(true));
    }

    #[test]
    fn test_claims_are_held_only_where_taken() {
        let (mut consumable, figure) = figure();
        // A second parse of the same markup gets its own node ids
        let (other, _) = self::figure();

        let claim = consumable.consume(&figure, &Match::name().with_class("wide")).unwrap();

        assert!(consumable.holds(&claim));
        assert!(!other.holds(&claim));
    }

    #[test]
    fn test_name_does_not_consume_other_aspects() {
        let (mut consumable, figure) = figure();

        assert!(consumable.consume(&figure, &Match::name()).is_some());
        assert_eq!(consumable.test(&figure, &Match::new().with_class("wide")), Some(true));
        assert_eq!(consumable.test(&figure, &Match::new().with_attribute("id")), Some(true));
        assert_eq!(consumable.test(&figure, &Match::new().with_style("width")), Some(true));
    }

    #[test]
    fn test_class_attribute_means_all_classes() {
        let (mut consumable, figure) = figure();

        assert!(consumable.consume(&figure, &Match::new().with_attribute("class")).is_some());
        assert_eq!(consumable.test(&figure, &Match::new().with_class("table")), Some(false));
        assert_eq!(consumable.test(&figure, &Match::new().with_class("wide")), Some(false));
        assert_eq!(consumable.test(&figure, &Match::new().with_style("width")), Some(true));
    }

    #[test]
    fn test_unknown_items_and_aspects() {
        let (consumable, figure) = figure();
        let stranger = ViewNode::text("x");

        assert_eq!(consumable.test(&stranger, &Match::name()), None);
        assert_eq!(consumable.test(&figure, &Match::new().with_class("missing")), None);
        assert_eq!(consumable.test(&figure, &Match::new()), None);
    }

    #[test]
    fn test_children_are_registered() {
        let (consumable, figure) = figure();
        let table = &figure.as_element().unwrap().children[0];

        assert_eq!(consumable.test(table, &Match::name()), Some(true));
    }

    #[test]
    fn test_model_consumable() {
        let mut consumable = ModelConsumable::new();
        let item = ModelItem::Element(ElementId(7));
        consumable.add(item.clone(), "insert:paragraph");

        assert_eq!(consumable.test(&item, "insert:paragraph"), Some(true));
        assert!(consumable.consume(&item, "insert:paragraph"));
        assert!(!consumable.consume(&item, "insert:paragraph"));
        assert!(consumable.revert(&item, "insert:paragraph"));
        assert_eq!(consumable.test(&item, "insert:paragraph"), Some(true));
        assert_eq!(consumable.test(&item, "insert:heading"), None);
    }
}
