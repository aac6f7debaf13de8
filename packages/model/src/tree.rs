//! Low-level tree edits on owned elements.
//!
//! Paths are relative to the element passed in; the last entry is an offset
//! in its parent. Every edit leaves the touched parent normalized: adjacent
//! texts with equal attributes merged, empty texts dropped.

use crate::error::{ModelError, ModelResult};
use crate::node::{Element, Node};
use serde_json::Value;

/// Element addressed by a path of element offsets
pub fn descend<'a>(root: &'a Element, path: &[usize]) -> Option<&'a Element> {
    let mut current = root;
    for &offset in path {
        let (index, start) = current.child_at_offset(offset)?;
        if start != offset {
            return None;
        }
        current = current.children[index].as_element()?;
    }
    Some(current)
}

pub fn descend_mut<'a>(root: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    let mut current = root;
    for &offset in path {
        let (index, start) = current.child_at_offset(offset)?;
        if start != offset {
            return None;
        }
        current = current.children.get_mut(index)?.as_element_mut()?;
    }
    Some(current)
}

/// Make sure a child boundary exists at `offset`, splitting a text node if
/// needed. Returns the index of the first child at or after the offset.
pub fn split_at(parent: &mut Element, offset: usize) -> Option<usize> {
    if offset == parent.max_offset() {
        return Some(parent.children.len());
    }
    let (index, start) = parent.child_at_offset(offset)?;
    if start == offset {
        return Some(index);
    }

    let Node::Text(text) = &parent.children[index] else {
        return None;
    };
    let left = text.slice(0, offset - start);
    let right = text.slice(offset - start, text.len());
    parent.children[index] = Node::Text(left);
    parent.children.insert(index + 1, Node::Text(right));
    Some(index + 1)
}

/// Merge adjacent texts with equal attributes and drop empty ones
pub fn normalize(parent: &mut Element) {
    let children = std::mem::take(&mut parent.children);
    let mut merged: Vec<Node> = Vec::with_capacity(children.len());

    for child in children {
        if let Node::Text(text) = &child {
            if text.is_empty() {
                continue;
            }
            if let Some(Node::Text(previous)) = merged.last_mut() {
                if previous.attributes == text.attributes {
                    previous.data.push_str(&text.data);
                    continue;
                }
            }
        }
        merged.push(child);
    }

    parent.children = merged;
}

pub fn normalize_deep(element: &mut Element) {
    for child in &mut element.children {
        if let Node::Element(inner) = child {
            normalize_deep(inner);
        }
    }
    normalize(element);
}

fn parent_mut<'a>(root: &'a mut Element, path: &[usize]) -> ModelResult<(&'a mut Element, usize)> {
    let (offset, parent_path) = path
        .split_last()
        .ok_or_else(|| ModelError::invalid_position(root.name.clone(), path))?;
    let root_name = root.name.clone();
    let parent = descend_mut(root, parent_path)
        .ok_or_else(|| ModelError::invalid_position(root_name, path))?;
    Ok((parent, *offset))
}

pub fn insert_nodes(root: &mut Element, path: &[usize], nodes: Vec<Node>) -> ModelResult<()> {
    let root_name = root.name.clone();
    let (parent, offset) = parent_mut(root, path)?;
    let index = split_at(parent, offset).ok_or_else(|| ModelError::invalid_position(root_name, path))?;

    let nodes = nodes.into_iter().map(|node| match node {
        Node::Element(mut element) => {
            normalize_deep(&mut element);
            Node::Element(element)
        }
        text => text,
    });
    parent.children.splice(index..index, nodes);
    normalize(parent);
    Ok(())
}

pub fn remove_nodes(root: &mut Element, path: &[usize], how_many: usize) -> ModelResult<Vec<Node>> {
    let root_name = root.name.clone();
    let (parent, offset) = parent_mut(root, path)?;
    if offset + how_many > parent.max_offset() {
        return Err(ModelError::invalid_position(root_name, path));
    }

    let start = split_at(parent, offset).ok_or_else(|| ModelError::invalid_position(root_name.clone(), path))?;
    let end = split_at(parent, offset + how_many).ok_or_else(|| ModelError::invalid_position(root_name, path))?;
    let removed: Vec<Node> = parent.children.drain(start..end).collect();
    normalize(parent);
    Ok(removed)
}

/// Copy of the content between two offsets of `parent`
pub fn slice_nodes(parent: &Element, start: usize, end: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut offset = 0;

    for child in &parent.children {
        let size = child.offset_size();
        let child_end = offset + size;
        if child_end > start && offset < end {
            match child {
                Node::Text(text) => {
                    let from = start.saturating_sub(offset);
                    let to = end.min(child_end) - offset;
                    out.push(Node::Text(text.slice(from, to)));
                }
                Node::Element(_) => out.push(child.clone()),
            }
        }
        offset = child_end;
    }

    out
}

/// Set (or with `None` remove) `key` on every node between `start` and `end`
/// of the parent at `parent_path`.
pub fn set_attribute_range(
    root: &mut Element,
    parent_path: &[usize],
    start: usize,
    end: usize,
    key: &str,
    value: Option<&Value>,
) -> ModelResult<()> {
    let root_name = root.name.clone();
    let invalid = || {
        let mut path = parent_path.to_vec();
        path.push(start);
        ModelError::invalid_position(root_name.clone(), &path)
    };

    let parent = descend_mut(root, parent_path).ok_or_else(invalid)?;
    if end > parent.max_offset() || start > end {
        return Err(invalid());
    }

    let first = split_at(parent, start).ok_or_else(invalid)?;
    let last = split_at(parent, end).ok_or_else(invalid)?;
    for child in &mut parent.children[first..last] {
        let attributes = child.attributes_mut();
        match value {
            Some(value) => {
                attributes.insert(key.to_string(), value.clone());
            }
            None => {
                attributes.remove(key);
            }
        }
    }
    normalize(parent);
    Ok(())
}

/// Rename the element that starts at `path`, returning its previous name
pub fn rename_at(root: &mut Element, path: &[usize], new_name: &str) -> ModelResult<String> {
    let (parent, offset) = parent_mut(root, path)?;
    match parent.child_at_offset(offset) {
        Some((index, start)) if start == offset => match &mut parent.children[index] {
            Node::Element(element) => Ok(std::mem::replace(&mut element.name, new_name.to_string())),
            Node::Text(_) => Err(ModelError::NotAnElement(path.to_vec())),
        },
        _ => Err(ModelError::NotAnElement(path.to_vec())),
    }
}

/// Run `edit` against a temporary fragment element holding `nodes`
pub fn edit_detached<T>(
    nodes: &[Node],
    edit: impl FnOnce(&mut Element) -> ModelResult<T>,
) -> ModelResult<Vec<Node>> {
    let mut holder = Element::new("$fragment").with_children(nodes.iter().cloned());
    edit(&mut holder)?;
    Ok(holder.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Text;

    fn paragraph(children: Vec<Node>) -> Element {
        Element::new("$root").with_child(Element::new("paragraph").with_children(children))
    }

    #[test]
    fn test_insert_splits_and_merges_text() {
        let mut root = paragraph(vec![Node::text("fo")]);
        insert_nodes(&mut root, &[0, 1], vec![Node::text("XY")]).unwrap();

        let p = descend(&root, &[0]).unwrap();
        assert_eq!(p.children, vec![Node::text("fXYo")]);
    }

    #[test]
    fn test_remove_returns_exact_slice() {
        let mut root = paragraph(vec![
            Node::text("abc"),
            Node::element("softBreak"),
            Node::text("de"),
        ]);
        let removed = remove_nodes(&mut root, &[0, 2], 3).unwrap();

        assert_eq!(removed, vec![Node::text("c"), Node::element("softBreak"), Node::text("d")]);
        assert_eq!(descend(&root, &[0]).unwrap().children, vec![Node::text("abe")]);
    }

    #[test]
    fn test_set_attribute_splits_runs() {
        let mut root = paragraph(vec![Node::text("hello")]);
        set_attribute_range(&mut root, &[0], 1, 3, "bold", Some(&Value::Bool(true))).unwrap();

        let p = descend(&root, &[0]).unwrap();
        assert_eq!(p.children.len(), 3);
        assert_eq!(p.children[1], Node::Text(Text::new("el").with_attr("bold", true)));

        set_attribute_range(&mut root, &[0], 1, 3, "bold", None).unwrap();
        assert_eq!(descend(&root, &[0]).unwrap().children, vec![Node::text("hello")]);
    }

    #[test]
    fn test_rename_rejects_text() {
        let mut root = paragraph(vec![Node::text("x")]);

        assert_eq!(rename_at(&mut root, &[0], "heading1").unwrap(), "paragraph");
        assert!(matches!(
            rename_at(&mut root, &[0, 0], "heading1"),
            Err(ModelError::NotAnElement(_))
        ));
    }

    #[test]
    fn test_slice_nodes() {
        let p = Element::new("paragraph")
            .with_child(Text::new("abc"))
            .with_child(Element::new("img"));

        assert_eq!(slice_nodes(&p, 1, 4), vec![Node::text("bc"), Node::element("img")]);
    }
}
