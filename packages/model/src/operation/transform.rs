//! # Operation transformation
//!
//! `a.transformed_by(&b)` answers: `b` was applied first, what should `a`
//! become so it still does what its author meant? Applying `a` then
//! `b.transformed_by(&a)` must give the same tree as applying `b` then
//! `a.transformed_by(&b)`.
//!
//! ## Rules
//!
//! - Insert vs insert at the same position: the side whose serialized
//!   content sorts first goes first.
//! - Content inserted inside removed content is removed with it. The insert
//!   becomes a no-op and the removal absorbs the inserted nodes, so reversing
//!   it restores them.
//! - Overlapping removals remove the overlap once.
//! - Removals absorb attribute changes and renames made inside the removed
//!   content.
//! - Attribute ranges split around inserted content and shrink around
//!   removed content. Two changes of the same key over the same nodes: the
//!   greater new value wins, equal values cancel out.
//! - Two renames of the same element or two changes of the same marker: the
//!   greater new value wins and the loser becomes a no-op.

use super::{AttributePart, Operation, OperationKind};
use crate::error::ModelResult;
use crate::node::{offset_size_of, Element, Node};
use crate::position::Position;
use crate::range::Range;
use crate::tree;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::{trace, warn};

impl Operation {
    /// Rewrite this operation to apply after `other`
    pub fn transformed_by(&self, other: &Operation) -> Operation {
        let kind = transform_kind(&self.kind, &other.kind);
        trace!(
            operation = self.kind.name(),
            by = other.kind.name(),
            result = kind.name(),
            "transformed operation"
        );
        Operation {
            base_version: other.base_version + 1,
            kind,
        }
    }
}

fn transform_kind(a: &OperationKind, b: &OperationKind) -> OperationKind {
    use OperationKind::*;

    match (a, b) {
        (Insert { position, nodes }, Insert { position: other, nodes: other_nodes }) => {
            insert_by_insert(position, nodes, other, other_nodes)
        }
        (Insert { position, nodes }, Remove { position: other, nodes: removed }) => {
            match position.transformed_by_deletion(other, offset_size_of(removed)) {
                Some(position) => Insert {
                    position,
                    nodes: nodes.clone(),
                },
                None => NoOp,
            }
        }
        (Insert { .. }, Attribute { .. } | Rename { .. } | Marker { .. } | NoOp) => a.clone(),

        (Remove { position, nodes }, Insert { position: other, nodes: inserted }) => {
            remove_by_insert(position, nodes, other, inserted)
        }
        (Remove { position, nodes }, Remove { position: other, nodes: removed }) => {
            remove_by_remove(position, nodes, other, removed)
        }
        (Remove { position, nodes }, Attribute { key, parts }) => Remove {
            position: position.clone(),
            nodes: absorb_attribute(position, nodes, key, parts),
        },
        (
            Remove { position, nodes },
            Rename {
                position: renamed,
                new_name,
                ..
            },
        ) => {
            let nodes = if node_removed(renamed, position, offset_size_of(nodes)) {
                let relative = renamed.relative_to_span(position);
                absorb(nodes, |holder| tree::rename_at(holder, &relative.path, new_name).map(|_| ()))
            } else {
                nodes.clone()
            };
            Remove {
                position: position.clone(),
                nodes,
            }
        }
        (Remove { .. }, Marker { .. } | NoOp) => a.clone(),

        (Attribute { key, parts }, Insert { position, nodes }) => {
            attribute_by_insert(key, parts, position, offset_size_of(nodes))
        }
        (Attribute { key, parts }, Remove { position, nodes }) => {
            attribute_by_remove(key, parts, position, offset_size_of(nodes))
        }
        (Attribute { key, parts }, Attribute { key: other_key, parts: other_parts }) => {
            if key == other_key {
                attribute_by_attribute(key, parts, other_parts)
            } else {
                a.clone()
            }
        }
        (Attribute { .. }, Rename { .. } | Marker { .. } | NoOp) => a.clone(),

        (
            Rename {
                position,
                old_name,
                new_name,
            },
            Insert { position: other, nodes },
        ) => Rename {
            position: position.transformed_by_insertion(other, offset_size_of(nodes), true),
            old_name: old_name.clone(),
            new_name: new_name.clone(),
        },
        (
            Rename {
                position,
                old_name,
                new_name,
            },
            Remove { position: other, nodes },
        ) => {
            let how_many = offset_size_of(nodes);
            if node_removed(position, other, how_many) {
                NoOp
            } else {
                Rename {
                    position: position
                        .transformed_by_deletion(other, how_many)
                        .unwrap_or_else(|| position.clone()),
                    old_name: old_name.clone(),
                    new_name: new_name.clone(),
                }
            }
        }
        (
            Rename {
                position, new_name, ..
            },
            Rename {
                position: other,
                new_name: other_name,
                ..
            },
        ) => {
            if position != other {
                a.clone()
            } else if new_name > other_name {
                Rename {
                    position: position.clone(),
                    old_name: other_name.clone(),
                    new_name: new_name.clone(),
                }
            } else {
                NoOp
            }
        }
        (Rename { .. }, Attribute { .. } | Marker { .. } | NoOp) => a.clone(),

        (
            Marker {
                name,
                old_range,
                new_range,
                affects_data,
            },
            Insert { .. } | Remove { .. },
        ) => Marker {
            name: name.clone(),
            old_range: old_range.as_ref().map(|range| transform_range(range, b)),
            new_range: new_range.as_ref().map(|range| transform_range(range, b)),
            affects_data: *affects_data,
        },
        (
            Marker {
                name,
                new_range,
                affects_data,
                ..
            },
            Marker {
                name: other_name,
                new_range: other_range,
                ..
            },
        ) => {
            if name != other_name {
                a.clone()
            } else if compare_serialized(new_range.as_ref(), other_range.as_ref()) == Ordering::Greater {
                Marker {
                    name: name.clone(),
                    old_range: other_range.clone(),
                    new_range: new_range.clone(),
                    affects_data: *affects_data,
                }
            } else {
                NoOp
            }
        }
        (Marker { .. }, Attribute { .. } | Rename { .. } | NoOp) => a.clone(),

        (NoOp, Insert { .. } | Remove { .. } | Attribute { .. } | Rename { .. } | Marker { .. } | NoOp) => NoOp,
    }
}

/// Live-range update of `range` after the structural change `by`.
///
/// Content inserted at a boundary stays outside the range; a collapsed range
/// moves past it. Boundaries inside removed content collapse onto the removal
/// position.
pub fn transform_range(range: &Range, by: &OperationKind) -> Range {
    match by {
        OperationKind::Insert { position, nodes } => {
            let how_many = offset_size_of(nodes);
            if range.is_collapsed() {
                Range::collapsed(range.start.transformed_by_insertion(position, how_many, true))
            } else {
                Range::new(
                    range.start.transformed_by_insertion(position, how_many, true),
                    range.end.transformed_by_insertion(position, how_many, false),
                )
            }
        }
        OperationKind::Remove { position, nodes } => {
            let how_many = offset_size_of(nodes);
            let start = range
                .start
                .transformed_by_deletion(position, how_many)
                .unwrap_or_else(|| position.clone());
            let end = range
                .end
                .transformed_by_deletion(position, how_many)
                .unwrap_or_else(|| position.clone());
            Range::new(start, end)
        }
        OperationKind::Attribute { .. }
        | OperationKind::Rename { .. }
        | OperationKind::Marker { .. }
        | OperationKind::NoOp => range.clone(),
    }
}

/// Order of two optional values: `None` first, then by serialized form
fn compare_serialized<T: Serialize>(a: Option<&T>, b: Option<&T>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => serialized(a).cmp(&serialized(b)),
    }
}

fn serialized<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Whether the node starting at `position` is part of the removed span
fn node_removed(position: &Position, at: &Position, how_many: usize) -> bool {
    position.is_inside_span(at, how_many)
        || (how_many > 0 && position.has_same_parent_as(at) && position.offset() == at.offset())
}

/// Offset after removing `[from, to)` from the same parent
fn map_offset(offset: usize, from: usize, to: usize) -> usize {
    if offset <= from {
        offset
    } else if offset >= to {
        offset - (to - from)
    } else {
        from
    }
}

/// Replay a concurrent change on content captured by a removal
fn absorb(nodes: &[Node], edit: impl FnOnce(&mut Element) -> ModelResult<()>) -> Vec<Node> {
    match tree::edit_detached(nodes, edit) {
        Ok(nodes) => nodes,
        Err(error) => {
            warn!(error = %error, "could not replay a concurrent change on removed content");
            nodes.to_vec()
        }
    }
}

fn insert_by_insert(position: &Position, nodes: &[Node], other: &Position, other_nodes: &[Node]) -> OperationKind {
    let other_goes_first = position == other && serialized(other_nodes) < serialized(nodes);
    OperationKind::Insert {
        position: position.transformed_by_insertion(other, offset_size_of(other_nodes), other_goes_first),
        nodes: nodes.to_vec(),
    }
}

fn remove_by_insert(position: &Position, nodes: &[Node], other: &Position, inserted: &[Node]) -> OperationKind {
    if other.is_inside_span(position, offset_size_of(nodes)) {
        let relative = other.relative_to_span(position);
        let nodes = absorb(nodes, |holder| tree::insert_nodes(holder, &relative.path, inserted.to_vec()));
        return OperationKind::Remove {
            position: position.clone(),
            nodes,
        };
    }

    OperationKind::Remove {
        position: position.transformed_by_insertion(other, offset_size_of(inserted), true),
        nodes: nodes.to_vec(),
    }
}

fn remove_by_remove(position: &Position, nodes: &[Node], other: &Position, removed: &[Node]) -> OperationKind {
    let how_many = offset_size_of(nodes);
    let other_how_many = offset_size_of(removed);

    if position.has_same_parent_as(other) {
        let (start, end) = (position.offset(), position.offset() + how_many);
        let (other_start, other_end) = (other.offset(), other.offset() + other_how_many);
        let overlap_start = start.max(other_start);
        let overlap_end = end.min(other_end);

        let nodes = if overlap_start < overlap_end {
            absorb(nodes, |holder| {
                tree::remove_nodes(holder, &[overlap_start - start], overlap_end - overlap_start).map(|_| ())
            })
        } else {
            nodes.to_vec()
        };

        if nodes.is_empty() {
            return OperationKind::NoOp;
        }
        return OperationKind::Remove {
            position: position.with_offset(map_offset(start, other_start, other_end)),
            nodes,
        };
    }

    if position.is_inside_span(other, other_how_many) {
        return OperationKind::NoOp;
    }

    if other.is_inside_span(position, how_many) {
        let relative = other.relative_to_span(position);
        return OperationKind::Remove {
            position: position.clone(),
            nodes: absorb(nodes, |holder| {
                tree::remove_nodes(holder, &relative.path, other_how_many).map(|_| ())
            }),
        };
    }

    OperationKind::Remove {
        position: position
            .transformed_by_deletion(other, other_how_many)
            .unwrap_or_else(|| position.clone()),
        nodes: nodes.to_vec(),
    }
}

fn absorb_attribute(position: &Position, nodes: &[Node], key: &str, parts: &[AttributePart]) -> Vec<Node> {
    let how_many = offset_size_of(nodes);
    let start = position.offset();
    let end = start + how_many;
    let mut nodes = nodes.to_vec();

    for part in parts {
        let range = &part.range;
        if range.start.has_same_parent_as(position) {
            let overlap_start = range.start.offset().max(start);
            let overlap_end = range.end.offset().min(end);
            if overlap_start < overlap_end {
                nodes = absorb(&nodes, |holder| {
                    tree::set_attribute_range(
                        holder,
                        &[],
                        overlap_start - start,
                        overlap_end - start,
                        key,
                        part.new_value.as_ref(),
                    )
                });
            }
        } else if range.start.is_inside_span(position, how_many) {
            let relative = range.start.relative_to_span(position);
            nodes = absorb(&nodes, |holder| {
                tree::set_attribute_range(
                    holder,
                    relative.parent_path(),
                    relative.offset(),
                    relative.offset() + range.flat_len(),
                    key,
                    part.new_value.as_ref(),
                )
            });
        }
    }

    nodes
}

fn part_with(part: &AttributePart, range: Range) -> AttributePart {
    AttributePart {
        range,
        old_value: part.old_value.clone(),
        new_value: part.new_value.clone(),
    }
}

fn flat(at: &Position, start: usize, end: usize) -> Range {
    Range::new(at.with_offset(start), at.with_offset(end))
}

fn attribute_result(key: &str, parts: Vec<AttributePart>) -> OperationKind {
    if parts.is_empty() {
        OperationKind::NoOp
    } else {
        OperationKind::Attribute {
            key: key.to_string(),
            parts,
        }
    }
}

fn attribute_by_insert(key: &str, parts: &[AttributePart], at: &Position, how_many: usize) -> OperationKind {
    let mut result = Vec::with_capacity(parts.len());

    for part in parts {
        let range = &part.range;
        let splits = at.has_same_parent_as(&range.start)
            && at.offset() > range.start.offset()
            && at.offset() < range.end.offset();

        if splits {
            result.push(part_with(part, flat(&range.start, range.start.offset(), at.offset())));
            result.push(part_with(
                part,
                flat(&range.start, at.offset() + how_many, range.end.offset() + how_many),
            ));
        } else {
            result.push(part_with(
                part,
                Range::new(
                    range.start.transformed_by_insertion(at, how_many, true),
                    range.end.transformed_by_insertion(at, how_many, false),
                ),
            ));
        }
    }

    attribute_result(key, result)
}

fn attribute_by_remove(key: &str, parts: &[AttributePart], at: &Position, how_many: usize) -> OperationKind {
    let mut result = Vec::with_capacity(parts.len());
    let (removed_start, removed_end) = (at.offset(), at.offset() + how_many);

    for part in parts {
        let range = &part.range;
        if range.start.has_same_parent_as(at) {
            let start = map_offset(range.start.offset(), removed_start, removed_end);
            let end = map_offset(range.end.offset(), removed_start, removed_end);
            if start < end {
                result.push(part_with(part, flat(&range.start, start, end)));
            }
        } else if !range.start.is_inside_span(at, how_many) {
            let start = range
                .start
                .transformed_by_deletion(at, how_many)
                .unwrap_or_else(|| range.start.clone());
            let end = range
                .end
                .transformed_by_deletion(at, how_many)
                .unwrap_or_else(|| range.end.clone());
            result.push(part_with(part, Range::new(start, end)));
        }
    }

    attribute_result(key, result)
}

fn attribute_by_attribute(key: &str, parts: &[AttributePart], other_parts: &[AttributePart]) -> OperationKind {
    let mut current = parts.to_vec();

    for other in other_parts {
        let mut next = Vec::with_capacity(current.len());
        for part in current {
            let range = &part.range;
            if !range.start.has_same_parent_as(&other.range.start) {
                next.push(part);
                continue;
            }

            let (start, end) = (range.start.offset(), range.end.offset());
            let overlap_start = start.max(other.range.start.offset());
            let overlap_end = end.min(other.range.end.offset());
            if overlap_start >= overlap_end {
                next.push(part);
                continue;
            }

            if start < overlap_start {
                next.push(part_with(&part, flat(&range.start, start, overlap_start)));
            }
            let wins = compare_serialized::<Value>(part.new_value.as_ref(), other.new_value.as_ref())
                == Ordering::Greater;
            if wins {
                next.push(AttributePart {
                    range: flat(&range.start, overlap_start, overlap_end),
                    old_value: other.new_value.clone(),
                    new_value: part.new_value.clone(),
                });
            }
            if overlap_end < end {
                next.push(part_with(&part, flat(&range.start, overlap_end, end)));
            }
        }
        current = next;
    }

    attribute_result(key, current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(path: &[usize]) -> Position {
        Position::new("main", path.to_vec())
    }

    #[test]
    fn test_insert_inside_removed_content_is_absorbed() {
        let insert = Operation::insert(0, pos(&[0, 2]), vec![Node::text("X")]);
        let remove = Operation::remove(0, pos(&[0, 1]), vec![Node::text("bcd")]);

        assert!(insert.transformed_by(&remove).is_no_op());

        let remove = remove.transformed_by(&insert);
        assert_eq!(remove.base_version, 1);
        assert_eq!(
            remove.kind,
            OperationKind::Remove {
                position: pos(&[0, 1]),
                nodes: vec![Node::text("bXcd")],
            }
        );
    }

    #[test]
    fn test_overlapping_removals_remove_once() {
        let a = Operation::remove(0, pos(&[0, 1]), vec![Node::text("bcd")]);
        let b = Operation::remove(0, pos(&[0, 3]), vec![Node::text("de")]);

        assert_eq!(
            a.transformed_by(&b).kind,
            OperationKind::Remove {
                position: pos(&[0, 1]),
                nodes: vec![Node::text("bc")],
            }
        );
        assert_eq!(
            b.transformed_by(&a).kind,
            OperationKind::Remove {
                position: pos(&[0, 1]),
                nodes: vec![Node::text("e")],
            }
        );
    }

    #[test]
    fn test_attribute_split_by_insertion() {
        let attribute = Operation::new(
            0,
            OperationKind::Attribute {
                key: "bold".to_string(),
                parts: vec![AttributePart {
                    range: Range::new(pos(&[0, 0]), pos(&[0, 4])),
                    old_value: None,
                    new_value: Some(Value::Bool(true)),
                }],
            },
        );
        let insert = Operation::insert(0, pos(&[0, 2]), vec![Node::text("X")]);

        let OperationKind::Attribute { parts, .. } = attribute.transformed_by(&insert).kind else {
            panic!("expected an attribute operation");
        };
        let ranges: Vec<Range> = parts.into_iter().map(|part| part.range).collect();
        assert_eq!(
            ranges,
            vec![Range::new(pos(&[0, 0]), pos(&[0, 2])), Range::new(pos(&[0, 3]), pos(&[0, 5]))]
        );
    }

    #[test]
    fn test_rename_conflict_greater_name_wins() {
        let rename = |name: &str| {
            Operation::new(
                0,
                OperationKind::Rename {
                    position: pos(&[1]),
                    old_name: "paragraph".to_string(),
                    new_name: name.to_string(),
                },
            )
        };
        let a = rename("heading1");
        let b = rename("heading2");

        assert!(a.transformed_by(&b).is_no_op());
        assert_eq!(
            b.transformed_by(&a).kind,
            OperationKind::Rename {
                position: pos(&[1]),
                old_name: "heading1".to_string(),
                new_name: "heading2".to_string(),
            }
        );
    }

    #[test]
    fn test_range_collapses_on_removal() {
        let range = Range::new(pos(&[0, 2]), pos(&[2, 1]));
        let remove = OperationKind::Remove {
            position: pos(&[1]),
            nodes: vec![Node::element("paragraph"), Node::element("paragraph")],
        };

        assert_eq!(transform_range(&range, &remove), Range::new(pos(&[0, 2]), pos(&[1])));
    }

    #[test]
    fn test_range_boundaries_exclude_inserted_content() {
        let range = Range::new(pos(&[0, 1]), pos(&[0, 3]));
        let at_start = OperationKind::Insert {
            position: pos(&[0, 1]),
            nodes: vec![Node::text("xx")],
        };
        let at_end = OperationKind::Insert {
            position: pos(&[0, 3]),
            nodes: vec![Node::text("xx")],
        };

        assert_eq!(transform_range(&range, &at_start), Range::new(pos(&[0, 3]), pos(&[0, 5])));
        assert_eq!(transform_range(&range, &at_end), range);
    }
}
