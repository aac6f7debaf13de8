//! Model → view table converters.
//!
//! A table renders as `<figure class="table"><table>`, heading rows inside
//! `<thead>` and the others inside `<tbody>`. Cells in heading rows or
//! heading columns become `<th>`. A cell holding a single plain paragraph
//! renders its text straight into the cell.

use quire_engine::downcast::helpers::attribute_to_attribute;
use quire_engine::{ConversionResult, DowncastConversionApi, DowncastData, DowncastDispatcher, DowncastItem, EventInfo, Priority};
use quire_model::Element;
use quire_view::{ViewElement, ViewError, ViewNode, ViewNodeId, ViewPosition};
use serde_json::Value;

pub fn downcast_table(dispatcher: &mut DowncastDispatcher) {
    dispatcher.on("insert:table", Priority::Normal, insert_table);
    dispatcher.on("insert:tableRow", Priority::Normal, insert_row);
    dispatcher.on("insert:tableCell", Priority::Normal, insert_cell);
    dispatcher.on("insert:paragraph", Priority::High, insert_cell_paragraph);
    // Rendered through the row sections and cell names
    for key in ["headingRows", "headingColumns"] {
        dispatcher.on(format!("attribute:{key}:table"), Priority::Normal, |info, data, api| {
            api.consume(info, data);
            Ok(())
        });
    }
    attribute_to_attribute(dispatcher, "colspan", "colspan");
    attribute_to_attribute(dispatcher, "rowspan", "rowspan");
}

fn heading_count(table: &Element, key: &str) -> usize {
    table
        .attributes
        .get(key)
        .and_then(Value::as_u64)
        .map_or(0, |count| count as usize)
}

fn insert_table(info: &mut EventInfo, data: &DowncastData, api: &mut DowncastConversionApi<'_>) -> ConversionResult<()> {
    let Some(DowncastItem::Element { id, .. }) = &data.item else {
        return Ok(());
    };
    if !api.consume(info, data) {
        return Ok(());
    }

    let position = api.view_position(&data.range.start)?;
    let table = ViewElement::container("table");
    let table_id = table.id;
    let figure = ViewElement::container("figure").with_class("table").with_child(table);
    api.writer.insert(&position, figure)?;
    api.mapper.bind_elements(*id, table_id);
    Ok(())
}

fn insert_row(info: &mut EventInfo, data: &DowncastData, api: &mut DowncastConversionApi<'_>) -> ConversionResult<()> {
    let Some(DowncastItem::Element { id, .. }) = &data.item else {
        return Ok(());
    };
    let model_table = data.range.start.parent(api.model_root)?;
    let heading_rows = heading_count(model_table, "headingRows");
    let Some(view_table) = api.mapper.to_view_element(model_table.id) else {
        return Ok(());
    };
    if !api.consume(info, data) {
        return Ok(());
    }

    let index = data.range.start.offset();
    let (section, offset) = if index < heading_rows {
        ("thead", index)
    } else {
        ("tbody", index - heading_rows)
    };
    let section_path = section_path(api, view_table, section)?;
    let row = ViewElement::container("tr");
    let row_id = row.id;
    api.writer.insert(&ViewPosition::at(&section_path, offset), row)?;
    api.mapper.bind_elements(*id, row_id);
    Ok(())
}

/// Path of a `<thead>` or `<tbody>` in a view table, added when missing
fn section_path(api: &mut DowncastConversionApi<'_>, table: ViewNodeId, section: &str) -> ConversionResult<Vec<usize>> {
    let root = &api.writer.fragment().root;
    let table_path = root.path_to(table).ok_or(ViewError::NodeNotFound(table))?;
    let view_table = root
        .node_at(&table_path)
        .and_then(ViewNode::as_element)
        .ok_or_else(|| ViewError::InvalidPosition(table_path.clone()))?;

    let existing = view_table.children.iter().position(|child| child.is_element(section));
    let index = match existing {
        Some(index) => index,
        None => {
            let index = if section == "thead" { 0 } else { view_table.child_count() };
            api.writer
                .insert(&ViewPosition::at(&table_path, index), ViewElement::container(section))?;
            index
        }
    };

    let mut path = table_path;
    path.push(index);
    Ok(path)
}

fn insert_cell(info: &mut EventInfo, data: &DowncastData, api: &mut DowncastConversionApi<'_>) -> ConversionResult<()> {
    let Some(DowncastItem::Element { id, .. }) = &data.item else {
        return Ok(());
    };
    let Some(row_position) = data.range.start.parent_position() else {
        return Ok(());
    };
    let model_table = row_position.parent(api.model_root)?;
    let heading = row_position.offset() < heading_count(model_table, "headingRows")
        || data.range.start.offset() < heading_count(model_table, "headingColumns");
    if !api.consume(info, data) {
        return Ok(());
    }

    let position = api.view_position(&data.range.start)?;
    let cell = ViewElement::container(if heading { "th" } else { "td" });
    let cell_id = cell.id;
    api.writer.insert(&position, cell)?;
    api.mapper.bind_elements(*id, cell_id);
    Ok(())
}

/// A lone paragraph without attributes takes over its cell's view element
fn insert_cell_paragraph(
    info: &mut EventInfo,
    data: &DowncastData,
    api: &mut DowncastConversionApi<'_>,
) -> ConversionResult<()> {
    let Some(DowncastItem::Element { id, attributes, .. }) = &data.item else {
        return Ok(());
    };
    let cell = data.range.start.parent(api.model_root)?;
    if cell.name != "tableCell" || cell.children.len() != 1 || !attributes.is_empty() {
        return Ok(());
    }
    let Some(view_cell) = api.mapper.to_view_element(cell.id) else {
        return Ok(());
    };
    if !api.consume(info, data) {
        return Ok(());
    }
    api.mapper.bind_elements(*id, view_cell);
    Ok(())
}
