//! View → model table converters

use crate::scan::{scan_table, span};
use quire_engine::{ConversionResult, EventInfo, Match, Priority, UpcastConversionApi, UpcastData, UpcastDispatcher};
use quire_model::{Attributes, Element, ElementId, ModelError, Node, Position, Range};
use serde_json::Value;
use tracing::{debug, trace};

const CELLS: &[&str] = &["td", "th"];

/// `<figure class="table">` wrapping a `<table>`. The figure is left to other
/// converters when its table converts to nothing. When the table could not be
/// inserted but its content was, the figure stands for that content.
pub fn upcast_figure(dispatcher: &mut UpcastDispatcher) {
    dispatcher.on("element:figure", Priority::Normal, convert_figure);
}

/// `<table>` with its rows reordered heading rows first
pub fn upcast_table(dispatcher: &mut UpcastDispatcher) {
    dispatcher.on("element:table", Priority::Normal, convert_table);
}

/// Drop empty `<tr>` elements that would become the first row of a table
pub fn skip_empty_table_row(dispatcher: &mut UpcastDispatcher) {
    dispatcher.on("element:tr", Priority::High, skip_empty_row);
}

/// Give every converted cell a paragraph when it has no block content
pub fn ensure_paragraph_in_table_cell(dispatcher: &mut UpcastDispatcher) {
    for cell in CELLS {
        dispatcher.on(format!("element:{cell}"), Priority::Low, ensure_paragraph);
    }
}

/// `colspan` and `rowspan` above 1 become numeric cell attributes
pub fn upcast_cell_span(dispatcher: &mut UpcastDispatcher) {
    for cell in CELLS {
        dispatcher.on(format!("element:{cell}"), Priority::Low, convert_cell_span);
    }
}

fn end_of(api: &UpcastConversionApi<'_>, id: ElementId) -> ConversionResult<Position> {
    Ok(api
        .writer()
        .fragment()
        .position_at_end_of(id)
        .ok_or(ModelError::ElementNotFound(id))?)
}

/// Model element right after `position`, if it is named `name`
fn element_after(api: &UpcastConversionApi<'_>, position: &Position, name: &str) -> Option<ElementId> {
    match position.node_after(&api.writer().fragment().root) {
        Some(Node::Element(element)) if element.name == name => Some(element.id),
        _ => None,
    }
}

fn convert_figure(_info: &mut EventInfo, data: &mut UpcastData<'_>, api: &mut UpcastConversionApi<'_>) -> ConversionResult<()> {
    let item = data.view_item;
    let Some(figure) = item.as_element() else {
        return Ok(());
    };
    let descriptor = Match::name().with_class("table");
    if api.consumable.test(item, &descriptor) != Some(true) {
        return Ok(());
    }
    let Some(view_table) = figure.children.iter().find(|child| child.is_element("table")) else {
        return Ok(());
    };
    if api.consumable.test(view_table, &Match::name()) != Some(true) {
        return Ok(());
    }
    let Some(claim) = api.consumable.consume(item, &descriptor) else {
        return Ok(());
    };

    let result = api.convert_item(view_table, &data.model_cursor)?;
    let Some(converted) = result.model_range else {
        debug!("figure without a convertible table");
        api.consumable.revert(claim);
        return Ok(());
    };

    match element_after(api, &converted.start, "table") {
        Some(table) => {
            let end = end_of(api, table)?;
            api.convert_children(figure, &end)?;
            api.update_conversion_result(claim, table, data)
        }
        None if converted.is_collapsed() => {
            debug!("figure table converted to nothing");
            api.consumable.revert(claim);
            Ok(())
        }
        None => {
            debug!("figure table unwrapped in place");
            let rest = api.convert_children(figure, &result.model_cursor)?;
            let end = rest.model_range.map_or(converted.end.clone(), |range| range.end);
            data.model_range = Some(Range::new(converted.start, end));
            data.model_cursor = rest.model_cursor;
            api.keep_claim(claim);
            Ok(())
        }
    }
}

fn convert_table(_info: &mut EventInfo, data: &mut UpcastData<'_>, api: &mut UpcastConversionApi<'_>) -> ConversionResult<()> {
    let item = data.view_item;
    let Some(view_table) = item.as_element() else {
        return Ok(());
    };
    if api.consumable.test(item, &Match::name()) != Some(true) {
        return Ok(());
    }

    let scan = scan_table(view_table);
    let mut attributes = Attributes::new();
    if scan.heading_rows > 0 {
        attributes.insert("headingRows".to_string(), Value::from(scan.heading_rows));
    }
    if scan.heading_columns > 0 {
        attributes.insert("headingColumns".to_string(), Value::from(scan.heading_columns));
    }
    let table = api.writer().create_element("table", attributes);
    let id = table.id;

    let Some(claim) = api.consumable.consume(item, &Match::name()) else {
        return Ok(());
    };
    if api.safe_insert(&claim, table, &data.model_cursor)?.is_none() {
        api.consumable.revert(claim);
        return Ok(());
    }
    debug!(
        rows = scan.rows.len(),
        heading_rows = scan.heading_rows,
        heading_columns = scan.heading_columns,
        "converting table"
    );

    for row in &scan.rows {
        let end = end_of(api, id)?;
        api.convert_item(row, &end)?;
    }
    // Whatever is left, such as a caption
    let end = end_of(api, id)?;
    api.convert_children(view_table, &end)?;

    if api.writer().fragment().element(id).is_some_and(Element::is_empty) {
        trace!(table = %id, "empty table gets one cell");
        let row = api.writer().create_element("tableRow", Attributes::new());
        let row_id = row.id;
        api.append(&claim, row, id)?;
        let cell = api.writer().create_element("tableCell", Attributes::new());
        let cell_id = cell.id;
        api.append(&claim, cell, row_id)?;
        let paragraph = api.writer().create_element("paragraph", Attributes::new());
        api.append(&claim, paragraph, cell_id)?;
    }

    api.update_conversion_result(claim, id, data)
}

fn skip_empty_row(info: &mut EventInfo, data: &mut UpcastData<'_>, api: &mut UpcastConversionApi<'_>) -> ConversionResult<()> {
    let item = data.view_item;
    let Some(row) = item.as_element() else {
        return Ok(());
    };
    if !row.is_empty() || data.model_cursor.offset() != 0 {
        return Ok(());
    }
    if api.consumable.consume(item, &Match::name()).is_some() {
        trace!("leading empty row skipped");
        info.stop();
    }
    Ok(())
}

fn ensure_paragraph(_info: &mut EventInfo, data: &mut UpcastData<'_>, api: &mut UpcastConversionApi<'_>) -> ConversionResult<()> {
    let Some(range) = &data.model_range else {
        return Ok(());
    };
    let Some(cell) = element_after(api, &range.start, "tableCell") else {
        return Ok(());
    };
    let fragment = api.writer().fragment();
    let only_markers = fragment.element(cell).is_some_and(|element| {
        element
            .children
            .iter()
            .all(|child| matches!(child, Node::Element(element) if element.name == "$marker"))
    });
    if !only_markers {
        return Ok(());
    }

    let content = fragment.range_in(cell).ok_or(ModelError::ElementNotFound(cell))?;
    let Some(claim) = api.take_claim(data.view_item) else {
        return Ok(());
    };
    let paragraph = api.writer().create_element("paragraph", Attributes::new());
    if content.is_collapsed() {
        api.insert(&claim, paragraph, &content.start)?;
    } else {
        api.wrap(&claim, &content, paragraph)?;
    }
    api.keep_claim(claim);
    Ok(())
}

fn convert_cell_span(_info: &mut EventInfo, data: &mut UpcastData<'_>, api: &mut UpcastConversionApi<'_>) -> ConversionResult<()> {
    let Some(range) = &data.model_range else {
        return Ok(());
    };
    let Some(cell) = element_after(api, &range.start, "tableCell") else {
        return Ok(());
    };
    let item = data.view_item;
    let Some(view_cell) = item.as_element() else {
        return Ok(());
    };

    for key in ["colspan", "rowspan"] {
        if view_cell.attribute(key).is_none() {
            continue;
        }
        let Some(claim) = api.consumable.consume(item, &Match::new().with_attribute(key)) else {
            continue;
        };
        let value = span(view_cell, key);
        if value > 1 {
            api.set_element_attribute(&claim, cell, key, Value::from(value))?;
        }
    }
    Ok(())
}
