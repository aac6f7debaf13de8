//! # Quire Table
//!
//! Tables for the Quire engine.
//!
//! ```text
//! table (headingRows, headingColumns)
//! └── tableRow
//!     └── tableCell (colspan, rowspan)
//!         └── paragraph, lists, nested tables...
//! ```
//!
//! Reading HTML tolerates what browsers tolerate: sections in any order,
//! several `<thead>` elements, ragged rows, stray text between rows.

pub mod downcast;
pub mod scan;
pub mod upcast;

use quire_engine::upcast::helpers::element_to_element;
use quire_engine::{DataController, TableConfig};
use quire_model::{Schema, SchemaItem};
use tracing::debug;

pub use scan::{cell_matrix, scan_table, MatrixRow, TableScan};

pub fn register_schema(schema: &mut Schema) {
    schema.register(
        "table",
        SchemaItem::default()
            .allow_where("$block")
            .allow_attributes(["headingRows", "headingColumns"])
            .object(),
    );
    schema.register("tableRow", SchemaItem::default().allow_in("table").limit());
    schema.register(
        "tableCell",
        SchemaItem::default()
            .allow_in("tableRow")
            .allow_content_of("$root")
            .allow_attributes(["colspan", "rowspan"])
            .limit(),
    );
}

/// Schema and converters for tables, in both directions
pub fn register_table(controller: &mut DataController, config: &TableConfig) {
    debug!(skip_empty_leading_rows = config.skip_empty_leading_rows, "registering tables");
    register_schema(&mut controller.schema);

    let up = &mut controller.upcast;
    upcast::upcast_figure(up);
    upcast::upcast_table(up);
    element_to_element(up, "tr", "tableRow");
    element_to_element(up, "td", "tableCell");
    element_to_element(up, "th", "tableCell");
    if config.skip_empty_leading_rows {
        upcast::skip_empty_table_row(up);
    }
    upcast::upcast_cell_span(up);
    upcast::ensure_paragraph_in_table_cell(up);

    downcast::downcast_table(&mut controller.downcast);
}
