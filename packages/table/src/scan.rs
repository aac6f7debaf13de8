//! Reading the structure of a view `<table>`.
//!
//! Browsers render a table header first no matter where its `<thead>` sits
//! in the source, so rows are handed out heading rows first. Only the first
//! `<thead>` holds heading rows; `<tbody>` rows made only of `<th>` cells
//! count as heading rows too. Heading columns come from the cell matrix of
//! the body rows.

use quire_view::{ViewElement, ViewNode};

const SECTIONS: &[&str] = &["thead", "tbody", "tfoot"];

/// One matrix row: the cell covering each column, `None` where the row ran
/// out of cells
pub type MatrixRow<'v> = Vec<Option<&'v ViewElement>>;

#[derive(Debug)]
pub struct TableScan<'v> {
    /// `<tr>` nodes in model order
    pub rows: Vec<&'v ViewNode>,
    pub heading_rows: usize,
    pub heading_columns: usize,
}

pub fn scan_table(table: &ViewElement) -> TableScan<'_> {
    let mut head_rows = Vec::new();
    let mut body_rows = Vec::new();
    let mut source_order: Vec<(&ViewElement, bool)> = Vec::new();
    let mut first_thead = None;

    for section in table.child_elements() {
        if !SECTIONS.contains(&section.name.as_str()) {
            continue;
        }
        if section.name == "thead" && first_thead.is_none() {
            first_thead = Some(section.id);
        }
        let in_head = first_thead == Some(section.id);

        for node in &section.children {
            let Some(row) = node.as_element().filter(|element| element.name == "tr") else {
                continue;
            };
            let heading = in_head || (section.name == "tbody" && is_heading_row(row));
            if heading {
                head_rows.push(node);
            } else {
                body_rows.push(node);
            }
            source_order.push((row, heading));
        }
    }

    let rows: Vec<&ViewElement> = source_order.iter().map(|(row, _)| *row).collect();
    let matrix = cell_matrix(&rows);
    let heading_columns = matrix
        .iter()
        .zip(&source_order)
        .filter(|(_, (_, heading))| !heading)
        .map(|(slots, _)| leading_heading_cells(slots))
        .min()
        .unwrap_or(0);

    let heading_rows = head_rows.len();
    head_rows.extend(body_rows);
    TableScan {
        rows: head_rows,
        heading_rows,
        heading_columns,
    }
}

/// Rectangular matrix of the cells covering each column of each row.
///
/// A cell with `rowspan` covers its columns in the following rows too, and
/// `colspan` makes it cover that many columns. A row that runs out of cells
/// before the widest row so far gets `None` slots; every row is padded to the
/// widest row at the end.
pub fn cell_matrix<'v>(rows: &[&'v ViewElement]) -> Vec<MatrixRow<'v>> {
    let mut matrix = Vec::with_capacity(rows.len());
    // Per column: the cell spanning down into it and the rows it still covers
    let mut carried: Vec<Option<(&'v ViewElement, usize)>> = Vec::new();
    let mut width = 0;

    for row in rows {
        let mut cells = row.child_elements().filter(|element| is_cell(element));
        let mut slots: MatrixRow<'v> = Vec::new();
        let mut column = 0;

        loop {
            if let Some((cell, remaining)) = carried.get(column).copied().flatten() {
                slots.push(Some(cell));
                carried[column] = (remaining > 1).then_some((cell, remaining - 1));
                column += 1;
                continue;
            }

            if let Some(cell) = cells.next() {
                let rowspan = span(cell, "rowspan");
                for _ in 0..span(cell, "colspan") {
                    slots.push(Some(cell));
                    if rowspan > 1 {
                        if carried.len() <= column {
                            carried.resize(column + 1, None);
                        }
                        carried[column] = Some((cell, rowspan - 1));
                    }
                    column += 1;
                }
                continue;
            }

            let spans_ahead = carried.iter().skip(column).any(Option::is_some);
            if column < width || spans_ahead {
                slots.push(None);
                column += 1;
                continue;
            }
            break;
        }

        width = width.max(slots.len());
        matrix.push(slots);
    }

    for slots in &mut matrix {
        slots.resize(width, None);
    }
    matrix
}

fn is_cell(element: &ViewElement) -> bool {
    element.name == "td" || element.name == "th"
}

fn is_heading_row(row: &ViewElement) -> bool {
    let mut cells = row.children.iter().filter(|node| !is_blank(node)).peekable();
    cells.peek().is_some() && cells.all(|node| node.is_element("th"))
}

fn is_blank(node: &ViewNode) -> bool {
    node.as_text().is_some_and(|text| text.data.trim().is_empty())
}

fn leading_heading_cells(slots: &[Option<&ViewElement>]) -> usize {
    slots
        .iter()
        .take_while(|slot| slot.is_some_and(|cell| cell.name == "th"))
        .count()
}

/// Largest `colspan` browsers honour
pub const MAX_COLSPAN: usize = 1000;
/// Largest `rowspan` browsers honour
pub const MAX_ROWSPAN: usize = 65534;

/// `colspan`/`rowspan` of a cell, 1 when missing or invalid and capped at
/// the browser limits
pub(crate) fn span(cell: &ViewElement, key: &str) -> usize {
    let limit = if key == "rowspan" { MAX_ROWSPAN } else { MAX_COLSPAN };
    cell.attribute(key)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|&span| span > 0)
        .map_or(1, |span| span.min(limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_view::notation::parse;

    fn table(markup: &str) -> ViewElement {
        let fragment = parse(markup).unwrap();
        fragment.children()[0].as_element().cloned().unwrap()
    }

    fn contents(matrix: &[MatrixRow<'_>]) -> Vec<Vec<Option<String>>> {
        matrix
            .iter()
            .map(|slots| slots.iter().map(|slot| slot.map(ViewElement::text_content)).collect())
            .collect()
    }

    fn rows(table: &ViewElement) -> Vec<&ViewElement> {
        table
            .child_elements()
            .flat_map(|section| section.child_elements())
            .filter(|element| element.name == "tr")
            .collect()
    }

    fn some(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    #[test]
    fn test_rowspan_in_the_middle() {
        let table = table(
            r#"<table><tbody><tr><td>a</td><td rowspan="2">b</td><td>c</td></tr><tr><td>d</td></tr></tbody></table>"#,
        );
        let matrix = cell_matrix(&rows(&table));

        assert_eq!(
            contents(&matrix),
            vec![vec![some("a"), some("b"), some("c")], vec![some("d"), some("b"), None]]
        );
    }

    #[test]
    fn test_rowspan_at_the_end() {
        let table = table(
            r#"<table><tbody><tr><td>a</td><td>b</td><td rowspan="2">c</td></tr><tr><td>d</td></tr></tbody></table>"#,
        );
        let matrix = cell_matrix(&rows(&table));

        assert_eq!(
            contents(&matrix),
            vec![vec![some("a"), some("b"), some("c")], vec![some("d"), None, some("c")]]
        );
    }

    #[test]
    fn test_colspan_and_padding() {
        let table = table(
            r#"<table><tbody><tr><td colspan="2">a</td></tr><tr><td>b</td><td>c</td><td>d</td></tr></tbody></table>"#,
        );
        let matrix = cell_matrix(&rows(&table));

        assert_eq!(
            contents(&matrix),
            vec![vec![some("a"), some("a"), None], vec![some("b"), some("c"), some("d")]]
        );
    }

    #[test]
    fn test_invalid_spans_count_as_one() {
        let table = table(r#"<table><tbody><tr><td colspan="0">a</td><td rowspan="x">b</td></tr></tbody></table>"#);
        let matrix = cell_matrix(&rows(&table));

        assert_eq!(contents(&matrix), vec![vec![some("a"), some("b")]]);
    }

    #[test]
    fn test_oversized_spans_are_capped() {
        let table = table(
            r#"<table><tbody><tr><td colspan="4000000000">a</td><td rowspan="99999999999">b</td></tr></tbody></table>"#,
        );
        let cells: Vec<&ViewElement> = rows(&table).into_iter().flat_map(|row| row.child_elements()).collect();

        assert_eq!(span(cells[0], "colspan"), MAX_COLSPAN);
        assert_eq!(span(cells[1], "rowspan"), MAX_ROWSPAN);
        assert_eq!(cell_matrix(&rows(&table))[0].len(), MAX_COLSPAN + 1);
    }

    #[test]
    fn test_heading_rows_come_first() {
        let table = table(
            "<table><tbody><tr><td>body</td></tr></tbody><thead><tr><th>head</th></tr></thead></table>",
        );
        let scan = scan_table(&table);
        let order: Vec<String> = scan
            .rows
            .iter()
            .filter_map(|row| row.as_element().map(ViewElement::text_content))
            .collect();

        assert_eq!(scan.heading_rows, 1);
        assert_eq!(order, vec!["head", "body"]);
    }

    #[test]
    fn test_only_first_thead_holds_heading_rows() {
        let table = table(
            "<table><thead><tr><th>a</th></tr></thead><thead><tr><td>b</td></tr></thead><tbody><tr><td>c</td></tr></tbody></table>",
        );

        assert_eq!(scan_table(&table).heading_rows, 1);
    }

    #[test]
    fn test_body_rows_of_th_are_heading_rows() {
        let table = table("<table><tbody><tr><th>a</th><th>b</th></tr><tr><td>c</td><td>d</td></tr></tbody></table>");

        let scan = scan_table(&table);
        assert_eq!(scan.heading_rows, 1);
        assert_eq!(scan.heading_columns, 0);
    }

    #[test]
    fn test_heading_columns_take_the_minimum() {
        let table = table(
            "<table><tbody>\
             <tr><th>a</th><th>b</th><td>c</td></tr>\
             <tr><th>d</th><td>e</td><td>f</td></tr>\
             </tbody></table>",
        );

        assert_eq!(scan_table(&table).heading_columns, 1);
    }

    #[test]
    fn test_heading_column_spanned_down() {
        let table = table(
            r#"<table><tbody><tr><th rowspan="2">a</th><td>b</td></tr><tr><td>c</td></tr></tbody></table>"#,
        );

        assert_eq!(scan_table(&table).heading_columns, 1);
    }

    #[test]
    fn test_stray_nodes_between_rows_are_ignored() {
        let table = table("<table>x<tbody>y<tr><td>a</td></tr><p>z</p></tbody><caption>c</caption></table>");

        assert_eq!(scan_table(&table).rows.len(), 1);
    }
}
