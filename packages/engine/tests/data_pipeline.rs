//! Reading and writing document data through the data controller

use quire_engine::downcast::helpers as down;
use quire_engine::upcast::helpers as up;
use quire_engine::{
    register_basics, ConversionOptions, DataConfig, DataController, DowncastItem, EngineError, Priority, TrimMode,
};
use quire_model::{Document, Position, Range, MAIN_ROOT};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

fn controller() -> DataController {
    let mut controller = DataController::default();
    register_basics(&mut controller);
    up::element_to_marker(&mut controller.upcast, "comment", "comment");
    down::marker_to_element(&mut controller.downcast, "comment", "comment");
    controller
}

fn pos(path: &[usize]) -> Position {
    Position::new(MAIN_ROOT, path.to_vec())
}

#[test]
fn test_set_and_get_round_trip() {
    let controller = controller();
    let options = ConversionOptions::new();
    let mut document = Document::new();

    let batch = controller
        .set(&mut document, MAIN_ROOT, "<h2>Title</h2><p>foo<strong>bar</strong></p>", &options)
        .unwrap();

    assert_eq!(batch.description.as_deref(), Some("set data"));
    assert!(!batch.is_empty());
    assert_eq!(
        controller.get(&document, MAIN_ROOT, &options).unwrap(),
        "<h2>Title</h2><p>foo<strong>bar</strong></p>"
    );
}

#[test]
fn test_set_replaces_previous_content() {
    let controller = controller();
    let options = ConversionOptions::new();
    let mut document = Document::new();

    controller.set(&mut document, MAIN_ROOT, "<p>first</p><p>second</p>", &options).unwrap();
    controller.set(&mut document, MAIN_ROOT, "<p>third</p>", &options).unwrap();

    assert_eq!(controller.get(&document, MAIN_ROOT, &options).unwrap(), "<p>third</p>");
}

#[test]
fn test_markers_travel_through_data() {
    let controller = controller();
    let options = ConversionOptions::new();
    let mut document = Document::new();
    let data = r#"<p>a<comment name="1"></comment>bc<comment name="1"></comment>d</p>"#;

    controller.set(&mut document, MAIN_ROOT, data, &options).unwrap();

    let marker = document.markers().get("comment:1").unwrap();
    assert_eq!(marker.range, Range::new(pos(&[0, 1]), pos(&[0, 3])));
    assert!(marker.affects_data);
    assert_eq!(controller.get(&document, MAIN_ROOT, &options).unwrap(), data);
}

#[test]
fn test_set_drops_markers_of_replaced_content() {
    let controller = controller();
    let options = ConversionOptions::new();
    let mut document = Document::new();

    controller
        .set(&mut document, MAIN_ROOT, r#"<p>a<comment name="1"></comment>b</p>"#, &options)
        .unwrap();
    assert!(document.markers().get("comment:1").is_some());

    controller.set(&mut document, MAIN_ROOT, "<p>ab</p>", &options).unwrap();
    assert!(document.markers().get("comment:1").is_none());
}

#[test]
fn test_collapsed_marker_fires_once() {
    let mut controller = controller();
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    controller.downcast.on("addMarker:search", Priority::Normal, move |_info, _data, _api| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    let options = ConversionOptions::new();
    let mut document = Document::new();
    controller.set(&mut document, MAIN_ROOT, "<p>abcd</p>", &options).unwrap();
    document
        .change(|writer| writer.add_marker("search:1", Range::collapsed(pos(&[0, 2])), true, true))
        .unwrap();

    controller.get(&document, MAIN_ROOT, &options).unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_collapsed_marker_at_element_boundary_fires_once() {
    for path in [vec![0], vec![0, 0]] {
        let mut controller = controller();
        let named = Rc::new(Cell::new(0));
        let generic = Rc::new(Cell::new(0));
        let named_counter = named.clone();
        let generic_counter = generic.clone();
        controller.downcast.on("addMarker:search", Priority::Normal, move |_info, _data, _api| {
            named_counter.set(named_counter.get() + 1);
            Ok(())
        });
        controller.downcast.on("addMarker", Priority::Normal, move |_info, _data, _api| {
            generic_counter.set(generic_counter.get() + 1);
            Ok(())
        });

        let options = ConversionOptions::new();
        let mut document = Document::new();
        controller.set(&mut document, MAIN_ROOT, "<p>abcd</p>", &options).unwrap();
        document
            .change(|writer| writer.add_marker("search:1", Range::collapsed(pos(&path)), true, true))
            .unwrap();

        controller.get(&document, MAIN_ROOT, &options).unwrap();
        assert_eq!((named.get(), generic.get()), (1, 1), "marker at {path:?}");
    }
}

#[test]
fn test_markers_outside_data_are_not_rendered() {
    let controller = controller();
    let options = ConversionOptions::new();
    let mut document = Document::new();
    controller.set(&mut document, MAIN_ROOT, "<p>abcd</p>", &options).unwrap();
    document
        .change(|writer| writer.add_marker("comment:2", Range::new(pos(&[0, 1]), pos(&[0, 2])), true, false))
        .unwrap();

    assert_eq!(controller.get(&document, MAIN_ROOT, &options).unwrap(), "<p>abcd</p>");
}

#[test]
fn test_empty_root_trims_to_empty_string() {
    let options = ConversionOptions::new();
    let mut document = Document::new();
    let trimming = controller();
    trimming.set(&mut document, MAIN_ROOT, "<p> </p>", &options).unwrap();

    assert_eq!(trimming.get(&document, MAIN_ROOT, &options).unwrap(), "");

    let keeping = controller().with_config(DataConfig { trim: TrimMode::None });
    assert_eq!(keeping.get(&document, MAIN_ROOT, &options).unwrap(), "<p> </p>");
}

#[test]
fn test_init_refuses_filled_root() {
    let controller = controller();
    let options = ConversionOptions::new();
    let mut document = Document::new();

    controller.init(&mut document, MAIN_ROOT, "<p>foo</p>", &options).unwrap();
    let err = controller.init(&mut document, MAIN_ROOT, "<p>bar</p>", &options).unwrap_err();

    assert!(matches!(err, EngineError::RootNotEmpty(root) if root == MAIN_ROOT));
    assert_eq!(controller.get(&document, MAIN_ROOT, &options).unwrap(), "<p>foo</p>");
}

#[test]
fn test_unknown_root() {
    let controller = controller();
    let document = Document::new();

    let err = controller.get(&document, "sidebar", &ConversionOptions::new()).unwrap_err();
    assert!(matches!(err, EngineError::Model(_)));
}

#[test]
fn test_options_reach_converters() {
    let mut controller = controller();
    controller.downcast.on("insert:paragraph", Priority::High, |info, data, api| {
        if api.options.get("lead") != Some(&json!(true)) {
            return Ok(());
        }
        let Some(DowncastItem::Element { id, .. }) = &data.item else {
            return Ok(());
        };
        if !api.consume(info, data) {
            return Ok(());
        }
        let position = api.view_position(&data.range.start)?;
        let lead = api.writer.create_container_element("p", [("class", "lead")]);
        let view_id = lead.id;
        api.writer.insert(&position, lead)?;
        api.mapper.bind_elements(*id, view_id);
        Ok(())
    });

    let mut document = Document::new();
    controller
        .set(&mut document, MAIN_ROOT, "<p>foo</p>", &ConversionOptions::new())
        .unwrap();

    let plain = controller.get(&document, MAIN_ROOT, &ConversionOptions::new()).unwrap();
    let lead = controller
        .get(&document, MAIN_ROOT, &ConversionOptions::new().with("lead", json!(true)))
        .unwrap();

    assert_eq!(plain, "<p>foo</p>");
    assert_eq!(lead, r#"<p class="lead">foo</p>"#);
}
