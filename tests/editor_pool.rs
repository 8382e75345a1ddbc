use merlin_editor::pool::{
    EditableProperty, PropertyEditorPool, EDITOR_KIND_BOOLEAN, EDITOR_KIND_COLOR, EDITOR_KIND_TEXT,
};
use std::rc::Rc;

fn color_property(name: &str, value: &str) -> EditableProperty {
    EditableProperty::new(name, value, EDITOR_KIND_COLOR)
}

#[test]
fn a_cycle_grows_the_pool_and_the_next_cycle_reuses_it_in_order() {
    let mut pool = PropertyEditorPool::new();

    pool.begin_cycle();
    let first = pool.acquire(EDITOR_KIND_COLOR, color_property("Background", "#FF0000"));
    let second = pool.acquire(EDITOR_KIND_COLOR, color_property("Foreground", "#00FF00"));
    let third = pool.acquire(EDITOR_KIND_COLOR, color_property("Border", "#0000FF"));
    assert!(!Rc::ptr_eq(&first, &second));
    assert!(!Rc::ptr_eq(&second, &third));
    assert!(!Rc::ptr_eq(&first, &third));
    assert_eq!(pool.pooled(EDITOR_KIND_COLOR), 3);
    assert_eq!(pool.cursor(EDITOR_KIND_COLOR), 3);

    pool.begin_cycle();
    assert_eq!(pool.cursor(EDITOR_KIND_COLOR), 0, "cursor rewinds, instances stay");
    let reused = pool.acquire(EDITOR_KIND_COLOR, color_property("Accent", "#ABCDEF"));
    assert!(Rc::ptr_eq(&first, &reused), "rank 0 hands back the first instance");
    assert_eq!(
        reused.borrow().property().map(|property| property.name.clone()),
        Some("Accent".to_string()),
        "the reused instance is rebound to the new property"
    );
    assert_eq!(pool.pooled(EDITOR_KIND_COLOR), 3, "reuse does not grow the pool");
}

#[test]
fn ranks_are_issued_in_strict_allocation_order() {
    let mut pool = PropertyEditorPool::new();
    pool.begin_cycle();
    let a0 = pool.acquire(EDITOR_KIND_TEXT, EditableProperty::new("Title", "hello", EDITOR_KIND_TEXT));
    let a1 = pool.acquire(EDITOR_KIND_TEXT, EditableProperty::new("Hint", "world", EDITOR_KIND_TEXT));

    pool.begin_cycle();
    let b0 = pool.acquire(EDITOR_KIND_TEXT, EditableProperty::new("Title", "again", EDITOR_KIND_TEXT));
    let b1 = pool.acquire(EDITOR_KIND_TEXT, EditableProperty::new("Hint", "again", EDITOR_KIND_TEXT));
    assert!(Rc::ptr_eq(&a0, &b0), "rank 0 before rank 1, never skipped");
    assert!(Rc::ptr_eq(&a1, &b1));
}

#[test]
fn kinds_keep_independent_cursors() {
    let mut pool = PropertyEditorPool::new();
    pool.begin_cycle();
    pool.acquire(EDITOR_KIND_TEXT, EditableProperty::new("Title", "x", EDITOR_KIND_TEXT));
    let color = pool.acquire(EDITOR_KIND_COLOR, color_property("Background", "#102030"));
    pool.acquire(EDITOR_KIND_BOOLEAN, EditableProperty::new("Visible", "true", EDITOR_KIND_BOOLEAN));
    assert_eq!(pool.cursor(EDITOR_KIND_TEXT), 1);
    assert_eq!(pool.cursor(EDITOR_KIND_COLOR), 1);
    assert_eq!(pool.cursor(EDITOR_KIND_BOOLEAN), 1);
    assert_eq!(color.borrow().display_value(), "#102030");
}

#[test]
fn unknown_kinds_fall_back_to_text_but_pool_under_their_own_name() {
    let mut pool = PropertyEditorPool::new();
    pool.begin_cycle();
    let spline = pool.acquire("spline", EditableProperty::new("Curve", "0,1,2", "spline"));
    assert_eq!(spline.borrow().kind(), EDITOR_KIND_TEXT, "fallback editor is the plain text one");
    assert_eq!(pool.pooled("spline"), 1);
    assert_eq!(pool.pooled(EDITOR_KIND_TEXT), 0, "the fallback does not pollute the text pool");

    pool.begin_cycle();
    let reused = pool.acquire("spline", EditableProperty::new("Curve", "3,4,5", "spline"));
    assert!(Rc::ptr_eq(&spline, &reused));
}

#[test]
fn registered_factories_take_precedence_over_the_fallback() {
    let mut pool = PropertyEditorPool::new();
    pool.register_factory(EDITOR_KIND_BOOLEAN, || {
        Rc::new(std::cell::RefCell::new(merlin_editor::pool::BooleanPropertyEditor::default()))
    });
    pool.begin_cycle();
    let editor =
        pool.acquire(EDITOR_KIND_BOOLEAN, EditableProperty::new("Enabled", "TRUE", EDITOR_KIND_BOOLEAN));
    assert_eq!(editor.borrow().kind(), EDITOR_KIND_BOOLEAN);
    assert_eq!(editor.borrow().display_value(), "TRUE");
}
