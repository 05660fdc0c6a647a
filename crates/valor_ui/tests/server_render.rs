use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Error, anyhow};
use html::checksum::CHECKSUM_ATTR;
use html::{DOM, MOUNT_ID_ATTR, NodeKey};
use valor_ui::{
    ComponentClass, Ui, UiConfig, UiError, Value, host, props, render_to_string, render_to_string_with,
};

fn setup(config: UiConfig) -> Result<(Ui, NodeKey), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut dom = DOM::new();
    let container = dom.create_element("div");
    dom.append_child(dom.root(), container)?;
    Ok((Ui::with_config(dom, config), container))
}

fn card(mounts: &Rc<Cell<usize>>) -> Rc<ComponentClass> {
    let mounts = Rc::clone(mounts);
    ComponentClass::builder("Card", |scope| {
        let title = scope.prop("title").and_then(Value::to_text).unwrap_or_default();
        let greeting = scope.state_value("greeting").and_then(Value::to_text).unwrap_or_default();
        Ok(host("section")
            .prop("className", "card")
            .child(host("h2").text(title))
            .child(host("p").text(greeting))
            .build())
    })
    .will_mount(|scope| scope.set_state(props! { "greeting" => "hi" }))
    .did_mount(move |_| mounts.set(mounts.get() + 1))
    .build()
}

#[test]
fn markup_carries_mount_ids_and_a_checksum() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mounts = Rc::new(Cell::new(0));
    let markup = render_to_string(card(&mounts).create().prop("title", "One"))?;

    assert!(markup.starts_with("<section"), "{markup}");
    assert!(markup.contains(&format!("{MOUNT_ID_ATTR}=\".s")), "{markup}");
    assert!(markup.contains(&format!("{CHECKSUM_ATTR}=\"")), "{markup}");
    assert!(markup.contains("class=\"card\""), "{markup}");
    assert!(markup.contains(">hi</p>"), "{markup}");
    assert_eq!(mounts.get(), 0);

    let length = render_to_string_with(host("br"), |markup| markup.len())?;
    assert!(length > "<br>".len());
    Ok(())
}

#[test]
fn separate_server_renders_use_distinct_root_ids() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let first = DOM::from_markup(&render_to_string(host("div"))?)?;
    let second = DOM::from_markup(&render_to_string(host("div"))?)?;
    let id_of = |dom: &DOM| {
        dom.find_element("div")
            .and_then(|node| dom.attribute(node, MOUNT_ID_ATTR))
            .map(str::to_owned)
    };
    assert!(id_of(&first).is_some());
    assert_ne!(id_of(&first), id_of(&second));
    Ok(())
}

#[test]
fn client_render_adopts_matching_markup_without_writes() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let mounts = Rc::new(Cell::new(0));
    let class = card(&mounts);
    let markup = render_to_string(class.create().prop("title", "One"))?;
    ui.dom_mut().load_markup(container, &markup)?;
    let before = ui.dom().first_element_child(container);

    let root = ui.render(class.create().prop("title", "One"), container)?;
    assert_eq!(ui.counters().content_writes, 0);
    assert_eq!(ui.dom().content_writes(), 0);
    assert_eq!(ui.dom().first_element_child(container), before);
    assert_eq!(mounts.get(), 1);

    ui.set_props(root, props! { "title" => "Two" })?;
    assert_eq!(ui.dom().text_content(container), "Twohi");
    assert_eq!(ui.dom().first_element_child(container), before);
    Ok(())
}

#[test]
fn lenient_mismatch_replaces_the_markup() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, false, false))?;
    let mounts = Rc::new(Cell::new(0));
    let class = card(&mounts);
    let markup = render_to_string(class.create().prop("title", "One"))?;
    ui.dom_mut().load_markup(container, &markup)?;

    ui.render(class.create().prop("title", "Other"), container)?;
    assert_eq!(ui.counters().content_writes, 1);
    assert_eq!(ui.dom().text_content(container), "Otherhi");
    let node = ui.dom().first_element_child(container).ok_or_else(|| anyhow!("no markup"))?;
    assert_eq!(ui.dom().attribute(node, CHECKSUM_ATTR), None);
    Ok(())
}

#[test]
fn strict_mismatch_is_an_error() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let mounts = Rc::new(Cell::new(0));
    let class = card(&mounts);
    let markup = render_to_string(class.create().prop("title", "One"))?;
    ui.dom_mut().load_markup(container, &markup)?;

    let result = ui.render(class.create().prop("title", "Other"), container);
    assert!(matches!(result, Err(UiError::ChecksumMismatch { .. })), "{result:?}");
    assert_eq!(ui.root_instance(container), None);
    assert_eq!(mounts.get(), 0);
    assert_eq!(ui.dom().text_content(container), "Onehi");
    Ok(())
}
