use std::cell::Cell;
use std::rc::Rc;

use anyhow::{Error, anyhow};
use html::{DOM, NodeKey};
use valor_ui::{ComponentClass, Element, ElementBuilder, Ui, UiConfig, UiError, host};

fn setup(config: UiConfig) -> Result<(Ui, NodeKey), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut dom = DOM::new();
    let container = dom.create_element("div");
    dom.append_child(dom.root(), container)?;
    Ok((Ui::with_config(dom, config), container))
}

#[derive(Default)]
struct Lifecycles {
    mounts: Rc<Cell<usize>>,
    updates: Rc<Cell<usize>>,
    unmounts: Rc<Cell<usize>>,
}

impl Lifecycles {
    fn class(&self, name: &str) -> Rc<ComponentClass> {
        let mounts = Rc::clone(&self.mounts);
        let updates = Rc::clone(&self.updates);
        let unmounts = Rc::clone(&self.unmounts);
        ComponentClass::builder(name, |_| Ok(host("span").build()))
            .did_mount(move |_| mounts.set(mounts.get() + 1))
            .did_update(move |_, _, _| updates.set(updates.get() + 1))
            .will_unmount(move |_| unmounts.set(unmounts.get() + 1))
            .build()
    }

    fn counts(&self) -> (usize, usize, usize) {
        (self.mounts.get(), self.updates.get(), self.unmounts.get())
    }
}

#[test]
fn identical_structure_updates_in_place() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let log = Lifecycles::default();
    let item = log.class("Item");

    ui.render(host("div").child(item.create()), container)?;
    ui.render(host("div").child(item.create()), container)?;
    assert_eq!(log.counts(), (1, 1, 0));
    Ok(())
}

#[test]
fn same_top_level_element_rendered_twice_still_updates() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let log = Lifecycles::default();
    let item = log.class("Item");
    let element = host("div").child(item.create()).build();

    ui.render(element.clone(), container)?;
    ui.render(element, container)?;
    assert_eq!(log.counts(), (1, 1, 0));
    Ok(())
}

#[test]
fn failed_child_mount_keeps_the_previous_children() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let log = Lifecycles::default();
    let item = log.class("Item");
    let broken = ComponentClass::builder("Broken", |_| {
        Err(UiError::InvalidTarget("cannot render".to_owned()))
    })
    .build();

    let root = ui.render(
        host("ul").child(item.create().key("a")).child(item.create().key("b")),
        container,
    )?;
    let result = ui.render(
        host("ul").child(item.create().key("a")).child(broken.create().key("c")),
        container,
    );
    assert!(matches!(result, Err(UiError::InvalidTarget(_))), "{result:?}");
    assert_eq!(ui.children(root).len(), 2);
    assert_eq!(log.counts(), (2, 0, 0));
    assert_eq!(ui.dom().inner_html(container).matches("<span").count(), 2);

    ui.render(
        host("ul").child(item.create().key("a")).child(item.create().key("d")),
        container,
    )?;
    assert_eq!(ui.children(root).len(), 2);
    assert_eq!(log.counts(), (3, 1, 1));
    assert_eq!(ui.dom().inner_html(container).matches("<span").count(), 2);
    Ok(())
}

#[test]
fn changed_class_replaces_the_child() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let log = Lifecycles::default();
    let first = log.class("First");
    let second = log.class("Second");

    ui.render(host("div").child(first.create()), container)?;
    ui.render(host("div").child(second.create()), container)?;
    assert_eq!(log.counts(), (2, 0, 1));
    assert_eq!(ui.dom().inner_html(container).matches("<span").count(), 1);
    Ok(())
}

#[test]
fn changed_owner_replaces_the_child() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let log = Lifecycles::default();
    let item = log.class("Item");
    let own_item = Rc::clone(&item);
    let wrapper = ComponentClass::builder("Wrapper", move |scope| {
        match scope.children().only() {
            Some(child) => Ok(child.clone()),
            None => Ok(own_item.create().build()),
        }
    })
    .build();

    let root = ui.render(wrapper.create(), container)?;
    let before = ui.rendered_child(root).ok_or_else(|| anyhow!("nothing rendered"))?;
    assert_eq!(ui.owner(before), Some(root));

    // Same class, but now produced at the top level instead of by the wrapper.
    ui.render(wrapper.create().child(item.create()), container)?;
    let after = ui.rendered_child(root).ok_or_else(|| anyhow!("nothing rendered"))?;
    assert_eq!(log.counts(), (2, 0, 1));
    assert_ne!(before, after);
    assert_eq!(ui.owner(after), None);
    assert!(!ui.is_mounted(before));
    Ok(())
}

#[test]
fn changed_key_replaces_the_child() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let log = Lifecycles::default();
    let item = log.class("Item");

    ui.render(host("div").child(item.create().key("A")), container)?;
    ui.render(host("div").child(item.create().key("B")), container)?;
    assert_eq!(log.counts(), (2, 0, 1));
    Ok(())
}

fn list(keys: &[&str]) -> ElementBuilder {
    keys.iter().fold(host("ul"), |list, key| {
        list.child(host("li").key(*key).text(*key))
    })
}

#[test]
fn keyed_reorder_moves_existing_nodes() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let root = ui.render(list(&["a", "b", "c"]), container)?;
    let mount_id = ui.mount_id(root).ok_or_else(|| anyhow!("no mount id"))?.to_owned();
    let node_of = |ui: &Ui, key: &str| ui.dom().find_by_mount_id(&format!("{mount_id}.${key}"));
    let before: Vec<_> = ["a", "b", "c"].iter().map(|key| node_of(&ui, key)).collect();
    let writes = ui.counters().content_writes;

    ui.render(list(&["c", "a", "b"]), container)?;
    assert_eq!(ui.dom().text_content(container), "cab");
    let after: Vec<_> = ["a", "b", "c"].iter().map(|key| node_of(&ui, key)).collect();
    assert_eq!(before, after);
    assert!(after.iter().all(Option::is_some));
    assert_eq!(ui.counters().content_writes, writes);

    ui.render(list(&["c", "x", "b"]), container)?;
    assert_eq!(ui.dom().text_content(container), "cxb");
    assert_eq!(node_of(&ui, "a"), None);
    assert_eq!(node_of(&ui, "b"), before[1]);
    Ok(())
}

#[test]
fn text_children_update_in_place() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let root = ui.render(
        host("p").child(Element::text("one")).child(host("br")),
        container,
    )?;
    let text = ui.children(root).first().copied().ok_or_else(|| anyhow!("no text child"))?;
    let node = ui.dom_node(text);

    ui.render(
        host("p").child(Element::text("two")).child(host("br")),
        container,
    )?;
    assert_eq!(ui.dom().text_content(container), "two");
    assert_eq!(ui.dom_node(text), node);
    assert_eq!(ui.class_name(text), Some("#text"));
    Ok(())
}

#[test]
fn fresh_children_over_the_threshold_are_written_at_once() -> Result<(), Error> {
    for (threshold, expected_writes) in [(2, 1), (8, 0)] {
        let (mut ui, container) = setup(UiConfig::new(threshold, true, false))?;
        ui.render(list(&[]), container)?;
        let writes = ui.counters().content_writes;

        ui.render(list(&["a", "b", "c"]), container)?;
        assert_eq!(
            ui.counters().content_writes - writes,
            expected_writes,
            "threshold {threshold}"
        );
        assert_eq!(ui.dom().text_content(container), "abc");
        assert_eq!(ui.counters().mounts, 4);
    }
    Ok(())
}

#[test]
fn attribute_changes_are_patched() -> Result<(), Error> {
    let (mut ui, container) = setup(UiConfig::new(8, true, false))?;
    let root = ui.render(
        host("div").prop("className", "a").prop("title", "t"),
        container,
    )?;
    let node = ui.dom_node(root).ok_or_else(|| anyhow!("no node"))?;
    assert_eq!(ui.dom().attribute(node, "class"), Some("a"));

    ui.render(host("div").prop("className", "b"), container)?;
    assert_eq!(ui.dom_node(root), Some(node));
    assert_eq!(ui.dom().attribute(node, "class"), Some("b"));
    assert_eq!(ui.dom().attribute(node, "title"), None);
    Ok(())
}
