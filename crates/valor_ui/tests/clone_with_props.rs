use std::rc::Rc;

use anyhow::{Error, anyhow};
use html::{DOM, NodeKey};
use valor_ui::{ComponentClass, Element, Ui, UiConfig, UiError, Value, clone_with_props, host, props};

fn setup() -> Result<(Ui, NodeKey), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut dom = DOM::new();
    let container = dom.create_element("div");
    dom.append_child(dom.root(), container)?;
    Ok((Ui::with_config(dom, UiConfig::new(8, true, false)), container))
}

/// Renders its only child cloned with `className: "xyz"` and `key: "xyz"`.
fn parent() -> Rc<ComponentClass> {
    ComponentClass::builder("Parent", |scope| {
        let children = scope.children();
        let child = children.only().ok_or(UiError::StaleInstance)?;
        Ok(host("div")
            .prop("className", "parent")
            .child(clone_with_props(child, &props! { "className" => "xyz", "key" => "xyz" }))
            .build())
    })
    .build()
}

fn grandparent(parent: &Rc<ComponentClass>, child: impl Fn() -> Element + 'static) -> Rc<ComponentClass> {
    let parent = Rc::clone(parent);
    ComponentClass::builder("Grandparent", move |_| {
        Ok(parent.create().ref_name("parent").child(child()).build())
    })
    .build()
}

#[test]
fn cloned_host_child_gets_merged_props_and_key() -> Result<(), Error> {
    let (mut ui, container) = setup()?;
    let parent_class = parent();
    let root = ui.render(
        grandparent(&parent_class, || host("div").prop("className", "child").build()).create(),
        container,
    )?;

    let outer = ui.dom().first_element_child(container).ok_or_else(|| anyhow!("nothing rendered"))?;
    let inner = ui.dom().first_element_child(outer).ok_or_else(|| anyhow!("no cloned child"))?;
    assert_eq!(ui.dom().attribute(outer, "class"), Some("parent"));
    assert_eq!(ui.dom().attribute(inner, "class"), Some("child xyz"));

    let parent_id = ui.get_ref(root, "parent").ok_or_else(|| anyhow!("no parent ref"))?;
    let div = ui.rendered_child(parent_id).ok_or_else(|| anyhow!("nothing rendered"))?;
    let cloned = ui.children(div).first().copied().ok_or_else(|| anyhow!("no child"))?;
    let key = ui.instance(cloned).and_then(|instance| instance.element().key().map(str::to_owned));
    assert_eq!(key.as_deref(), Some("xyz"));
    assert_eq!(ui.owner(cloned), Some(parent_id));
    Ok(())
}

#[test]
fn cloned_composite_child_receives_props() -> Result<(), Error> {
    let (mut ui, container) = setup()?;
    let child_class = ComponentClass::builder("Child", |scope| {
        let class = scope.prop("className").cloned().unwrap_or(Value::Null);
        Ok(host("span").prop("className", class).build())
    })
    .build();
    let parent_class = parent();
    ui.render(
        grandparent(&parent_class, move || child_class.create().build()).create(),
        container,
    )?;

    let outer = ui.dom().first_element_child(container).ok_or_else(|| anyhow!("nothing rendered"))?;
    let span = ui.dom().first_element_child(outer).ok_or_else(|| anyhow!("no cloned child"))?;
    assert_eq!(ui.dom().attribute(span, "class"), Some("xyz"));
    Ok(())
}

#[test]
fn cloned_ref_attaches_to_the_rendering_owner() -> Result<(), Error> {
    let (mut ui, container) = setup()?;
    let parent_class = parent();
    let root = ui.render(
        grandparent(&parent_class, || host("p").ref_name("yolo").build()).create(),
        container,
    )?;

    assert_eq!(ui.get_ref(root, "yolo"), None);
    let parent_id = ui.get_ref(root, "parent").ok_or_else(|| anyhow!("no parent ref"))?;
    let cloned = ui.get_ref(parent_id, "yolo").ok_or_else(|| anyhow!("no ref on parent"))?;
    assert_eq!(ui.class_name(cloned), Some("p"));
    Ok(())
}
