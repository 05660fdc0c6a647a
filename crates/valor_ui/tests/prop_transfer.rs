use std::rc::Rc;

use anyhow::{Error, anyhow};
use html::{DOM, NodeKey};
use valor_ui::{ComponentClass, Ui, UiConfig, host, props};

fn setup() -> Result<(Ui, NodeKey), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut dom = DOM::new();
    let container = dom.create_element("div");
    dom.append_child(dom.root(), container)?;
    Ok((Ui::with_config(dom, UiConfig::new(8, true, false)), container))
}

fn text_input() -> Rc<ComponentClass> {
    ComponentClass::builder("TextInput", |scope| {
        scope.transfer_props_to(
            host("input")
                .prop("className", "textinput")
                .prop("style", props! { "display" => "block" })
                .prop("type", "text")
                .prop("value", ""),
        )
    })
    .build()
}

fn input_attribute(ui: &Ui, container: NodeKey, name: &str) -> Result<Option<String>, Error> {
    let input = ui
        .dom()
        .first_element_child(container)
        .ok_or_else(|| anyhow!("nothing rendered"))?;
    Ok(ui.dom().attribute(input, name).map(str::to_owned))
}

#[test]
fn explicit_props_are_left_intact() -> Result<(), Error> {
    let (mut ui, container) = setup()?;
    ui.render(text_input().create().prop("type", "radio"), container)?;
    assert_eq!(input_attribute(&ui, container, "type")?.as_deref(), Some("text"));
    Ok(())
}

#[test]
fn unspecified_props_are_transferred() -> Result<(), Error> {
    let (mut ui, container) = setup()?;
    ui.render(
        text_input().create().prop("placeholder", "Type here..."),
        container,
    )?;
    assert_eq!(
        input_attribute(&ui, container, "placeholder")?.as_deref(),
        Some("Type here...")
    );
    Ok(())
}

#[test]
fn class_names_join_and_styles_merge() -> Result<(), Error> {
    let (mut ui, container) = setup()?;
    ui.render(
        text_input()
            .create()
            .prop("className", "hidden_elem")
            .prop("style", props! { "display" => "none", "width" => "100%" }),
        container,
    )?;
    assert_eq!(
        input_attribute(&ui, container, "class")?.as_deref(),
        Some("textinput hidden_elem")
    );
    assert_eq!(
        input_attribute(&ui, container, "style")?.as_deref(),
        Some("display:block;width:100%;")
    );
    Ok(())
}

#[test]
fn key_and_ref_are_not_transferred() -> Result<(), Error> {
    let (mut ui, container) = setup()?;
    let input = text_input();
    let form = ComponentClass::builder("Form", move |_| {
        Ok(input.create().key("field").ref_name("field").build())
    })
    .build();

    let root = ui.render(form.create(), container)?;
    let field = ui.get_ref(root, "field").ok_or_else(|| anyhow!("no field ref"))?;
    assert_eq!(ui.class_name(field), Some("TextInput"));

    let rendered = ui.rendered_child(field).ok_or_else(|| anyhow!("nothing rendered"))?;
    let element = ui.instance(rendered).map(|instance| instance.element().clone());
    let element = element.ok_or_else(|| anyhow!("missing instance"))?;
    assert_eq!(element.tag(), Some("input"));
    assert_eq!(element.key(), None);
    assert_eq!(element.ref_name(), None);
    assert_eq!(input_attribute(&ui, container, "key")?, None);
    Ok(())
}
