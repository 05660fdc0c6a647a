use anyhow::Error;
use html::{DOM, DOMUpdate, Markup, MutationLog, NodeKey, NodeRef};

fn item(mount_id: &str, text: &str) -> Markup {
    Markup::element("li")
        .with_attr("data-valorid", mount_id)
        .with_child(Markup::text(text))
}

fn container_with_list(dom: &mut DOM) -> Result<NodeKey, Error> {
    let container = dom.create_element("div");
    dom.apply_batch(vec![DOMUpdate::SetContent {
        node: container.into(),
        markup: vec![
            Markup::element("ul")
                .with_attr("data-valorid", ".0")
                .with_child(item(".0.0", "a"))
                .with_child(item(".0.1", "b"))
                .with_child(item(".0.2", "c")),
        ],
    }])?;
    Ok(container)
}

#[test]
fn set_content_indexes_mount_ids_and_counts_writes() -> Result<(), Error> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut dom = DOM::new();
    let container = container_with_list(&mut dom)?;

    assert_eq!(dom.content_writes(), 1);
    let list = dom.find_by_mount_id(".0").ok_or_else(|| anyhow::anyhow!("missing .0"))?;
    assert_eq!(dom.parent(list), Some(container));
    assert_eq!(dom.text_content(container), "abc");
    Ok(())
}

#[test]
fn moves_use_detach_then_insert() -> Result<(), Error> {
    let mut dom = DOM::new();
    let container = container_with_list(&mut dom)?;

    // c, a, b
    dom.apply_batch(vec![
        DOMUpdate::DetachNode { node: NodeRef::mount(".0.2") },
        DOMUpdate::InsertDetached {
            parent: NodeRef::mount(".0"),
            node: NodeRef::mount(".0.2"),
            index: 0,
        },
    ])?;
    assert_eq!(dom.text_content(container), "cab");
    assert_eq!(dom.content_writes(), 1);
    Ok(())
}

#[test]
fn remove_and_replace_release_mount_ids() -> Result<(), Error> {
    let mut dom = DOM::new();
    let container = container_with_list(&mut dom)?;

    dom.apply_batch(vec![
        DOMUpdate::RemoveNode { node: NodeRef::mount(".0.0") },
        DOMUpdate::ReplaceNode {
            node: NodeRef::mount(".0.1"),
            markup: Markup::element("p")
                .with_attr("data-valorid", ".0.1")
                .with_child(Markup::text("B")),
        },
    ])?;

    assert!(dom.find_by_mount_id(".0.0").is_none());
    let replaced = dom.find_by_mount_id(".0.1").ok_or_else(|| anyhow::anyhow!("missing .0.1"))?;
    assert_eq!(dom.tag(replaced), Some("p"));
    assert_eq!(
        dom.inner_html(container),
        r#"<ul data-valorid=".0"><p data-valorid=".0.1">B</p><li data-valorid=".0.2">c</li></ul>"#
    );
    Ok(())
}

#[test]
fn attributes_and_text_updates() -> Result<(), Error> {
    let mut dom = DOM::new();
    let container = container_with_list(&mut dom)?;
    let list = dom.find_by_mount_id(".0").ok_or_else(|| anyhow::anyhow!("missing .0"))?;

    dom.apply_batch(vec![
        DOMUpdate::SetAttr {
            node: NodeRef::mount(".0"),
            name: "class".into(),
            value: "items".into(),
        },
        DOMUpdate::SetText {
            node: NodeRef::mount(".0.1"),
            text: "beta".into(),
        },
    ])?;
    assert_eq!(dom.attribute(list, "class"), Some("items"));
    assert_eq!(dom.text_content(container), "abetac");

    dom.apply_batch(vec![DOMUpdate::RemoveAttr {
        node: NodeRef::mount(".0"),
        name: "class".into(),
    }])?;
    assert_eq!(dom.attribute(list, "class"), None);
    Ok(())
}

#[test]
fn unknown_targets_are_errors() {
    let mut dom = DOM::new();
    let result = dom.apply_batch(vec![DOMUpdate::RemoveNode {
        node: NodeRef::mount(".9"),
    }]);
    assert!(result.is_err());
    let result = dom.apply_batch(vec![DOMUpdate::ClearContent {
        node: NodeKey(4242).into(),
    }]);
    assert!(result.is_err());
}

#[test]
fn subscribers_receive_applied_batches() -> Result<(), Error> {
    let mut dom = DOM::new();
    let log = MutationLog::new();
    dom.subscribe(Box::new(log.clone()));

    let container = container_with_list(&mut dom)?;
    dom.apply_batch(vec![DOMUpdate::ClearContent { node: container.into() }])?;

    assert_eq!(log.len(), 2);
    assert_eq!(log.count(|update| matches!(update, DOMUpdate::SetContent { .. })), 1);
    assert_eq!(dom.inner_html(container), "");
    Ok(())
}

#[test]
fn loaded_document_is_addressable_without_content_writes() -> Result<(), Error> {
    let dom = DOM::from_markup(
        r#"<!doctype html><html><head><title>t</title></head><body><div data-valorid=".1">Hello world</div></body></html>"#,
    )?;
    assert_eq!(dom.content_writes(), 0);
    let html = dom.first_element_child(NodeKey::ROOT).ok_or_else(|| anyhow::anyhow!("no html"))?;
    assert_eq!(dom.tag(html), Some("html"));
    let body = dom.find_element("body").ok_or_else(|| anyhow::anyhow!("no body"))?;
    assert_eq!(dom.inner_html(body), r#"<div data-valorid=".1">Hello world</div>"#);
    assert!(dom.find_by_mount_id(".1").is_some());

    let snapshot = dom.to_json_value();
    assert_eq!(snapshot["type"], "document");
    assert_eq!(snapshot["children"][0]["tag"], "html");
    Ok(())
}

#[test]
fn containers_can_be_attached_to_the_document() -> Result<(), Error> {
    let mut dom = DOM::from_markup("<html><head></head><body></body></html>")?;
    let body = dom.find_element("body").ok_or_else(|| anyhow::anyhow!("no body"))?;
    let container = dom.create_element("section");
    dom.append_child(body, container)?;
    dom.load_markup(container, "<p>x</p>")?;
    assert_eq!(dom.inner_html(body), "<section><p>x</p></section>");
    assert_eq!(dom.content_writes(), 0);
    Ok(())
}
