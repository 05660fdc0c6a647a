use core::fmt;

use super::{DOM, DOMNode, NodeKind};
use indextree::NodeId;

use serde_json::{Map, Value, json};

fn children_to_json(dom: &DOM, id: NodeId) -> Vec<Value> {
    id.children(&dom.dom)
        .map(|child| node_to_json(dom, child))
        .filter(|value| !value.is_null())
        .collect()
}

fn node_to_json(dom: &DOM, id: NodeId) -> Value {
    let Some(node_ref) = dom.dom.get(id) else {
        return Value::Null;
    };
    let DOMNode { kind, attrs, .. } = node_ref.get();
    match kind {
        NodeKind::Document => json!({ "type": "document", "children": children_to_json(dom, id) }),
        NodeKind::Element { tag } => {
            // Sorted for determinism; attribute order is insertion order otherwise.
            let mut pairs: Vec<&(String, String)> = attrs.iter().collect();
            pairs.sort_by(|left, right| left.0.cmp(&right.0));
            let mut attrs_obj = Map::new();
            for (name, value) in pairs {
                attrs_obj.insert(name.clone(), Value::String(value.clone()));
            }
            json!({
                "type": "element",
                "tag": tag,
                "attrs": Value::Object(attrs_obj),
                "children": children_to_json(dom, id),
            })
        }
        NodeKind::Text { text } => json!({ "type": "text", "text": text }),
    }
}

fn write_indent(formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        formatter.write_str("  ")?;
    }
    Ok(())
}

fn escape_debug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn fmt_node(dom: &DOM, id: NodeId, formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    let Some(node_ref) = dom.dom.get(id) else {
        return Ok(());
    };
    let DOMNode { key, kind, attrs } = node_ref.get();
    write_indent(formatter, depth)?;
    match kind {
        NodeKind::Document => writeln!(formatter, "#document")?,
        NodeKind::Element { tag } => {
            write!(formatter, "<{tag}")?;
            for (name, value) in attrs {
                write!(formatter, " {name}=\"{}\"", escape_debug(value))?;
            }
            writeln!(formatter, "> {key}")?;
        }
        NodeKind::Text { text } => {
            writeln!(formatter, "\"{}\"", escape_debug(text))?;
            return Ok(());
        }
    }
    for child in id.children(&dom.dom) {
        fmt_node(dom, child, formatter, depth + 1)?;
    }
    Ok(())
}

impl fmt::Debug for DOM {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(formatter, "DOM")?;
        fmt_node(self, self.root, formatter, 0)?;
        // Detached containers are addressable too.
        let mut detached: Vec<_> = self
            .keys
            .iter()
            .filter(|(_, id)| **id != self.root && id.parent(&self.dom).is_none())
            .collect();
        detached.sort_by_key(|(key, _)| **key);
        for (key, id) in detached {
            writeln!(formatter, "detached {key}:")?;
            fmt_node(self, *id, formatter, 1)?;
        }
        Ok(())
    }
}

impl DOM {
    /// Build a deterministic JSON representation of the document tree.
    /// Schema:
    /// - Document: { "type":"document", "children":[ ... ] }
    /// - Element: { "type":"element", "tag": "div", "attrs": {..}, "children":[ ... ] }
    /// - Text: { "type":"text", "text":"..." }
    pub fn to_json_value(&self) -> Value {
        node_to_json(self, self.root)
    }

    /// JSON of the subtree rooted at a single node (e.g. a detached container).
    pub fn node_to_json_value(&self, node: super::NodeKey) -> Value {
        self.keys
            .get(&node)
            .map_or(Value::Null, |id| node_to_json(self, *id))
    }

    /// Pretty JSON string for snapshots and test comparisons.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_else(|_| String::from("{}"))
    }
}
