//! Declarative UI payloads.
//!
//! A screen is described as a flat list of components referencing each other
//! by id, delivered as an ordered sequence of [`UiOp`]s: publish the
//! components, seed the data model, then name the root to start rendering.
//! The rendering itself happens in an external client; this module only
//! produces the payload.

use serde::{Deserialize, Serialize};

/// A value either given literally or bound to a data-model path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bound {
    LiteralString(String),
    Path(String),
}

impl Bound {
    pub fn literal(text: impl Into<String>) -> Self {
        Bound::LiteralString(text.into())
    }

    pub fn path(path: impl Into<String>) -> Self {
        Bound::Path(path.into())
    }
}

/// Child ids of a layout component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Children {
    #[serde(rename = "explicitList")]
    pub explicit_list: Vec<String>,
}

/// One entry a button action carries back with the user's click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionContext {
    pub key: String,
    pub value: Bound,
}

/// What pressing a button reports to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub context: Vec<ActionContext>,
}

/// The kinds of components a screen is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Component {
    Text {
        text: Bound,
        #[serde(rename = "usageHint")]
        usage_hint: String,
    },
    TextField {
        label: Bound,
        text: Bound,
        #[serde(rename = "hintText", skip_serializing_if = "Option::is_none")]
        hint_text: Option<Bound>,
    },
    Button {
        /// Id of the component rendered inside the button.
        child: String,
        action: Action,
    },
    Row {
        children: Children,
    },
    Column {
        children: Children,
    },
    Card {
        #[serde(rename = "contentChild")]
        content_child: String,
    },
}

/// A component and the id other components reference it by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub id: String,
    pub component: Component,
}

// ── Builders ────────────────────────────────────────────────────────────

pub fn text(id: &str, content: &str, usage_hint: &str) -> ComponentNode {
    ComponentNode {
        id: id.to_string(),
        component: Component::Text {
            text: Bound::literal(content),
            usage_hint: usage_hint.to_string(),
        },
    }
}

/// Body text, the common case.
pub fn body(id: &str, content: &str) -> ComponentNode {
    text(id, content, "body")
}

pub fn text_field(id: &str, label: &str, data_path: &str, hint: Option<&str>) -> ComponentNode {
    ComponentNode {
        id: id.to_string(),
        component: Component::TextField {
            label: Bound::literal(label),
            text: Bound::path(data_path),
            hint_text: hint.map(Bound::literal),
        },
    }
}

pub fn button(id: &str, text_id: &str, action_name: &str) -> ComponentNode {
    ComponentNode {
        id: id.to_string(),
        component: Component::Button {
            child: text_id.to_string(),
            action: Action {
                name: action_name.to_string(),
                context: Vec::new(),
            },
        },
    }
}

/// Button whose action carries the data under `context_path` back as `data`.
pub fn submit_button(id: &str, text_id: &str, action_name: &str, context_path: &str) -> ComponentNode {
    ComponentNode {
        id: id.to_string(),
        component: Component::Button {
            child: text_id.to_string(),
            action: Action {
                name: action_name.to_string(),
                context: vec![ActionContext {
                    key: "data".to_string(),
                    value: Bound::path(context_path),
                }],
            },
        },
    }
}

pub fn row(id: &str, children: &[&str]) -> ComponentNode {
    ComponentNode {
        id: id.to_string(),
        component: Component::Row {
            children: Children {
                explicit_list: children.iter().map(|c| c.to_string()).collect(),
            },
        },
    }
}

pub fn column(id: &str, children: &[&str]) -> ComponentNode {
    ComponentNode {
        id: id.to_string(),
        component: Component::Column {
            children: Children {
                explicit_list: children.iter().map(|c| c.to_string()).collect(),
            },
        },
    }
}

pub fn card(id: &str, content_id: &str) -> ComponentNode {
    ComponentNode {
        id: id.to_string(),
        component: Component::Card {
            content_child: content_id.to_string(),
        },
    }
}

// ── Data model ──────────────────────────────────────────────────────────

/// A typed data-model value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    #[serde(rename = "valueString")]
    String(String),
    #[serde(rename = "valueBoolean")]
    Boolean(bool),
    #[serde(rename = "valueMap")]
    Map(Vec<DataEntry>),
}

/// One key of the screen's data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    pub key: String,
    #[serde(flatten)]
    pub value: DataValue,
}

impl DataEntry {
    pub fn string(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: DataValue::String(value.to_string()),
        }
    }

    pub fn boolean(key: &str, value: bool) -> Self {
        Self {
            key: key.to_string(),
            value: DataValue::Boolean(value),
        }
    }

    pub fn map(key: &str, entries: Vec<DataEntry>) -> Self {
        Self {
            key: key.to_string(),
            value: DataValue::Map(entries),
        }
    }
}

// ── Update operations ───────────────────────────────────────────────────

/// One step of a screen update, applied by the renderer in sequence order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UiOp {
    /// Add or replace the listed components on a surface.
    #[serde(rename_all = "camelCase")]
    SurfaceUpdate {
        surface_id: String,
        components: Vec<ComponentNode>,
    },
    /// Publish initial data-model values for a surface.
    #[serde(rename_all = "camelCase")]
    DataModelUpdate {
        surface_id: String,
        contents: Vec<DataEntry>,
    },
    /// Name the root component and start rendering.
    #[serde(rename_all = "camelCase")]
    BeginRendering {
        surface_id: String,
        root: String,
    },
}

/// Surface id used for every screen in this system.
pub const MAIN_SURFACE: &str = "main";

impl UiOp {
    pub fn surface_update(components: Vec<ComponentNode>) -> Self {
        UiOp::SurfaceUpdate {
            surface_id: MAIN_SURFACE.to_string(),
            components,
        }
    }

    pub fn data_model_update(contents: Vec<DataEntry>) -> Self {
        UiOp::DataModelUpdate {
            surface_id: MAIN_SURFACE.to_string(),
            contents,
        }
    }

    pub fn begin_rendering(root: &str) -> Self {
        UiOp::BeginRendering {
            surface_id: MAIN_SURFACE.to_string(),
            root: root.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_component_wire_shape() {
        let node = text("title", "Welcome!", "h1");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["id"], "title");
        assert_eq!(json["component"]["Text"]["text"]["literalString"], "Welcome!");
        assert_eq!(json["component"]["Text"]["usageHint"], "h1");
    }

    #[test]
    fn text_field_binds_to_path() {
        let node = text_field("name-field", "Your name", "/user/name", Some("Enter your full name"));
        let json = serde_json::to_value(&node).unwrap();
        let field = &json["component"]["TextField"];
        assert_eq!(field["label"]["literalString"], "Your name");
        assert_eq!(field["text"]["path"], "/user/name");
        assert_eq!(field["hintText"]["literalString"], "Enter your full name");

        let bare = text_field("f", "Label", "/x", None);
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json["component"]["TextField"].get("hintText").is_none());
    }

    #[test]
    fn submit_button_carries_context() {
        let node = submit_button("next-btn", "next-btn-text", "submit_name", "/user");
        let json = serde_json::to_value(&node).unwrap();
        let action = &json["component"]["Button"]["action"];
        assert_eq!(action["name"], "submit_name");
        assert_eq!(action["context"][0]["key"], "data");
        assert_eq!(action["context"][0]["value"]["path"], "/user");
    }

    #[test]
    fn plain_button_omits_context() {
        let json = serde_json::to_value(button("b", "b-text", "start_onboarding")).unwrap();
        assert!(json["component"]["Button"]["action"].get("context").is_none());
    }

    #[test]
    fn layout_components_list_children() {
        let json = serde_json::to_value(column("root", &["a", "b"])).unwrap();
        assert_eq!(
            json["component"]["Column"]["children"]["explicitList"],
            serde_json::json!(["a", "b"])
        );
        let json = serde_json::to_value(card("c", "inner")).unwrap();
        assert_eq!(json["component"]["Card"]["contentChild"], "inner");
    }

    #[test]
    fn data_entries_flatten_typed_values() {
        let entry = DataEntry::map(
            "user",
            vec![DataEntry::string("name", ""), DataEntry::boolean("done", false)],
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["key"], "user");
        assert_eq!(json["valueMap"][0]["valueString"], "");
        assert_eq!(json["valueMap"][1]["valueBoolean"], false);
    }

    #[test]
    fn ops_serialize_with_camel_case_tags() {
        let op = UiOp::surface_update(vec![body("msg", "hello")]);
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["surfaceUpdate"]["surfaceId"], "main");
        assert_eq!(json["surfaceUpdate"]["components"][0]["id"], "msg");

        let op = UiOp::begin_rendering("root");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["beginRendering"]["root"], "root");

        let op = UiOp::data_model_update(vec![DataEntry::string("name", "Joe")]);
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["dataModelUpdate"]["contents"][0]["key"], "name");
    }

    #[test]
    fn op_roundtrip() {
        let op = UiOp::surface_update(vec![
            column("root", &["title"]),
            text("title", "Hi", "h1"),
        ]);
        let json = serde_json::to_string(&op).unwrap();
        let parsed: UiOp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, op);
    }
}
