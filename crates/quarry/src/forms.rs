//! Form control values and form serialization

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use quarry_css::Query;
use quarry_select::Axis;

use crate::document::NodeRef;
use crate::error::Result;
use crate::selection::Selection;

/// Control types a form submission never includes
const SUBMITTER_TYPES: &[&str] = &["submit", "button", "image", "reset", "file"];

/// Value of a form control: one string, or several for `select multiple`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Controls submitted with the form `form` (whose id is `id`): its own
/// controls without a `form` attribute plus any control naming it
fn owned_controls(form: &NodeRef, id: &str, controls: &Query) -> Vec<NodeRef> {
    let root = {
        let tree = form.document().borrow();
        form.sibling_ref(tree.root_of(form.id()))
    };
    let candidates = Selection::run(&[root], controls, Axis::DescendantOrSelf);
    let tree = form.document().borrow();
    let owned = candidates
        .into_iter()
        .filter(|control| {
            let owner = tree.element(control.id()).and_then(|e| e.get_attribute("form"));
            match owner {
                Some(owner) => owner == id,
                None => control.id() != form.id() && tree.is_ancestor_or_self(form.id(), control.id()),
            }
        })
        .collect();
    owned
}

impl FieldValue {
    fn into_values(self) -> Vec<String> {
        match self {
            FieldValue::Single(v) => vec![v],
            FieldValue::Multiple(vs) => vs,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Single(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Single(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::Multiple(values)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        FieldValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

/// One `name=value` entry of a serialized form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

fn is_checkable(node: &NodeRef) -> bool {
    node.tag_name().as_deref() == Some("input")
        && node
            .attr("type")
            .map(|t| t.eq_ignore_ascii_case("checkbox") || t.eq_ignore_ascii_case("radio"))
            .unwrap_or(false)
}

fn option_value(option: &Selection) -> String {
    option.attr("value").unwrap_or_else(|| option.text())
}

impl Selection {
    /// Value of the first element, the way a browser would submit it
    pub fn val(&self) -> Option<FieldValue> {
        let node = self.first()?;
        let item = self.sibling(vec![node.clone()]);
        let tag = node.tag_name().unwrap_or_default();

        match tag.as_str() {
            "textarea" => item.html().map(FieldValue::Single),
            "select" => {
                let options = item.query("option").ok()?;
                let selected = item.query("option[selected]").ok()?;
                if node.attr("multiple").is_some() {
                    Some(FieldValue::Multiple(selected.items().iter().map(option_value).collect()))
                } else {
                    let chosen = if selected.is_empty() { options.eq(0) } else { selected.eq(-1) };
                    if chosen.is_empty() {
                        None
                    } else {
                        Some(FieldValue::Single(option_value(&chosen)))
                    }
                }
            }
            _ if is_checkable(node) => Some(FieldValue::Single(
                node.attr("value").unwrap_or_else(|| "on".to_string()),
            )),
            "input" => Some(FieldValue::Single(
                node.attr("value").unwrap_or_default().replace('\n', ""),
            )),
            _ => Some(FieldValue::Single(node.attr("value").unwrap_or_default())),
        }
    }

    /// Set the value of every element
    ///
    /// A `select` marks the options whose value is listed (only the first
    /// one unless it is `multiple`). A list is joined with commas elsewhere.
    pub fn set_val(&self, value: impl Into<FieldValue>) -> Result<&Self> {
        let value = value.into();
        for node in self.iter() {
            let item = self.sibling(vec![node.clone()]);
            match node.tag_name().as_deref() {
                Some("select") => {
                    let multiple = node.attr("multiple").is_some();
                    let mut wanted = value.clone().into_values();
                    for option in item.query("option")?.items() {
                        if wanted.contains(&option_value(&option)) {
                            option.set_attr("selected", "selected");
                            if !multiple {
                                wanted.clear();
                            }
                        } else {
                            option.remove_attr("selected");
                        }
                    }
                }
                Some("textarea") => {
                    item.set_text(&value.clone().into_values().join(","));
                }
                _ => {
                    item.set_attr("value", &value.clone().into_values().join(","));
                }
            }
        }
        Ok(self)
    }

    /// Successful controls of the selected forms, fieldsets or controls
    pub fn serialize_pairs(&self) -> Result<Vec<(String, String)>> {
        let mut controls: Vec<NodeRef> = Vec::new();
        for item in self.items() {
            let Some(node) = item.first().cloned() else {
                continue;
            };
            match node.tag_name().as_deref() {
                Some("form") => match node.attr("id").filter(|id| !id.is_empty()) {
                    Some(id) => controls.extend(owned_controls(&node, &id, &self.compile(":input")?)),
                    None => controls.extend(item.query(":not([form]):input")?.iter().cloned()),
                },
                Some("fieldset") => controls.extend(item.query(":input")?.iter().cloned()),
                _ => controls.push(node),
            }
        }

        let mut selector = String::from("[name]:enabled:not(button)");
        for kind in SUBMITTER_TYPES {
            selector.push_str(&format!(":not([type=\"{}\"])", kind));
        }
        let successful = self.compile(&selector)?;
        let unchecked = self.compile(":checkbox:not(:checked), :radio:not(:checked)")?;

        let mut pairs = Vec::new();
        for control in controls {
            let one = std::slice::from_ref(&control);
            if Self::run(one, &successful, Axis::SelfOnly).is_empty()
                || !Self::run(one, &unchecked, Axis::SelfOnly).is_empty()
            {
                continue;
            }
            let name = control.attr("name").unwrap_or_default();
            let value = self
                .sibling(vec![control.clone()])
                .val()
                .unwrap_or_else(|| FieldValue::Single(String::new()));
            for v in value.into_values() {
                pairs.push((name.clone(), v.replace('\n', "\r\n")));
            }
        }
        Ok(pairs)
    }

    /// URL-encoded form data, spaces as `%20`
    pub fn serialize(&self) -> Result<String> {
        let pairs = self.serialize_pairs()?;
        let encoded = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())))
            .finish();
        Ok(encoded.replace('+', "%20"))
    }

    pub fn serialize_array(&self) -> Result<Vec<FormField>> {
        Ok(self
            .serialize_pairs()?
            .into_iter()
            .map(|(name, value)| FormField { name, value })
            .collect())
    }

    /// Values grouped by name in first-seen order; repeated names become lists
    pub fn serialize_dict(&self) -> Result<Vec<(String, FieldValue)>> {
        let mut out: Vec<(String, FieldValue)> = Vec::new();
        for (name, value) in self.serialize_pairs()? {
            match out.iter_mut().find(|(n, _)| *n == name) {
                None => out.push((name, FieldValue::Single(value))),
                Some((_, existing)) => {
                    let mut values = std::mem::replace(existing, FieldValue::Multiple(Vec::new())).into_values();
                    values.push(value);
                    *existing = FieldValue::Multiple(values);
                }
            }
        }
        Ok(out)
    }
}
