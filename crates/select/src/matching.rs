//! Pre-condition Matching
//!
//! Tests a single element against the candidate-local conditions of a
//! query step.

use quarry_css::{AttributeOp, NamespaceMatch, PreCondition};
use quarry_dom::{DomTree, ElementData, NodeId};

use crate::eval::matches;

/// Elements that take part in the disabled/enabled model
const DISABLEABLE: &[&str] = &["button", "input", "select", "textarea", "optgroup", "option", "fieldset"];

/// Check every condition against an element
pub fn matches_conditions(
    tree: &DomTree,
    element_id: NodeId,
    conditions: &[PreCondition],
    case_sensitive: bool,
) -> bool {
    let Some(element) = tree.element(element_id) else {
        return false;
    };
    conditions
        .iter()
        .all(|c| matches_condition(tree, element_id, element, c, case_sensitive))
}

fn matches_condition(
    tree: &DomTree,
    element_id: NodeId,
    element: &ElementData,
    condition: &PreCondition,
    case_sensitive: bool,
) -> bool {
    let tag_is = |name: &str| tag_matches(element, name, case_sensitive);

    match condition {
        PreCondition::Type { namespace, name } => {
            let namespace_ok = match namespace {
                NamespaceMatch::Any => true,
                NamespaceMatch::None => element.namespace.is_none(),
                NamespaceMatch::Uri(uri) => element.namespace.as_deref() == Some(uri.as_str()),
            };
            namespace_ok && name.as_deref().map_or(true, |n| tag_is(n))
        }

        PreCondition::Id(id) => element.id() == Some(id.as_str()),

        PreCondition::Class(class) => element.has_class(class),

        PreCondition::Attribute { name, op, value, case_insensitive } => {
            let attr_value = if case_sensitive {
                element.get_attribute(name)
            } else {
                element.get_attribute_ignore_case(name)
            };
            matches_attribute(attr_value, op.as_ref(), value.as_deref(), *case_insensitive)
        }

        PreCondition::Root => tree.parent(element_id).is_none(),
        PreCondition::FirstChild => sibling_index(tree, element_id, false, false) == Some(1),
        PreCondition::LastChild => sibling_index(tree, element_id, true, false) == Some(1),
        PreCondition::OnlyChild => {
            sibling_index(tree, element_id, false, false) == Some(1)
                && sibling_index(tree, element_id, true, false) == Some(1)
        }
        PreCondition::FirstOfType => sibling_index(tree, element_id, false, true) == Some(1),
        PreCondition::LastOfType => sibling_index(tree, element_id, true, true) == Some(1),
        PreCondition::OnlyOfType => {
            sibling_index(tree, element_id, false, true) == Some(1)
                && sibling_index(tree, element_id, true, true) == Some(1)
        }
        PreCondition::Nth { a, b, from_end, of_type } => {
            match sibling_index(tree, element_id, *from_end, *of_type) {
                Some(n) => matches_an_plus_b(n as i32, *a, *b),
                None => false,
            }
        }

        PreCondition::Empty => {
            tree.children(element_id).is_empty() && tree.text(element_id).map_or(true, str::is_empty)
        }
        PreCondition::Parent => tree.children(element_id).iter().any(|&c| tree.is_element(c)),

        PreCondition::Checked => tag_is("input") && element.has_attribute("checked"),
        PreCondition::Selected => tag_is("option") && element.has_attribute("selected"),
        PreCondition::Disabled => is_disabled(tree, element_id, case_sensitive),
        PreCondition::Enabled => {
            DISABLEABLE.iter().any(|t| tag_is(t)) && !is_disabled(tree, element_id, case_sensitive)
        }
        PreCondition::InputType(kind) => {
            tag_is("input") && element.get_attribute("type") == Some(kind.as_str())
        }
        PreCondition::Button => {
            tag_is("button") || (tag_is("input") && element.get_attribute("type") == Some("button"))
        }
        PreCondition::Input => ["input", "select", "textarea", "button"].iter().any(|t| tag_is(t)),
        PreCondition::Header => ["h1", "h2", "h3", "h4", "h5", "h6"].iter().any(|t| tag_is(t)),
        PreCondition::Link => {
            element.has_attribute("href") && ["a", "link", "area"].iter().any(|t| tag_is(t))
        }
        PreCondition::Never => false,
        PreCondition::Not(query) => !matches(tree, element_id, query),
    }
}

/// Compare an element's name, ignoring any prefix on namespaced elements
fn tag_matches(element: &ElementData, name: &str, case_sensitive: bool) -> bool {
    let own = if element.namespace.is_some() {
        element.local_name()
    } else {
        element.tag_name.as_str()
    };
    if case_sensitive {
        own == name
    } else {
        own.eq_ignore_ascii_case(name)
    }
}

/// Match an attribute selector
fn matches_attribute(
    attr_value: Option<&str>,
    op: Option<&AttributeOp>,
    expected_value: Option<&str>,
    case_insensitive: bool,
) -> bool {
    let attr_value = match attr_value {
        Some(v) => v,
        None => return false,
    };

    let op = match op {
        Some(o) => o,
        None => return true,
    };

    let expected = match expected_value {
        Some(v) => v,
        None => return false,
    };

    let (attr_value, expected) = if case_insensitive {
        (attr_value.to_lowercase(), expected.to_lowercase())
    } else {
        (attr_value.to_string(), expected.to_string())
    };

    match op {
        AttributeOp::Equals => attr_value == expected,
        AttributeOp::Includes => {
            !expected.is_empty() && attr_value.split_ascii_whitespace().any(|w| w == expected)
        }
        AttributeOp::DashMatch => {
            attr_value == expected || attr_value.starts_with(&format!("{}-", expected))
        }
        AttributeOp::PrefixMatch => !expected.is_empty() && attr_value.starts_with(&expected),
        AttributeOp::SuffixMatch => !expected.is_empty() && attr_value.ends_with(&expected),
        AttributeOp::SubstringMatch => !expected.is_empty() && attr_value.contains(&expected),
    }
}

/// Form-control disabled state, including fieldset and optgroup inheritance
pub fn is_disabled(tree: &DomTree, element_id: NodeId, case_sensitive: bool) -> bool {
    let Some(element) = tree.element(element_id) else {
        return false;
    };
    let tag_is = |name: &str| tag_matches(element, name, case_sensitive);

    if !DISABLEABLE.iter().any(|t| tag_is(t)) {
        return false;
    }
    if element.has_attribute("disabled") {
        return true;
    }

    let ancestors = tree.ancestors(element_id);

    if tag_is("option") {
        return ancestors.iter().any(|&a| {
            tree.element(a).is_some_and(|e| {
                (tag_matches(e, "optgroup", case_sensitive) || tag_matches(e, "select", case_sensitive))
                    && e.has_attribute("disabled")
            })
        });
    }

    if !["button", "input", "select", "textarea"].iter().any(|t| tag_is(t)) {
        return false;
    }

    ancestors.iter().enumerate().any(|(depth, &a)| {
        let Some(fieldset) = tree.element(a) else {
            return false;
        };
        if !tag_matches(fieldset, "fieldset", case_sensitive) || !fieldset.has_attribute("disabled") {
            return false;
        }
        let first_legend = tree.children(a).iter().copied().find(|&c| {
            tree.element(c).is_some_and(|e| tag_matches(e, "legend", case_sensitive))
        });
        // ancestors[depth - 1] is the fieldset's child on the path to the element
        let in_first_legend = depth > 0 && first_legend == Some(ancestors[depth - 1]);
        !in_first_legend
    })
}

/// 1-based position among element siblings (optionally of the same type)
///
/// A parentless element counts as an only child.
fn sibling_index(tree: &DomTree, element_id: NodeId, from_end: bool, of_type: bool) -> Option<usize> {
    let Some(parent_id) = tree.parent(element_id) else {
        return tree.is_element(element_id).then_some(1);
    };

    let element = tree.element(element_id)?;
    let siblings: Vec<NodeId> = tree
        .children(parent_id)
        .iter()
        .copied()
        .filter(|&id| match tree.element(id) {
            Some(e) => !of_type || (e.tag_name == element.tag_name && e.namespace == element.namespace),
            None => false,
        })
        .collect();

    let index = if from_end {
        siblings.iter().rev().position(|&id| id == element_id)
    } else {
        siblings.iter().position(|&id| id == element_id)
    };

    index.map(|i| i + 1)
}

/// Check if index matches an+b formula
fn matches_an_plus_b(index: i32, a: i32, b: i32) -> bool {
    if a == 0 {
        return index == b;
    }

    let diff = index - b;
    if a > 0 {
        diff >= 0 && diff % a == 0
    } else {
        diff <= 0 && diff % a == 0
    }
}
