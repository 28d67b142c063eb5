//! Small accessors over KDL nodes.

use kdl::KdlNode;

/// First positional argument as a string
pub fn get_first_arg_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(String::from)
}

/// All positional string arguments, in order
pub fn get_arg_strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(String::from)
        .collect()
}

/// Child node with the given name
pub fn get_child<'a>(node: &'a KdlNode, name: &str) -> Option<&'a KdlNode> {
    node.children()
        .and_then(|c| c.nodes().iter().find(|n| n.name().value() == name))
}

/// First argument of child `name` as a string, e.g. `api-base "https://..."`
pub fn get_string_entry(node: &KdlNode, name: &str) -> Option<String> {
    get_child(node, name).and_then(get_first_arg_string)
}

/// First argument of child `name` as an integer, e.g. `timeout-ms 5000`
pub fn get_int_entry(node: &KdlNode, name: &str) -> Option<i128> {
    get_child(node, name)
        .and_then(|n| n.entries().iter().find(|e| e.name().is_none()))
        .and_then(|e| e.value().as_integer())
}

/// First argument of child `name` as a boolean, e.g. `default-on #true`
pub fn get_bool_entry(node: &KdlNode, name: &str) -> Option<bool> {
    get_child(node, name)
        .and_then(|n| n.entries().iter().find(|e| e.name().is_none()))
        .and_then(|e| e.value().as_bool())
}
