//! Expression tree produced by the node compiler.
//!
//! Every variant corresponds to one construct of the generated code; the tree
//! is turned into source text only by [`crate::codegen`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expr {
    /// `rt::Node::Empty`
    Empty,
    /// Pre-escaped markup, `rt::raw("...")`.
    Raw { html: String },
    /// A template expression placed as a node, `rt::node(&(code))`.
    Value { code: String },
    /// `rt::lookup(&source, "key")`
    Lookup { source: String, key: String },
    /// `rt::fragment(vec![...])`
    Fragment { children: Vec<Expr> },
    /// `rt::element(tag, attrs, children)`
    Element {
        tag: String,
        attrs: Vec<AttrExpr>,
        children: Vec<Expr>,
    },
    /// `<Name>Comp(<Name> { fields.., ..Default::default() }, attrs, children)`
    Component {
        name: String,
        fields: Vec<FieldInit>,
        attrs: Vec<AttrExpr>,
        children: Vec<Expr>,
    },
    /// A block iterating `&(items)` that collects `body` per iteration.
    For {
        items: String,
        binding: String,
        body: Vec<Expr>,
    },
    /// `if c1 { .. } else if c2 { .. } else { .. }`
    If {
        branches: Vec<Branch>,
        otherwise: Box<Expr>,
    },
    /// The caller-supplied content of a slot, `rt::node(&props.<field>)`.
    SlotRef { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrExpr {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub condition: String,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInit {
    pub field: String,
    pub value: FieldValue,
}

/// Right-hand side of a props struct field initializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldValue {
    /// `"text".into()`
    Literal { text: String },
    /// `(code).clone().into()`
    Code { code: String },
    /// `format!(..).into()` over literal text and expressions.
    Format { parts: Vec<FormatPart> },
    /// A node built at the call site, used for slot fills.
    Node { expr: Expr },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FormatPart {
    Text { text: String },
    /// Any `Display` value.
    Arg { code: String },
}

impl Expr {
    /// Collapse a list of siblings: nothing is `Empty`, one is itself.
    pub fn join(mut children: Vec<Expr>) -> Expr {
        match children.len() {
            0 => Expr::Empty,
            1 => children.remove(0),
            _ => Expr::Fragment { children },
        }
    }

    pub fn raw(html: impl Into<String>) -> Expr {
        Expr::Raw { html: html.into() }
    }

    pub fn value(code: impl Into<String>) -> Expr {
        Expr::Value { code: code.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join() {
        assert_eq!(Expr::join(vec![]), Expr::Empty);
        assert_eq!(Expr::join(vec![Expr::raw("a")]), Expr::raw("a"));
        assert!(matches!(
            Expr::join(vec![Expr::raw("a"), Expr::value("b")]),
            Expr::Fragment { children } if children.len() == 2
        ));
    }

    #[test]
    fn test_tree_serializes_with_kind_tags() {
        let expr = Expr::Element {
            tag: "p".into(),
            attrs: vec![],
            children: vec![Expr::value("props.Name")],
        };
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json["kind"], "element");
        assert_eq!(json["children"][0]["kind"], "value");
        assert_eq!(json["children"][0]["code"], "props.Name");
    }
}
