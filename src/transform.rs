//! Node Compiler
//!
//! Lowers a parsed component template into an [`Expr`] tree. Dispatch is on
//! node kind: text goes through the token rule, element tags are routed to a
//! component call when the table knows the name, to the control tags
//! (`for`, `if`/`elseif`/`else`, `slot`), to raw handling for `script` and
//! `style`, and to a plain element build otherwise.

use crate::codegen::string_literal;
use crate::component::{CompInfo, ComponentTable};
use crate::config::is_identifier;
use crate::expr::{tokenize, tokens_to_expr, Token};
use crate::ir::{AttrExpr, Branch, Expr, FieldInit, FieldValue, FormatPart};
use crate::logger::Logger;
use crate::parse::{is_standard_tag, ElementNode, TemplateNode};
use crate::schema::{slot_key, PropSchema};

const DEFAULT_LOOP_BINDING: &str = "item";

/// Tags the compiler handles itself; they are never component calls.
pub const CONTROL_TAGS: &[&str] = &["for", "if", "elseif", "else", "slot"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    pub message: String,
}

impl TransformError {
    fn new(message: impl Into<String>) -> Self {
        TransformError {
            message: message.into(),
        }
    }
}

impl From<String> for TransformError {
    fn from(message: String) -> Self {
        TransformError::new(message)
    }
}

type Result<T> = std::result::Result<T, TransformError>;

/// Read-only state for compiling one component.
pub struct CompileContext<'a> {
    pub component: &'a str,
    pub schema: &'a PropSchema,
    pub table: &'a ComponentTable,
    pub logger: &'a dyn Logger,
}

/// Compile the whole template of a component into one expression.
pub fn compile_component(root: &TemplateNode, ctx: &CompileContext) -> Result<Expr> {
    let children = match root {
        TemplateNode::Document(doc) => compile_children(&doc.children, ctx)?,
        other => compile_node(other, ctx)?.into_iter().collect(),
    };
    Ok(Expr::join(children))
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISPATCH
// ═══════════════════════════════════════════════════════════════════════════════

/// Compile siblings in order. `if` consumes the `elseif`/`else` siblings that
/// follow it.
fn compile_children(nodes: &[TemplateNode], ctx: &CompileContext) -> Result<Vec<Expr>> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < nodes.len() {
        if let TemplateNode::Element(el) = &nodes[i] {
            match el.tag.as_str() {
                "if" => {
                    let (expr, consumed) = compile_if_chain(&nodes[i..], ctx)?;
                    out.push(expr);
                    i += consumed;
                    continue;
                }
                tag @ ("elseif" | "else") => {
                    return Err(TransformError::new(format!(
                        "<{}> without a preceding <if>",
                        tag
                    )));
                }
                _ => {}
            }
        }

        if let Some(expr) = compile_node(&nodes[i], ctx)? {
            out.push(expr);
        }
        i += 1;
    }

    Ok(out)
}

fn compile_node(node: &TemplateNode, ctx: &CompileContext) -> Result<Option<Expr>> {
    match node {
        TemplateNode::Document(doc) => Ok(Some(Expr::join(compile_children(&doc.children, ctx)?))),
        TemplateNode::Doctype(doctype) => Ok(Some(Expr::raw(format!("<!DOCTYPE {}>", doctype.name)))),
        TemplateNode::Text(text) => {
            let tokens = tokenize(&text.value, ctx.schema)?;
            Ok(tokens_to_expr(&tokens, false))
        }
        TemplateNode::Element(el) => compile_element(el, ctx).map(Some),
    }
}

fn compile_element(el: &ElementNode, ctx: &CompileContext) -> Result<Expr> {
    match el.tag.as_str() {
        "for" => compile_for(el, ctx),
        // Reached only for an `if` nested where no sibling list is walked.
        "if" => compile_if_chain(std::slice::from_ref(&TemplateNode::Element(el.clone())), ctx)
            .map(|(expr, _)| expr),
        "elseif" | "else" => Err(TransformError::new(format!(
            "<{}> without a preceding <if>",
            el.tag
        ))),
        "slot" => compile_slot_placeholder(el, ctx),
        tag => match ctx.table.get(tag) {
            Some(info) => compile_component_call(el, info, ctx),
            None if tag == "script" || tag == "style" => compile_raw_text_element(el, ctx),
            None => compile_standard_element(el, ctx),
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STANDARD ELEMENTS
// ═══════════════════════════════════════════════════════════════════════════════

fn compile_standard_element(el: &ElementNode, ctx: &CompileContext) -> Result<Expr> {
    if !is_standard_tag(&el.tag) && !el.tag.contains('-') {
        ctx.logger.warn(&format!(
            "{}: <{}> is neither an HTML tag nor a known component; emitting it as an element",
            ctx.component, el.tag
        ));
    }

    let mut attrs = Vec::with_capacity(el.attributes.len());
    for attr in &el.attributes {
        attrs.push(AttrExpr {
            name: attr.name.clone(),
            value: attribute_value(&attr.value, ctx)?,
        });
    }

    Ok(Expr::Element {
        tag: el.tag.clone(),
        attrs,
        children: compile_children(&el.children, ctx)?,
    })
}

fn attribute_value(value: &str, ctx: &CompileContext) -> Result<Expr> {
    let tokens = tokenize(value, ctx.schema)?;
    Ok(tokens_to_expr(&tokens, true).unwrap_or_else(|| Expr::raw("")))
}

/// `<script>` and `<style>` bodies are copied verbatim; their attributes
/// follow the usual rule.
fn compile_raw_text_element(el: &ElementNode, ctx: &CompileContext) -> Result<Expr> {
    let text: String = el
        .children
        .iter()
        .filter_map(|child| match child {
            TemplateNode::Text(t) => Some(t.value.as_str()),
            _ => None,
        })
        .collect();

    let mut attrs = Vec::with_capacity(el.attributes.len());
    for attr in &el.attributes {
        attrs.push(AttrExpr {
            name: attr.name.clone(),
            value: attribute_value(&attr.value, ctx)?,
        });
    }

    let children = if text.is_empty() {
        Vec::new()
    } else {
        vec![Expr::raw(text)]
    };

    Ok(Expr::Element {
        tag: el.tag.clone(),
        attrs,
        children,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT CALLS
// ═══════════════════════════════════════════════════════════════════════════════

fn compile_component_call(el: &ElementNode, info: &CompInfo, ctx: &CompileContext) -> Result<Expr> {
    let mut fields: Vec<FieldInit> = Vec::new();
    let mut attrs = Vec::new();

    for attr in &el.attributes {
        match info.field_for(&attr.name) {
            Some(field) => fields.push(FieldInit {
                field: field.to_string(),
                value: field_value(&attr.value, ctx)?,
            }),
            None => attrs.push(AttrExpr {
                name: attr.name.clone(),
                value: attribute_value(&attr.value, ctx)?,
            }),
        }
    }

    let mut rest = Vec::new();
    for child in &el.children {
        match child {
            TemplateNode::Element(slot) if slot.tag == "slot" => {
                let name = slot.attr("name").map(str::trim).unwrap_or("");
                if name.is_empty() {
                    return Err(TransformError::new(format!(
                        "<slot> passed to <{}> requires a name attribute",
                        info.name
                    )));
                }
                let Some(field) = info.field_for(&slot_key(name)) else {
                    ctx.logger.warn(&format!(
                        "{}: <{}> has no slot {:?}; the slot content is dropped",
                        ctx.component, info.name, name
                    ));
                    continue;
                };
                let value = Expr::join(compile_children(&slot.children, ctx)?);
                fields.push(FieldInit {
                    field: field.to_string(),
                    value: FieldValue::Node { expr: value },
                });
            }
            other if other.is_blank_text() => {}
            other => rest.push(other.clone()),
        }
    }
    let children = compile_children(&rest, ctx)?;

    fields.sort_by(|a, b| a.field.cmp(&b.field));
    if let Some(pair) = fields.windows(2).find(|w| w[0].field == w[1].field) {
        return Err(TransformError::new(format!(
            "<{}> field {} is set more than once",
            info.name, pair[0].field
        )));
    }

    Ok(Expr::Component {
        name: info.name.clone(),
        fields,
        attrs,
        children,
    })
}

/// Attribute value routed into a props struct field.
fn field_value(value: &str, ctx: &CompileContext) -> Result<FieldValue> {
    let tokens = tokenize(value, ctx.schema)?;
    let value = match tokens.as_slice() {
        [] => FieldValue::Literal {
            text: String::new(),
        },
        [Token::Literal(text)] => FieldValue::Literal { text: text.clone() },
        [Token::Code(code)] => FieldValue::Code { code: code.clone() },
        [Token::Lookup { source, key }] => FieldValue::Code {
            code: lookup_code(source, key),
        },
        many => FieldValue::Format {
            parts: many
                .iter()
                .map(|token| match token {
                    Token::Literal(text) => FormatPart::Text { text: text.clone() },
                    Token::Code(code) => FormatPart::Arg { code: code.clone() },
                    Token::Lookup { source, key } => FormatPart::Arg {
                        code: lookup_code(source, key),
                    },
                })
                .collect(),
        },
    };
    Ok(value)
}

fn lookup_code(source: &str, key: &str) -> String {
    format!("rt::lookup(&{}, {})", source, string_literal(key))
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTROL TAGS
// ═══════════════════════════════════════════════════════════════════════════════

/// The code of an attribute that must be exactly one `{expr}`.
fn single_expression(el: &ElementNode, attr: &str, ctx: &CompileContext) -> Result<String> {
    let Some(value) = el.attr(attr) else {
        return Err(TransformError::new(format!(
            "<{}> is missing the {} attribute",
            el.tag, attr
        )));
    };

    let tokens = tokenize(value, ctx.schema)?;
    let meaningful: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Literal(text) if text.trim().is_empty()))
        .collect();

    match meaningful.as_slice() {
        [token] => token.value_code().ok_or_else(|| {
            TransformError::new(format!(
                "<{}> {} must be a single {{expression}}, found {:?}",
                el.tag, attr, value
            ))
        }),
        _ => Err(TransformError::new(format!(
            "<{}> {} must be a single {{expression}}, found {:?}",
            el.tag, attr, value
        ))),
    }
}

fn compile_for(el: &ElementNode, ctx: &CompileContext) -> Result<Expr> {
    if el
        .attr("items")
        .map(|v| v.trim().trim_start_matches('{').trim_start().starts_with("$attrs."))
        .unwrap_or(false)
    {
        return Err(TransformError::new(
            "<for> cannot iterate over $attrs; only declared props and values may be iterated",
        ));
    }
    let items = single_expression(el, "items", ctx)?;

    let binding = el
        .attr("as")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LOOP_BINDING);
    if !is_binding_pattern(binding) {
        return Err(TransformError::new(format!(
            "<for> as={:?} must be an identifier or a parenthesized pattern",
            binding
        )));
    }

    Ok(Expr::For {
        items,
        binding: binding.to_string(),
        body: compile_children(&el.children, ctx)?,
    })
}

/// `row`, `(i, row)`, `(_, (k, v))`.
fn is_binding_pattern(s: &str) -> bool {
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        return split_top_level(inner)
            .iter()
            .all(|part| is_binding_pattern(part));
    }
    is_identifier(s)
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Compile an `if` and the `elseif`/`else` siblings that extend it. Returns
/// the expression and how many nodes were consumed.
fn compile_if_chain(nodes: &[TemplateNode], ctx: &CompileContext) -> Result<(Expr, usize)> {
    let Some(head) = nodes.first().and_then(TemplateNode::as_element) else {
        return Err(TransformError::new("expected <if>"));
    };

    let mut branches = vec![Branch {
        condition: single_expression(head, "condition", ctx)?,
        body: Expr::join(compile_children(&head.children, ctx)?),
    }];
    let mut otherwise = Expr::Empty;
    let mut consumed = 1;

    let mut j = 1;
    while j < nodes.len() {
        let node = &nodes[j];
        if node.is_blank_text() {
            j += 1;
            continue;
        }
        let Some(el) = node.as_element() else { break };
        match el.tag.as_str() {
            "elseif" => {
                branches.push(Branch {
                    condition: single_expression(el, "condition", ctx)?,
                    body: Expr::join(compile_children(&el.children, ctx)?),
                });
                j += 1;
                consumed = j;
            }
            "else" => {
                otherwise = Expr::join(compile_children(&el.children, ctx)?);
                j += 1;
                consumed = j;
                break;
            }
            _ => break,
        }
    }

    Ok((
        Expr::If {
            branches,
            otherwise: Box::new(otherwise),
        },
        consumed,
    ))
}

/// `<slot name="x">` inside the component's own body.
fn compile_slot_placeholder(el: &ElementNode, ctx: &CompileContext) -> Result<Expr> {
    let name = el.attr("name").map(str::trim).unwrap_or("");
    if name.is_empty() {
        return Err(TransformError::new("<slot> requires a name attribute"));
    }
    let field = ctx
        .schema
        .field_name(&slot_key(name))
        .ok_or_else(|| TransformError::new(format!("slot {:?} is not in the props", name)))?;
    Ok(Expr::SlotRef {
        field: field.to_string(),
    })
}
