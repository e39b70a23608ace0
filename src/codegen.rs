//! Codegen module for htmlc
//!
//! Prints an [`Expr`] tree as Rust source. This is the only place generated
//! code is spelled out; the output is one expression and is left to
//! `rustfmt` for layout.

use crate::ir::{AttrExpr, Branch, Expr, FieldInit, FieldValue, FormatPart};

/// Name of the per-loop accumulator in generated code.
const LOOP_ACCUMULATOR: &str = "__items";

/// Rust string literal for `s`.
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

pub fn print_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(expr, &mut out);
    out
}

fn write_expr(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Empty => out.push_str("rt::Node::Empty"),

        Expr::Raw { html } => {
            out.push_str("rt::raw(");
            out.push_str(&string_literal(html));
            out.push(')');
        }

        Expr::Value { code } => {
            out.push_str("rt::node(&(");
            out.push_str(code);
            out.push_str("))");
        }

        Expr::Lookup { source, key } => {
            out.push_str("rt::lookup(&");
            out.push_str(source);
            out.push_str(", ");
            out.push_str(&string_literal(key));
            out.push(')');
        }

        Expr::Fragment { children } => {
            out.push_str("rt::fragment(");
            write_vec(children, out);
            out.push(')');
        }

        Expr::Element {
            tag,
            attrs,
            children,
        } => {
            out.push_str("rt::element(");
            out.push_str(&string_literal(tag));
            out.push_str(", ");
            write_attrs(attrs, out);
            out.push_str(", ");
            write_vec(children, out);
            out.push(')');
        }

        Expr::Component {
            name,
            fields,
            attrs,
            children,
        } => {
            out.push_str(name);
            out.push_str("Comp(");
            write_props_literal(name, fields, out);
            out.push_str(", ");
            write_attrs(attrs, out);
            out.push_str(", ");
            write_vec(children, out);
            out.push(')');
        }

        Expr::For {
            items,
            binding,
            body,
        } => {
            out.push_str(&format!(
                "{{ let mut {acc}: Vec<rt::Node> = Vec::new(); for {} in &({}) {{ ",
                binding,
                items,
                acc = LOOP_ACCUMULATOR
            ));
            for child in body {
                out.push_str(LOOP_ACCUMULATOR);
                out.push_str(".push(");
                write_expr(child, out);
                out.push_str("); ");
            }
            out.push_str(&format!("}} rt::fragment({}) }}", LOOP_ACCUMULATOR));
        }

        Expr::If {
            branches,
            otherwise,
        } => {
            for (i, Branch { condition, body }) in branches.iter().enumerate() {
                if i > 0 {
                    out.push_str(" else ");
                }
                out.push_str("if (");
                out.push_str(condition);
                out.push_str(") { ");
                write_expr(body, out);
                out.push_str(" }");
            }
            out.push_str(" else { ");
            write_expr(otherwise, out);
            out.push_str(" }");
        }

        Expr::SlotRef { field } => {
            out.push_str("rt::node(&props.");
            out.push_str(field);
            out.push(')');
        }
    }
}

fn write_vec(items: &[Expr], out: &mut String) {
    out.push_str("vec![");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_expr(item, out);
    }
    out.push(']');
}

fn write_attrs(attrs: &[AttrExpr], out: &mut String) {
    if attrs.is_empty() {
        out.push_str("rt::Attrs::new()");
        return;
    }
    out.push_str("rt::attrs(vec![");
    for (i, attr) in attrs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push('(');
        out.push_str(&string_literal(&attr.name));
        out.push_str(", ");
        write_expr(&attr.value, out);
        out.push(')');
    }
    out.push_str("])");
}

fn write_props_literal(name: &str, fields: &[FieldInit], out: &mut String) {
    if fields.is_empty() {
        out.push_str(name);
        out.push_str("::default()");
        return;
    }
    out.push_str(name);
    out.push_str(" { ");
    for field in fields {
        out.push_str(&field.field);
        out.push_str(": ");
        write_field_value(&field.value, out);
        out.push_str(", ");
    }
    out.push_str("..Default::default() }");
}

fn write_field_value(value: &FieldValue, out: &mut String) {
    match value {
        FieldValue::Literal { text } => {
            out.push_str(&string_literal(text));
            out.push_str(".into()");
        }
        FieldValue::Code { code } => {
            out.push('(');
            out.push_str(code);
            out.push_str(").clone().into()");
        }
        FieldValue::Format { parts } => {
            let mut template = String::new();
            let mut args = Vec::new();
            for part in parts {
                match part {
                    FormatPart::Text { text } => {
                        template.push_str(&text.replace('{', "{{").replace('}', "}}"))
                    }
                    FormatPart::Arg { code } => {
                        template.push_str("{}");
                        args.push(code.as_str());
                    }
                }
            }
            out.push_str("format!(");
            out.push_str(&string_literal(&template));
            for arg in args {
                out.push_str(", ");
                out.push_str(arg);
            }
            out.push_str(").into()");
        }
        FieldValue::Node { expr } => write_expr(expr, out),
    }
}
