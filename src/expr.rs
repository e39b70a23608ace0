//! Text-token rule and expression rewrites.
//!
//! Text and attribute values are split on single-level `{expr}` spans into
//! literal and expression tokens. Expression text is target code and passes
//! through untouched except for two rewrites:
//!
//! - `props.field` becomes `props.Field`, the canonical struct field name;
//! - `$name.key` becomes a keyed lookup on `name`.
//!
//! Templates are authored at build time and their expressions are trusted
//! code. The one place user text is spliced into generated code as data is the
//! `key` of `$name.key`, and it is always emitted as an escaped string literal.

use lazy_static::lazy_static;
use regex::Regex;

use crate::codegen::string_literal;
use crate::config::is_identifier;
use crate::ir::Expr;
use crate::parse::BRACED_EXPR_RE;
use crate::schema::{capitalize, PropSchema};

lazy_static! {
    static ref PROPS_FIELD_RE: Regex = Regex::new(r"\bprops\.([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Code(String),
    Lookup { source: String, key: String },
}

impl Token {
    /// Code evaluating to the token's value, for positions that need a plain
    /// value rather than a node (loop sources, conditions).
    pub fn value_code(&self) -> Option<String> {
        match self {
            Token::Literal(_) => None,
            Token::Code(code) => Some(code.clone()),
            Token::Lookup { source, key } => Some(format!("{}[{}]", source, string_literal(key))),
        }
    }

    /// The token as a node expression. `in_attr` selects attribute escaping for
    /// literals.
    pub fn to_expr(&self, in_attr: bool) -> Expr {
        match self {
            Token::Literal(text) => Expr::raw(escape_literal(text, in_attr)),
            Token::Code(code) => Expr::value(code.clone()),
            Token::Lookup { source, key } => Expr::Lookup {
                source: source.clone(),
                key: key.clone(),
            },
        }
    }
}

/// Split `text` into tokens, applying the rewrites to expression spans.
///
/// `{}` spans contribute nothing. `{{ … }}` is kept as literal text.
pub fn tokenize(text: &str, schema: &PropSchema) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut last = 0;

    for caps in BRACED_EXPR_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let (start, end) = (whole.start(), whole.end());

        let doubled = text[..start].ends_with('{') && text[end..].starts_with('}');
        literal.push_str(&text[last..start]);
        if doubled {
            literal.push_str(whole.as_str());
        } else {
            let inner = caps[1].trim();
            if !inner.is_empty() {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(rewrite(inner, schema)?);
            }
        }
        last = end;
    }

    literal.push_str(&text[last..]);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    Ok(tokens)
}

/// Apply the `$name.key` and `props.field` rewrites to one expression.
pub fn rewrite(code: &str, schema: &PropSchema) -> Result<Token, String> {
    if let Some(rest) = code.strip_prefix('$') {
        let Some((source, key)) = rest.split_once('.') else {
            return Err(format!("expected `$name.key`, found {:?}", code));
        };
        if !is_identifier(source) {
            return Err(format!("{:?} is not a valid lookup source", source));
        }
        if key.is_empty() {
            return Err(format!("lookup {:?} has an empty key", code));
        }
        return Ok(Token::Lookup {
            source: source.to_string(),
            key: key.to_string(),
        });
    }
    Ok(Token::Code(canonicalize_props(code, schema)))
}

/// `props.title` → `props.Title`, using the schema's field name when the key
/// is declared.
pub fn canonicalize_props(code: &str, schema: &PropSchema) -> String {
    PROPS_FIELD_RE
        .replace_all(code, |caps: &regex::Captures| {
            let key = &caps[1];
            let field = schema
                .field_name(key)
                .map(str::to_string)
                .unwrap_or_else(|| capitalize(key));
            format!("props.{}", field)
        })
        .into_owned()
}

/// Tokens as one node: nothing, the single token, or a fragment.
pub fn tokens_to_expr(tokens: &[Token], in_attr: bool) -> Option<Expr> {
    match tokens.len() {
        0 => None,
        1 => Some(tokens[0].to_expr(in_attr)),
        _ => Some(Expr::Fragment {
            children: tokens.iter().map(|t| t.to_expr(in_attr)).collect(),
        }),
    }
}

/// Escape literal template text. The HTML parser has already decoded
/// entities, so they are re-encoded here.
pub fn escape_literal(text: &str, in_attr: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if in_attr => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}
