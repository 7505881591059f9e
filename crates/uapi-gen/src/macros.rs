//! Macro definition emitter.
//!
//! Macro bodies are rewritten token by token: identifiers found in the
//! [`NameMapping`] are replaced, everything else is kept as spelled. The body
//! is never re-parsed as C.

use crate::error::{GenError, Result};
use crate::names::{NameMapping, MACRO_PREFIX};
use crate::writer::CodeWriter;
use uapi_ast::{DeclNode, NodeKind, Token};

/// Writes `#define UAPI_<name> <body>` lines.
pub struct MacroEmitter<'a> {
    names: &'a NameMapping,
}

impl<'a> MacroEmitter<'a> {
    pub fn new(names: &'a NameMapping) -> Self {
        Self { names }
    }

    pub fn emit(&self, w: &mut CodeWriter, node: &DeclNode) -> Result<()> {
        let line = self.render(node)?;
        w.writeln(&line);
        Ok(())
    }

    /// Render the `#define` line for a macro definition.
    pub fn render(&self, node: &DeclNode) -> Result<String> {
        if node.kind != NodeKind::MacroDefinition {
            return Err(GenError::UnexpectedKind {
                expected: "a macro definition",
                found: node.kind,
                name: node.name.to_string(),
            });
        }

        // The first token is the macro name itself.
        let tokens: Vec<&Token> = node.extent_tokens().skip(1).collect();
        let mut line = format!("#define {MACRO_PREFIX}{}", node.name);

        let mut params: Vec<&str> = Vec::new();
        let mut body = &tokens[..];
        if node.function_like && tokens.first().is_some_and(|t| t.is_punct("(")) {
            if let Some(close) = tokens.iter().position(|t| t.is_punct(")")) {
                line.push('(');
                for token in &tokens[1..close] {
                    if token.is_punct(",") {
                        line.push_str(", ");
                    } else {
                        if token.is_identifier() {
                            params.push(token.spelling.as_str());
                        }
                        line.push_str(&token.spelling);
                    }
                }
                line.push(')');
                body = &tokens[close + 1..];
            }
        }

        let rewritten: Vec<&str> = body
            .iter()
            .enumerate()
            .map(|(i, token)| self.substitute(body, i, &params, token))
            .collect();
        let text = join_tokens(body, &rewritten);
        let text = text.trim();

        if !text.is_empty() {
            line.push(' ');
            line.push_str(text);
        }
        Ok(line)
    }

    fn substitute<'t>(&'t self, body: &[&Token], i: usize, params: &[&str], token: &'t Token) -> &'t str {
        let spelling = token.spelling.as_str();
        if !token.is_identifier() || params.contains(&spelling) {
            return spelling;
        }

        // Operands of # and ## are pasted or stringified, not expanded.
        let after_operator = i > 0 && (body[i - 1].is_punct("#") || body[i - 1].is_punct("##"));
        let before_paste = body.get(i + 1).is_some_and(|next| next.is_punct("##"));
        if after_operator || before_paste {
            return spelling;
        }

        self.names.rename(spelling)
    }
}

/// Join rewritten token spellings with single spaces, dropping the space
/// inside brackets, before commas and between a name and its argument list.
fn join_tokens(tokens: &[&Token], spellings: &[&str]) -> String {
    let mut out = String::new();
    for (i, spelling) in spellings.iter().enumerate() {
        if i > 0 && needs_space(tokens[i - 1], tokens[i]) {
            out.push(' ');
        }
        out.push_str(spelling);
    }
    out
}

fn needs_space(prev: &Token, next: &Token) -> bool {
    if prev.is_punct("(") || prev.is_punct("[") {
        return false;
    }
    if next.is_punct(")") || next.is_punct("]") || next.is_punct(",") {
        return false;
    }
    if next.is_punct("(") || next.is_punct("[") {
        return !(prev.is_identifier() || prev.spelling == "sizeof");
    }
    true
}
