//! Structural checks on the preprocessed token stream.

use shade_model::SourcePosition;

use crate::lexer::{LexKind, Token};

/// A validation problem at a surface position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub pos: SourcePosition,
    pub message: String,
}

impl Problem {
    fn new(pos: SourcePosition, message: impl Into<String>) -> Self {
        Self {
            pos,
            message: message.into(),
        }
    }
}

/// Checks bracket balance, stray string literals and the presence of the
/// entry point `entry` as a top-level function.
pub fn validate(tokens: &[Token], entry: &str) -> Vec<Problem> {
    let mut problems = Vec::new();
    let mut open: Vec<&Token> = Vec::new();
    let mut entry_found = false;

    for (index, token) in tokens.iter().enumerate() {
        match token.kind {
            LexKind::Str => {
                problems.push(Problem::new(token.pos, "string literals are not allowed here"));
            }
            LexKind::Punct => match token.text.as_str() {
                "(" | "[" | "{" => open.push(token),
                ")" | "]" | "}" => {
                    let expected = match token.text.as_str() {
                        ")" => "(",
                        "]" => "[",
                        _ => "{",
                    };
                    match open.pop() {
                        Some(opener) if opener.text == expected => {}
                        Some(opener) => problems.push(Problem::new(
                            token.pos,
                            format!("'{}' does not close '{}'", token.text, opener.text),
                        )),
                        None => problems.push(Problem::new(
                            token.pos,
                            format!("unmatched '{}'", token.text),
                        )),
                    }
                }
                _ => {}
            },
            LexKind::Ident => {
                let top_level = open.is_empty();
                let called = tokens.get(index + 1).is_some_and(|next| next.is_punct("("));
                let typed = index > 0 && tokens[index - 1].kind == LexKind::Ident;
                if top_level && called && typed && token.text == entry {
                    entry_found = true;
                }
            }
            LexKind::Number => {}
        }
    }

    for opener in open {
        problems.push(Problem::new(
            opener.pos,
            format!("unclosed '{}'", opener.text),
        ));
    }
    if !entry_found {
        let pos = tokens
            .first()
            .map_or(SourcePosition::new(0, 1, 0), |token| token.pos);
        problems.push(Problem::new(
            pos,
            format!("entry point '{entry}' is not defined"),
        ));
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn check(source: &str, entry: &str) -> Vec<String> {
        let (tokens, _) = tokenize(source, 0, "t");
        validate(&tokens, entry)
            .into_iter()
            .map(|problem| format!("{}: {}", problem.pos, problem.message))
            .collect()
    }

    #[test]
    fn accepts_a_well_formed_shader() {
        assert!(check("void main() { x[0] = f(1); }", "main").is_empty());
    }

    #[test]
    fn reports_bracket_problems() {
        assert_eq!(
            check("void main() { x = (1; }", "main"),
            vec!["1:22: '}' does not close '('", "1:12: unclosed '{'"]
        );
        assert_eq!(check("void main() {} )", "main"), vec!["1:15: unmatched ')'"]);
    }

    #[test]
    fn requires_the_entry_point() {
        assert_eq!(
            check("float4 frag() { return x; }", "main"),
            vec!["1:0: entry point 'main' is not defined"]
        );
        assert!(check("float4 frag() { return x; }", "frag").is_empty());
        // A call inside a body is not a definition.
        assert_eq!(check("void f() { main(); }", "main").len(), 1);
    }
}
