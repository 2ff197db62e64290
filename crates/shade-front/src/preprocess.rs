//! Preprocessor: conditionals, object-like macros, includes and the
//! `#version`/`#extension` directives that are forwarded into the IR.

use std::collections::HashMap;

use shade_model::{Define, Diagnostic, DiagnosticOrigin, Location, SourcePosition};
use tracing::debug;

use crate::include::Includer;
use crate::lexer::{LexKind, Token, tokenize};

/// Nesting limit for `#include`.
pub const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionDirective {
    pub number: u32,
    pub es: bool,
    pub pos: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDirective {
    pub text: String,
    pub pos: SourcePosition,
}

/// Output of preprocessing one translation unit.
#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    pub tokens: Vec<Token>,
    pub version: Option<VersionDirective>,
    pub extensions: Vec<ExtensionDirective>,
    /// The main file first, then includes in the order they were entered.
    pub sources: Vec<SourceFile>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
struct Conditional {
    pos: SourcePosition,
    active: bool,
    taken: bool,
    parent_active: bool,
    seen_else: bool,
}

pub struct Preprocessor<'a> {
    includer: &'a dyn Includer,
    macros: HashMap<String, Vec<Token>>,
    out: Preprocessed,
}

impl<'a> Preprocessor<'a> {
    pub fn new(includer: &'a dyn Includer) -> Self {
        Self {
            includer,
            macros: HashMap::new(),
            out: Preprocessed::default(),
        }
    }

    /// Predefines an object-like macro. A define without a value expands
    /// to `1`.
    pub fn define(&mut self, define: &Define) {
        let value = define.value.as_deref().unwrap_or("1");
        let (body, _) = tokenize(value, 0, "<command line>");
        self.macros.insert(define.name.clone(), body);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn run(mut self, name: &str, content: &str) -> Preprocessed {
        self.out.sources.push(SourceFile {
            name: name.to_string(),
            content: content.to_string(),
        });
        self.process_file(0, 0);
        self.out
    }

    fn process_file(&mut self, file: u32, depth: usize) {
        let source = &self.out.sources[file as usize];
        let (tokens, diagnostics) = tokenize(&source.content, file, &source.name);
        self.out.diagnostics.extend(diagnostics);

        let mut conditions: Vec<Conditional> = Vec::new();
        let mut index = 0;
        while index < tokens.len() {
            let token = &tokens[index];
            if token.line_start && token.is_punct("#") {
                let end = tokens[index + 1..]
                    .iter()
                    .position(|token| token.line_start)
                    .map_or(tokens.len(), |offset| index + 1 + offset);
                self.directive(token.pos, &tokens[index + 1..end], &mut conditions, depth);
                index = end;
                continue;
            }
            if is_active(&conditions) {
                let mut expanded = Vec::new();
                self.expand(token, token.pos, &mut expanded, &mut Vec::new());
                self.out.tokens.extend(expanded);
            }
            index += 1;
        }

        for conditional in conditions {
            self.error(conditional.pos, "unterminated conditional directive");
        }
    }

    fn directive(
        &mut self,
        hash: SourcePosition,
        rest: &[Token],
        conditions: &mut Vec<Conditional>,
        depth: usize,
    ) {
        let Some(name) = rest.first() else {
            return;
        };
        let args = &rest[1..];
        let parent_active = is_active(conditions);

        match name.text.as_str() {
            "ifdef" | "ifndef" => {
                let defined = match args.first() {
                    Some(arg) if arg.kind == LexKind::Ident => self.is_defined(&arg.text),
                    _ => {
                        if parent_active {
                            self.error(name.pos, format!("#{} expects a macro name", name.text));
                        }
                        false
                    }
                };
                let value = defined == (name.text == "ifdef");
                conditions.push(Conditional {
                    pos: hash,
                    active: parent_active && value,
                    taken: value,
                    parent_active,
                    seen_else: false,
                });
            }
            "if" => {
                let value = parent_active && self.condition(name.pos, args);
                conditions.push(Conditional {
                    pos: hash,
                    active: value,
                    taken: value,
                    parent_active,
                    seen_else: false,
                });
            }
            "elif" => {
                let Some(top) = conditions.last() else {
                    self.error(hash, "#elif without #if");
                    return;
                };
                if top.seen_else {
                    self.error(hash, "#elif after #else");
                }
                let evaluate = top.parent_active && !top.taken;
                let value = evaluate && self.condition(name.pos, args);
                if let Some(top) = conditions.last_mut() {
                    top.active = value;
                    top.taken |= value;
                }
            }
            "else" => match conditions.last_mut() {
                Some(top) if !top.seen_else => {
                    top.active = top.parent_active && !top.taken;
                    top.taken = true;
                    top.seen_else = true;
                }
                Some(_) => self.error(hash, "#else after #else"),
                None => self.error(hash, "#else without #if"),
            },
            "endif" => {
                if conditions.pop().is_none() {
                    self.error(hash, "#endif without #if");
                }
            }
            _ if !parent_active => {}
            "define" => self.define_directive(name.pos, args),
            "undef" => match args.first() {
                Some(arg) if arg.kind == LexKind::Ident => {
                    self.macros.remove(&arg.text);
                }
                _ => self.error(name.pos, "#undef expects a macro name"),
            },
            "include" => self.include(name.pos, args, depth),
            "version" => self.version(hash, args),
            "extension" => {
                let text = args
                    .iter()
                    .map(|token| token.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                if text.is_empty() {
                    self.error(name.pos, "#extension expects an extension name");
                } else {
                    self.out.extensions.push(ExtensionDirective { text, pos: hash });
                }
            }
            "pragma" => {
                debug!(line = hash.line, "ignoring #pragma");
            }
            "error" => {
                let message = args
                    .iter()
                    .map(|token| token.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                self.error(hash, format!("#error {message}"));
            }
            other => self.error(name.pos, format!("unknown preprocessor directive #{other}")),
        }
    }

    fn define_directive(&mut self, pos: SourcePosition, args: &[Token]) {
        let Some(name) = args.first().filter(|token| token.kind == LexKind::Ident) else {
            self.error(pos, "#define expects a macro name");
            return;
        };
        let body = &args[1..];
        if let Some(open) = body.first()
            && open.is_punct("(")
            && open.pos.line == name.pos.line
            && open.pos.column as usize == name.pos.column as usize + name.text.len()
        {
            self.error(name.pos, "function-like macros are not supported");
            return;
        }
        let body = body.to_vec();
        if let Some(previous) = self.macros.get(&name.text)
            && !same_text(previous, &body)
        {
            self.warning(name.pos, format!("macro {} redefined", name.text));
        }
        self.macros.insert(name.text.clone(), body);
    }

    fn include(&mut self, pos: SourcePosition, args: &[Token], depth: usize) {
        let Some(requested) = args.first().filter(|token| token.kind == LexKind::Str) else {
            self.error(pos, "#include expects \"file\"");
            return;
        };
        if depth + 1 > MAX_INCLUDE_DEPTH {
            self.error(
                pos,
                format!("#include nested deeper than {MAX_INCLUDE_DEPTH} levels"),
            );
            return;
        }
        let includer_name = self.out.sources[pos.file as usize].name.clone();
        match self.includer.include(&requested.text, &includer_name) {
            Ok(included) => {
                let index = self.out.sources.len() as u32;
                debug!(file = %included.name, depth = depth + 1, "entering include");
                self.out.sources.push(SourceFile {
                    name: included.name,
                    content: included.content,
                });
                self.process_file(index, depth + 1);
            }
            Err(message) => self.error(requested.pos, message),
        }
    }

    fn version(&mut self, hash: SourcePosition, args: &[Token]) {
        let number = args
            .first()
            .filter(|token| token.kind == LexKind::Number)
            .and_then(|token| token.text.parse::<u32>().ok());
        let Some(number) = number else {
            self.error(hash, "#version expects a version number");
            return;
        };
        if self.out.version.is_some() {
            self.error(hash, "#version may only appear once");
            return;
        }
        let es = args.get(1).is_some_and(|token| token.is_ident("es"));
        self.out.version = Some(VersionDirective {
            number,
            es,
            pos: hash,
        });
    }

    /// Expands `token` at `site`, recursively replacing defined macros.
    fn expand(
        &self,
        token: &Token,
        site: SourcePosition,
        out: &mut Vec<Token>,
        expanding: &mut Vec<String>,
    ) {
        if token.kind == LexKind::Ident
            && !expanding.contains(&token.text)
            && let Some(body) = self.macros.get(&token.text)
        {
            expanding.push(token.text.clone());
            for inner in body {
                self.expand(inner, site, out, expanding);
            }
            expanding.pop();
            return;
        }
        out.push(Token {
            pos: site,
            ..token.clone()
        });
    }

    fn condition(&mut self, pos: SourcePosition, tokens: &[Token]) -> bool {
        let mut resolved = Vec::new();
        let mut index = 0;
        while index < tokens.len() {
            let token = &tokens[index];
            if token.is_ident("defined") {
                let (name, consumed) = match tokens.get(index + 1) {
                    Some(open) if open.is_punct("(") => {
                        let closed = tokens.get(index + 3).is_some_and(|t| t.is_punct(")"));
                        (tokens.get(index + 2).filter(|_| closed), 4)
                    }
                    other => (other, 2),
                };
                let Some(name) = name.filter(|name| name.kind == LexKind::Ident) else {
                    self.error(token.pos, "defined expects a macro name");
                    return false;
                };
                let value = if self.is_defined(&name.text) { "1" } else { "0" };
                resolved.push(Token {
                    kind: LexKind::Number,
                    text: value.to_string(),
                    ..token.clone()
                });
                index += consumed;
                continue;
            }
            self.expand(token, token.pos, &mut resolved, &mut Vec::new());
            index += 1;
        }

        let mut parser = ExprParser {
            tokens: &resolved,
            index: 0,
        };
        let result = parser.parse_or().and_then(|value| match parser.peek() {
            Some(extra) => Err(format!("unexpected '{}' in #if expression", extra.text)),
            None => Ok(value),
        });
        match result {
            Ok(value) => value != 0,
            Err(message) => {
                self.error(pos, message);
                false
            }
        }
    }

    fn location(&self, pos: SourcePosition) -> Location {
        let file = self
            .out
            .sources
            .get(pos.file as usize)
            .map_or("<unknown>", |source| source.name.as_str());
        Location::new(file, pos.line, pos.column)
    }

    fn error(&mut self, pos: SourcePosition, message: impl Into<String>) {
        let location = self.location(pos);
        self.out
            .diagnostics
            .push(Diagnostic::error(DiagnosticOrigin::FrontEnd, message).at(location));
    }

    fn warning(&mut self, pos: SourcePosition, message: impl Into<String>) {
        let location = self.location(pos);
        self.out
            .diagnostics
            .push(Diagnostic::warning(DiagnosticOrigin::FrontEnd, message).at(location));
    }
}

fn is_active(conditions: &[Conditional]) -> bool {
    conditions.last().is_none_or(|top| top.active)
}

fn same_text(a: &[Token], b: &[Token]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.text == y.text)
}

/// Integer expression evaluator for `#if`/`#elif`. Identifiers left after
/// macro expansion evaluate to zero.
struct ExprParser<'t> {
    tokens: &'t [Token],
    index: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn eat(&mut self, op: &str) -> bool {
        if self.peek().is_some_and(|token| token.is_punct(op)) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<i64, String> {
        let mut value = self.parse_and()?;
        while self.eat("||") {
            let rhs = self.parse_and()?;
            value = i64::from(value != 0 || rhs != 0);
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<i64, String> {
        let mut value = self.parse_equality()?;
        while self.eat("&&") {
            let rhs = self.parse_equality()?;
            value = i64::from(value != 0 && rhs != 0);
        }
        Ok(value)
    }

    fn parse_equality(&mut self) -> Result<i64, String> {
        let mut value = self.parse_relational()?;
        loop {
            if self.eat("==") {
                value = i64::from(value == self.parse_relational()?);
            } else if self.eat("!=") {
                value = i64::from(value != self.parse_relational()?);
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_relational(&mut self) -> Result<i64, String> {
        let mut value = self.parse_additive()?;
        loop {
            if self.eat("<=") {
                value = i64::from(value <= self.parse_additive()?);
            } else if self.eat(">=") {
                value = i64::from(value >= self.parse_additive()?);
            } else if self.eat("<") {
                value = i64::from(value < self.parse_additive()?);
            } else if self.eat(">") {
                value = i64::from(value > self.parse_additive()?);
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_additive(&mut self) -> Result<i64, String> {
        let mut value = self.parse_multiplicative()?;
        loop {
            if self.eat("+") {
                value = value.wrapping_add(self.parse_multiplicative()?);
            } else if self.eat("-") {
                value = value.wrapping_sub(self.parse_multiplicative()?);
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_multiplicative(&mut self) -> Result<i64, String> {
        let mut value = self.parse_unary()?;
        loop {
            if self.eat("*") {
                value = value.wrapping_mul(self.parse_unary()?);
            } else if self.eat("/") || self.eat("%") {
                let remainder = self.tokens[self.index - 1].text == "%";
                let rhs = self.parse_unary()?;
                if rhs == 0 {
                    return Err("division by zero in #if expression".to_string());
                }
                value = if remainder {
                    value.wrapping_rem(rhs)
                } else {
                    value.wrapping_div(rhs)
                };
            } else {
                return Ok(value);
            }
        }
    }

    fn parse_unary(&mut self) -> Result<i64, String> {
        if self.eat("!") {
            return Ok(i64::from(self.parse_unary()? == 0));
        }
        if self.eat("-") {
            return Ok(self.parse_unary()?.wrapping_neg());
        }
        if self.eat("+") {
            return self.parse_unary();
        }
        if self.eat("~") {
            return Ok(!self.parse_unary()?);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<i64, String> {
        if self.eat("(") {
            let value = self.parse_or()?;
            if !self.eat(")") {
                return Err("missing ')' in #if expression".to_string());
            }
            return Ok(value);
        }
        let Some(token) = self.peek() else {
            return Err("unexpected end of #if expression".to_string());
        };
        let value = match token.kind {
            LexKind::Number => parse_integer(&token.text)
                .ok_or_else(|| format!("invalid integer '{}' in #if expression", token.text))?,
            LexKind::Ident => 0,
            _ => return Err(format!("unexpected '{}' in #if expression", token.text)),
        };
        self.index += 1;
        Ok(value)
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => digits.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::include::{MemoryIncluder, NullIncluder};

    fn run(source: &str) -> Preprocessed {
        Preprocessor::new(&NullIncluder).run("t.frag", source)
    }

    fn texts(out: &Preprocessed) -> Vec<&str> {
        out.tokens.iter().map(|token| token.text.as_str()).collect()
    }

    #[test]
    fn selects_conditional_branches() {
        let out = run(
            "#define A 2\n#if defined(A) && A >= 2\nyes\n#elif 1\nno\n#else\nno\n#endif\n\
             #ifndef B\nb\n#endif\n#if 0\n#if 1\nnested\n#endif\n#else\nouter\n#endif",
        );
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(texts(&out), vec!["yes", "b", "outer"]);
    }

    #[test]
    fn expands_macros_at_the_use_site() {
        let mut preprocessor = Preprocessor::new(&NullIncluder);
        preprocessor.define(&Define::with_value("COUNT", "4"));
        let out = preprocessor.run("t.frag", "#define TWICE COUNT * 2\nx = TWICE;");
        assert_eq!(texts(&out), vec!["x", "=", "4", "*", "2", ";"]);
        assert!(out.tokens[2..5].iter().all(|token| token.pos == SourcePosition::new(0, 2, 4)));
    }

    #[test]
    fn self_referencing_macro_stops() {
        let out = run("#define X X + 1\nX");
        assert_eq!(texts(&out), vec!["X", "+", "1"]);
    }

    #[test]
    fn forwards_version_and_extensions() {
        let out = run("#version 300 es\n#extension GL_OES_standard_derivatives : enable\n#pragma optimize(on)\nx");
        let version = out.version.unwrap();
        assert_eq!((version.number, version.es), (300, true));
        assert_eq!(out.extensions[0].text, "GL_OES_standard_derivatives : enable");
        assert_eq!(texts(&out), vec!["x"]);
    }

    #[test]
    fn includes_become_extra_sources() {
        let includer = MemoryIncluder::new().with_file("common.glsl", "#define TINT 0.5\nfloat k;");
        let out = Preprocessor::new(&includer).run("t.frag", "#include \"common.glsl\"\nx = TINT;");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        assert_eq!(out.sources.len(), 2);
        assert_eq!(out.sources[1].name, "common.glsl");
        assert_eq!(texts(&out), vec!["float", "k", ";", "x", "=", "0.5", ";"]);
        assert_eq!(out.tokens[0].pos, SourcePosition::new(1, 2, 0));
    }

    #[test]
    fn recursive_include_hits_depth_limit() {
        let includer = MemoryIncluder::new().with_file("self.glsl", "#include \"self.glsl\"\n");
        let out = Preprocessor::new(&includer).run("t.frag", "#include \"self.glsl\"");
        assert!(out
            .diagnostics
            .iter()
            .any(|diagnostic| diagnostic.message.contains("nested deeper")));
    }

    #[test]
    fn reports_directive_errors() {
        let out = run("#if 1\n#bogus\n#define F(x) x\n#else\n#else\n");
        let messages: Vec<&str> = out
            .diagnostics
            .iter()
            .map(|diagnostic| diagnostic.message.as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "unknown preprocessor directive #bogus",
                "function-like macros are not supported",
                "#else after #else",
                "unterminated conditional directive",
            ]
        );
    }

    #[test]
    fn error_directive_is_reported() {
        let out = run("#ifndef GL_ES\n#error needs ES\n#endif");
        assert_eq!(out.diagnostics[0].to_string(), "t.frag:2:0: error: #error needs ES");
    }
}
