//! Tokenizer for the C-style surface syntax shared by GLSL and HLSL.

use shade_model::{Diagnostic, DiagnosticOrigin, Location, SourcePosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexKind {
    Ident,
    Number,
    Punct,
    /// A quoted string; only meaningful as an `#include` operand.
    Str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: LexKind,
    pub text: String,
    pub pos: SourcePosition,
    /// First token on its source line.
    pub line_start: bool,
}

impl Token {
    pub fn is_punct(&self, text: &str) -> bool {
        self.kind == LexKind::Punct && self.text == text
    }

    pub fn is_ident(&self, text: &str) -> bool {
        self.kind == LexKind::Ident && self.text == text
    }
}

const PUNCT3: [&str; 2] = ["<<=", ">>="];
const PUNCT2: [&str; 19] = [
    "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "==", "!=", "<=", ">=", "&&",
    "||", "^^", "<<", ">>",
];
const PUNCT1: &str = "+-*/%=<>!&|^~?:;,.(){}[]#";

/// Tokenizes `text` as file number `file`. Problems are reported as error
/// diagnostics located in `file_name`; lexing continues past them.
pub fn tokenize(text: &str, file: u32, file_name: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer {
        chars: text.chars().collect(),
        index: 0,
        line: 1,
        column: 0,
        file,
        file_name,
        line_has_token: false,
        tokens: Vec::new(),
        diagnostics: Vec::new(),
    }
    .run()
}

struct Lexer<'a> {
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
    file: u32,
    file_name: &'a str,
    line_has_token: bool,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer<'_> {
    fn run(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while let Some(ch) = self.peek(0) {
            let start = self.position();
            match ch {
                '\n' => self.bump(),
                c if c.is_whitespace() => self.bump(),
                '\\' if self.peek(1) == Some('\n') => {
                    // Line continuation: the next physical line continues
                    // the current logical one.
                    self.bump();
                    self.bump();
                    self.line_has_token = true;
                }
                '/' if self.peek(1) == Some('/') => {
                    while self.peek(0).is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                '/' if self.peek(1) == Some('*') => self.block_comment(start),
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let text = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                    self.push(LexKind::Ident, text, start);
                }
                c if c.is_ascii_digit()
                    || (c == '.' && self.peek(1).is_some_and(|c| c.is_ascii_digit())) =>
                {
                    let text = self.number();
                    self.push(LexKind::Number, text, start);
                }
                '"' => self.string(start),
                _ => self.punct(ch, start),
            }
        }
        (self.tokens, self.diagnostics)
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.index + ahead).copied()
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek(0) {
            self.index += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
                self.line_has_token = false;
            } else {
                self.column += 1;
            }
        }
    }

    fn position(&self) -> SourcePosition {
        SourcePosition::new(self.file, self.line, self.column)
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek(0).filter(|c| keep(*c)) {
            text.push(ch);
            self.bump();
        }
        text
    }

    fn push(&mut self, kind: LexKind, text: String, pos: SourcePosition) {
        let line_start = !self.line_has_token;
        self.line_has_token = true;
        self.tokens.push(Token {
            kind,
            text,
            pos,
            line_start,
        });
    }

    fn error(&mut self, pos: SourcePosition, message: impl Into<String>) {
        let location = Location::new(self.file_name, pos.line, pos.column);
        self.diagnostics
            .push(Diagnostic::error(DiagnosticOrigin::FrontEnd, message).at(location));
    }

    fn block_comment(&mut self, start: SourcePosition) {
        self.bump();
        self.bump();
        loop {
            match self.peek(0) {
                None => {
                    self.error(start, "unterminated block comment");
                    return;
                }
                Some('*') if self.peek(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    return;
                }
                Some(_) => self.bump(),
            }
        }
    }

    fn number(&mut self) -> String {
        let hex = self.peek(0) == Some('0') && matches!(self.peek(1), Some('x' | 'X'));
        let mut text = String::new();
        while let Some(ch) = self.peek(0) {
            let exponent_sign = !hex
                && matches!(ch, '+' | '-')
                && text.ends_with(['e', 'E'])
                && self.peek(1).is_some_and(|c| c.is_ascii_digit());
            if ch.is_ascii_alphanumeric() || ch == '.' || exponent_sign {
                text.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        text
    }

    fn string(&mut self, start: SourcePosition) {
        self.bump();
        let text = self.take_while(|c| c != '"' && c != '\n');
        if self.peek(0) == Some('"') {
            self.bump();
            self.push(LexKind::Str, text, start);
        } else {
            self.error(start, "unterminated string literal");
        }
    }

    fn punct(&mut self, ch: char, start: SourcePosition) {
        let rest: String = self.chars[self.index..].iter().take(3).collect();
        let matched = PUNCT3
            .iter()
            .chain(PUNCT2.iter())
            .find(|op| rest.starts_with(**op))
            .map(|op| (*op).to_string())
            .or_else(|| PUNCT1.contains(ch).then(|| ch.to_string()));
        match matched {
            Some(text) => {
                for _ in 0..text.chars().count() {
                    self.bump();
                }
                self.push(LexKind::Punct, text, start);
            }
            None => {
                self.error(start, format!("unexpected character '{}'", ch.escape_default()));
                self.bump();
            }
        }
    }
}
