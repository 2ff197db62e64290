//! The decoded module in the shape the lowering passes work on.

use shade_ir::{Instruction, Module, TOKEN_TEXT_OPERAND, ir_position};
use shade_model::{ShaderStage, SourceLanguage, SourcePosition};

use crate::tok::{Tok, matching_close};

#[derive(Debug, Clone)]
pub struct Program {
    pub language: SourceLanguage,
    pub version: u32,
    pub es: bool,
    pub stage: ShaderStage,
    /// IR position of the `Source` instruction; target headers map here.
    pub source_origin: SourcePosition,
    /// IR position of the `EntryPoint` instruction.
    pub entry_origin: SourcePosition,
    pub extensions: Vec<(String, SourcePosition)>,
    pub tokens: Vec<Tok>,
}

impl Program {
    /// Returns `None` when the module lacks a `Source` or `EntryPoint`.
    pub fn from_module(module: &Module) -> Option<Self> {
        let mut source = None;
        let mut entry = None;
        let mut extensions = Vec::new();
        let mut tokens = Vec::new();

        for (index, instruction) in module.instructions().iter().enumerate() {
            match instruction {
                Instruction::Source {
                    language,
                    version,
                    es,
                } => {
                    source.get_or_insert((*language, *version, *es, ir_position(index, 0)));
                }
                Instruction::EntryPoint { stage, .. } => {
                    entry.get_or_insert((*stage, ir_position(index, 0)));
                }
                Instruction::Extension { text } => {
                    extensions.push((text.clone(), ir_position(index, 0)));
                }
                Instruction::Token { kind, text } => tokens.push(Tok::new(
                    *kind,
                    text.clone(),
                    ir_position(index, TOKEN_TEXT_OPERAND),
                )),
            }
        }

        let (language, version, es, source_origin) = source?;
        let (stage, entry_origin) = entry?;
        Some(Self {
            language,
            version,
            es,
            stage,
            source_origin,
            entry_origin,
            extensions,
            tokens,
        })
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions
            .iter()
            .any(|(text, _)| text.split_whitespace().next() == Some(name))
    }
}

/// A top-level declaration, function definition or statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub tokens: Vec<Tok>,
}

impl Item {
    /// For a function definition, `(name index, body open, body close)`.
    pub fn function(&self) -> Option<(usize, usize, usize)> {
        let open_paren = self.tokens.iter().position(|token| token.is("("))?;
        let close_paren = matching_close(&self.tokens, open_paren)?;
        if !self.tokens.get(close_paren + 1)?.is("{") {
            return None;
        }
        let name = open_paren.checked_sub(1)?;
        if !self.tokens[name].is_ident() {
            return None;
        }
        let close = matching_close(&self.tokens, close_paren + 1)?;
        Some((name, close_paren + 1, close))
    }

    pub fn function_name(&self) -> Option<&str> {
        self.function()
            .map(|(name, _, _)| self.tokens[name].text.as_str())
    }

    pub fn is_precision_statement(&self) -> bool {
        self.tokens.first().is_some_and(|token| token.is("precision"))
    }
}

/// Splits a token stream into top-level items.
pub fn split_items(tokens: &[Tok]) -> Vec<Item> {
    let mut items = Vec::new();
    let mut current: Vec<Tok> = Vec::new();
    let mut depth = 0usize;
    let mut function_body = false;

    for token in tokens {
        current.push(token.clone());
        match token.text.as_str() {
            "{" => {
                if depth == 0 {
                    let before = current.len().checked_sub(2).map(|index| &current[index]);
                    function_body = before.is_some_and(|token| token.is(")"));
                }
                depth += 1;
            }
            "(" | "[" => depth += 1,
            ")" | "]" => depth = depth.saturating_sub(1),
            "}" => {
                depth = depth.saturating_sub(1);
                if depth == 0 && function_body {
                    items.push(Item {
                        tokens: std::mem::take(&mut current),
                    });
                    function_body = false;
                }
            }
            ";" if depth == 0 => items.push(Item {
                tokens: std::mem::take(&mut current),
            }),
            _ => {}
        }
    }
    if !current.is_empty() {
        items.push(Item { tokens: current });
    }
    items
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    In,
    Out,
    Attribute,
    Varying,
    Uniform,
}

impl Storage {
    fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            "attribute" => Some(Self::Attribute),
            "varying" => Some(Self::Varying),
            "uniform" => Some(Self::Uniform),
            _ => None,
        }
    }

    /// Direction as seen by `stage`: `true` for stage inputs.
    pub fn is_input(self, stage: ShaderStage) -> bool {
        match self {
            Self::In | Self::Attribute => true,
            Self::Varying => stage != ShaderStage::Vertex,
            Self::Out | Self::Uniform => false,
        }
    }

    pub fn is_output(self, stage: ShaderStage) -> bool {
        match self {
            Self::Out => true,
            Self::Varying => stage == ShaderStage::Vertex,
            _ => false,
        }
    }
}

pub const PRECISION_QUALIFIERS: [&str; 3] = ["highp", "mediump", "lowp"];
const OTHER_QUALIFIERS: [&str; 6] = ["flat", "smooth", "noperspective", "centroid", "invariant", "patch"];

/// One declared interface variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub name: Tok,
    /// `[`, size tokens, `]`, or empty.
    pub array: Vec<Tok>,
}

/// A global `in`/`out`/`attribute`/`varying`/`uniform` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub storage: Storage,
    /// Index of the storage keyword within the item.
    pub storage_index: usize,
    pub ty: Tok,
    pub vars: Vec<Var>,
}

impl Interface {
    pub fn is_sampler(&self) -> bool {
        self.ty.text.starts_with("sampler")
    }

    pub fn is_cube_sampler(&self) -> bool {
        self.ty.text == "samplerCube"
    }
}

/// Parses a plain interface declaration. Blocks, initialised and `const`
/// declarations are not interface declarations.
pub fn parse_interface(item: &Item) -> Option<Interface> {
    let tokens = &item.tokens;
    let mut index = 0;
    let mut storage = None;

    while let Some(token) = tokens.get(index) {
        if token.is("layout") {
            index = matching_close(tokens, index + 1)? + 1;
        } else if let Some(found) = Storage::from_keyword(&token.text) {
            storage = Some((found, index));
            index += 1;
        } else if PRECISION_QUALIFIERS.contains(&token.text.as_str())
            || OTHER_QUALIFIERS.contains(&token.text.as_str())
        {
            index += 1;
        } else {
            break;
        }
    }

    let (storage, storage_index) = storage?;
    let ty = tokens.get(index).filter(|token| token.is_ident())?.clone();
    index += 1;

    let mut vars = Vec::new();
    loop {
        let name = tokens.get(index).filter(|token| token.is_ident())?.clone();
        index += 1;
        let mut array = Vec::new();
        if tokens.get(index).is_some_and(|token| token.is("[")) {
            let close = matching_close(tokens, index)?;
            array = tokens[index..=close].to_vec();
            index = close + 1;
        }
        vars.push(Var { name, array });
        match tokens.get(index).map(|token| token.text.as_str()) {
            Some(",") => index += 1,
            Some(";") if index + 1 == tokens.len() => break,
            _ => return None,
        }
    }

    Some(Interface {
        storage,
        storage_index,
        ty,
        vars,
    })
}

/// `local_size_{x,y,z}` from a compute `layout(...) in;` declaration.
pub fn local_size(items: &[Item]) -> [u32; 3] {
    let mut size = [1, 1, 1];
    for item in items {
        let tokens = &item.tokens;
        if !tokens.first().is_some_and(|token| token.is("layout")) {
            continue;
        }
        for window in tokens.windows(3) {
            let axis = match window[0].text.as_str() {
                "local_size_x" => 0,
                "local_size_y" => 1,
                "local_size_z" => 2,
                _ => continue,
            };
            if window[1].is("=")
                && let Ok(value) = window[2].text.parse()
            {
                size[axis] = value;
            }
        }
    }
    size
}

/// Whether `item` is the compute `layout(local_size_...) in;` declaration.
pub fn is_local_size_declaration(item: &Item) -> bool {
    item.tokens.first().is_some_and(|token| token.is("layout"))
        && item.tokens.iter().any(|token| token.text.starts_with("local_size_"))
}
