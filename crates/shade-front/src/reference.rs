//! The built-in front end for the GLSL/HLSL subset.

use shade_ir::{IR_SOURCE_NAME, Instruction, Module, TOKEN_TEXT_OPERAND, ir_position};
use shade_map::SourceMapBuilder;
use shade_model::{
    Diagnostic, DiagnosticOrigin, Location, SourceLanguage, SourcePosition,
};
use tracing::debug;

use crate::error::FrontEndError;
use crate::hlsl::canonical_name;
use crate::lexer::{LexKind, Token};
use crate::preprocess::{Preprocessed, Preprocessor};
use crate::validate::validate;
use crate::{FrontEnd, FrontEndOutput, FrontEndRequest};

/// Version recorded for GLSL sources without a `#version` directive.
const DEFAULT_GLSL_VERSION: u32 = 110;

/// Lexes, preprocesses and validates the source, then lowers the token
/// stream to IR instructions, one `Token` instruction per surface token.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceFrontEnd;

impl ReferenceFrontEnd {
    pub fn new() -> Self {
        Self
    }
}

impl FrontEnd for ReferenceFrontEnd {
    fn name(&self) -> &'static str {
        "reference"
    }

    fn compile(&self, request: &FrontEndRequest<'_>) -> Result<FrontEndOutput, FrontEndError> {
        let mut preprocessor = Preprocessor::new(request.includer);
        for define in request.defines {
            preprocessor.define(define);
        }
        let mut pre = preprocessor.run(request.source_name, request.source);

        let entry = match request.language {
            SourceLanguage::Glsl => "main",
            SourceLanguage::Hlsl => request.entry_point,
        };
        let problems = validate(&pre.tokens, entry);
        for problem in problems {
            let location = location(&pre, problem.pos);
            pre.diagnostics
                .push(Diagnostic::error(DiagnosticOrigin::FrontEnd, problem.message).at(location));
        }
        if pre.diagnostics.iter().any(Diagnostic::is_error) {
            return Err(FrontEndError::new(pre.diagnostics));
        }

        let (module, map) = lower(request, &pre, entry)?;
        debug!(
            source = request.source_name,
            instructions = module.len(),
            mappings = map.mappings().len(),
            "front end lowered source"
        );
        Ok(FrontEndOutput {
            ir: module.encode(),
            map,
            diagnostics: pre.diagnostics,
        })
    }
}

fn lower(
    request: &FrontEndRequest<'_>,
    pre: &Preprocessed,
    entry: &str,
) -> Result<(Module, shade_map::SourceMap), FrontEndError> {
    let mut module = Module::new();
    let mut builder = SourceMapBuilder::new(IR_SOURCE_NAME);
    for source in &pre.sources {
        builder.add_source(&source.name, Some(source.content.clone()));
    }
    let mut record = |index: usize, operand: u32, original: SourcePosition, name: Option<String>| {
        builder.add(
            ir_position(index, operand),
            request.granularity.apply(original),
            name,
        )
    };

    let (version, es, version_pos) = match (request.language, pre.version) {
        (_, Some(directive)) => (directive.number, directive.es, directive.pos),
        (SourceLanguage::Glsl, None) => (DEFAULT_GLSL_VERSION, false, SourcePosition::new(0, 1, 0)),
        (SourceLanguage::Hlsl, None) => (0, false, SourcePosition::new(0, 1, 0)),
    };
    let index = module.push(Instruction::Source {
        language: request.language,
        version,
        es,
    });
    record(index, 0, version_pos, None)?;

    let entry_pos = entry_position(&pre.tokens, entry).unwrap_or(version_pos);
    let index = module.push(Instruction::EntryPoint {
        stage: request.stage,
        name: entry.to_string(),
    });
    record(index, 0, entry_pos, Some(entry.to_string()))?;

    for extension in &pre.extensions {
        let index = module.push(Instruction::Extension {
            text: extension.text.clone(),
        });
        record(index, 0, extension.pos, None)?;
    }

    for token in &pre.tokens {
        let (instruction, name) = match token.kind {
            LexKind::Ident => {
                let renamed = match request.language {
                    SourceLanguage::Hlsl => canonical_name(&token.text, entry),
                    SourceLanguage::Glsl => None,
                };
                match renamed {
                    Some(ir_name) => (Instruction::ident(ir_name), Some(token.text.clone())),
                    None => (Instruction::ident(token.text.clone()), None),
                }
            }
            LexKind::Number => (Instruction::number(token.text.clone()), None),
            LexKind::Punct | LexKind::Str => (Instruction::punct(token.text.clone()), None),
        };
        let index = module.push(instruction);
        record(index, TOKEN_TEXT_OPERAND, token.pos, name)?;
    }

    Ok((module, builder.finish()))
}

fn entry_position(tokens: &[Token], entry: &str) -> Option<SourcePosition> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate() {
        if token.kind == LexKind::Punct {
            match token.text.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            }
        } else if depth == 0
            && token.is_ident(entry)
            && tokens.get(index + 1).is_some_and(|next| next.is_punct("("))
        {
            return Some(token.pos);
        }
    }
    None
}

fn location(pre: &Preprocessed, pos: SourcePosition) -> Location {
    let file = pre
        .sources
        .get(pos.file as usize)
        .map_or("<unknown>", |source| source.name.as_str());
    Location::new(file, pos.line, pos.column)
}
