//! The variable listing target: the stage followed by one line per
//! declared uniform, input and output.

use shade_model::ShaderStage;

use crate::format::{Emission, Line};
use crate::program::{Program, Storage, parse_interface, split_items};

pub fn lower(program: &Program) -> Emission {
    let mut header = vec![Line::new(
        stage_name(program.stage),
        program.entry_origin,
    )];
    for item in split_items(&program.tokens) {
        let Some(interface) = parse_interface(&item) else {
            continue;
        };
        let direction = match interface.storage {
            Storage::Uniform => "uniform",
            storage if storage.is_input(program.stage) => "in",
            _ => "out",
        };
        for var in &interface.vars {
            let array = if var.array.is_empty() { "" } else { "[]" };
            header.push(Line::new(
                format!("{direction} {}{array} {}", interface.ty.text, var.name.text),
                var.name.origin,
            ));
        }
    }
    Emission {
        header,
        tokens: Vec::new(),
    }
}

fn stage_name(stage: ShaderStage) -> &'static str {
    match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Fragment => "fragment",
        ShaderStage::Geometry => "geometry",
        ShaderStage::TessControl => "tesscontrol",
        ShaderStage::TessEvaluation => "tessevaluation",
        ShaderStage::Compute => "compute",
    }
}
