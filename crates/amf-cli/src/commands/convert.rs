use amf_cli::cli::LabelStyle;
use amf_core::{Labeler, Model, NumericLabeler, TextLabeler};
use amf_solvers::write_lp_file;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn handle(
    model_path: &Path,
    out: &Path,
    labels: LabelStyle,
    symbol_map_out: Option<&Path>,
) -> Result<()> {
    let model = Model::read_json(model_path)
        .with_context(|| format!("reading model {}", model_path.display()))?;
    let mut text = TextLabeler;
    let mut numeric = NumericLabeler::new();
    let labeler: &mut dyn Labeler = match labels {
        LabelStyle::Text => &mut text,
        LabelStyle::Numeric => &mut numeric,
    };
    let symbol_map = write_lp_file(&model, out, labeler)
        .with_context(|| format!("converting {}", model_path.display()))?;
    info!(model = model.name(), symbols = symbol_map.len(), "converted model");

    if let Some(path) = symbol_map_out {
        let mut names = BTreeMap::new();
        for (symbol, component) in symbol_map.iter() {
            names.insert(symbol.to_string(), component.name(&model)?);
        }
        fs::write(path, serde_json::to_string_pretty(&names)?)
            .with_context(|| format!("writing symbol map {}", path.display()))?;
    }
    println!("Wrote {} to {}", model.name(), out.display());
    Ok(())
}
