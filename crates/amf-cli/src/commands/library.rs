use amf_core::library::{self, LIBRARY};
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;
use tabwriter::TabWriter;

pub fn handle(name: Option<&str>, size: Option<usize>, out: Option<&Path>) -> Result<()> {
    let Some(name) = name else {
        return list();
    };
    let model = library::build(name, size)?;
    match out {
        Some(path) => {
            model
                .write_json(path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!(
                "Wrote {} ({} variables, {} constraints) to {}",
                model.name(),
                model.num_vars(),
                model.num_constraints(),
                path.display()
            );
        }
        None => println!("{}", model.to_json()?),
    }
    Ok(())
}

fn list() -> Result<()> {
    let mut writer = TabWriter::new(io::stdout()).padding(2);
    writeln!(writer, "MODEL\tSIZED\tDESCRIPTION")?;
    for entry in LIBRARY {
        let sized = if entry.sized { "yes" } else { "no" };
        writeln!(writer, "{}\t{}\t{}", entry.name, sized, entry.description)?;
    }
    writer.flush()?;
    Ok(())
}
