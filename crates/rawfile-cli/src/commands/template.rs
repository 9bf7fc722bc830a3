//! Template command - render the patched manifests without a cluster

use console::style;
use rawfile_core::to_yaml;
use std::path::Path;

use crate::error::Result;
use crate::util::OperatorArgs;

pub fn run(args: &OperatorArgs, output_dir: Option<&Path>) -> Result<()> {
    let mut rendered = Vec::new();
    for set in args.manifest_sets()? {
        let objects = set.desired()?;
        rendered.push((set.name().to_string(), to_yaml(&objects)?));
    }

    match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            for (name, yaml) in rendered {
                let path = dir.join(format!("{}.yaml", name));
                std::fs::write(&path, yaml)?;
                eprintln!("{} Wrote {}", style("✓").green(), path.display());
            }
        }
        None => {
            for (_, yaml) in rendered {
                print!("{}", yaml);
            }
        }
    }
    Ok(())
}
