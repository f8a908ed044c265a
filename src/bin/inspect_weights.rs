//! Debug binary for exported weight artifacts
//!
//! Prints the schema-relevant fields of one or more weight JSON files and
//! checks their structural invariants. Useful for verifying what the form
//! consumer will see without starting anything else.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use med_split::WeightArtifact;

fn inspect(path: &Path) -> Result<()> {
    let artifact = WeightArtifact::load(path)
        .with_context(|| format!("Failed to load weight artifact {}", path.display()))?;

    ensure!(
        artifact.coef[0].len() == artifact.features.len(),
        "coefficient count {} does not match feature count {}",
        artifact.coef[0].len(),
        artifact.features.len()
    );
    ensure!(
        artifact.classes.len() == 2,
        "expected 2 class labels, found {}",
        artifact.classes.len()
    );

    println!("{}", path.display());
    println!("  model:     {}", artifact.model);
    println!("  hospital:  {}", artifact.hospital);
    println!(
        "  classes:   [{}]",
        artifact
            .classes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  intercept: {:.6}", artifact.intercept[0]);
    println!("  features ({}):", artifact.features.len());
    for (name, coef) in artifact.features.iter().zip(&artifact.coef[0]) {
        println!("    {name}: {coef:.6}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    ensure!(
        !paths.is_empty(),
        "usage: inspect_weights <weights.json> [more.json ...]"
    );

    for path in &paths {
        inspect(path)?;
    }
    Ok(())
}
