use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use kotoba_lib::srs::{ExportDocument, ImportMode};

use crate::app::App;
use crate::OutputFormat;

pub fn run_export(app: &App, output: Option<&Path>, format: &OutputFormat) -> Result<()> {
    let doc = app
        .service
        .export_user(app.user())
        .context("Failed to export cards")?;
    let json = serde_json::to_string_pretty(&doc)?;

    let Some(path) = output else {
        println!("{}", json);
        return Ok(());
    };

    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "path": path.display().to_string(),
                "cards": doc.cards.len(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Exported {} cards to {}", doc.cards.len(), path.display());
        }
    }

    Ok(())
}

pub fn run_import(app: &App, input: &Path, mode: ImportMode, format: &OutputFormat) -> Result<()> {
    let content = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))?
    };

    let doc: ExportDocument =
        serde_json::from_str(&content).context("Not a valid export document")?;
    let report = app
        .service
        .import_user(app.user(), &doc, mode)
        .context("Import failed")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Plain => {
            println!(
                "Imported {} cards ({} skipped, {} kana readings mirrored)",
                report.imported, report.skipped, report.mirrored
            );
            if report.settings_applied {
                println!("Settings imported");
            }
        }
    }

    Ok(())
}
