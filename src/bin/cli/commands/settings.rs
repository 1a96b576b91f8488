use anyhow::{Context, Result};

use kotoba_lib::srs::EffectiveSettings;

use crate::app::App;
use crate::OutputFormat;

fn print_settings(app: &App, settings: &EffectiveSettings) {
    println!("User:              {}", app.user());
    println!("Desired retention: {}", settings.desired_retention);
    println!(
        "Weights:           {}{}",
        settings
            .weights
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        if settings.is_default { " (defaults)" } else { "" }
    );
    println!("Database:          {}", app.config.database_path.display());
}

pub fn run_show(app: &App, format: &OutputFormat) -> Result<()> {
    let settings = app
        .service
        .get_settings(app.user())
        .context("Failed to read settings")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
        OutputFormat::Plain => print_settings(app, &settings),
    }

    Ok(())
}

pub fn run_set(
    app: &App,
    weights: Option<&str>,
    retention: Option<f64>,
    recompute: bool,
    format: &OutputFormat,
) -> Result<()> {
    let settings = app
        .service
        .update_settings(app.user(), weights, retention)
        .context("Failed to update settings")?;

    let report = if recompute {
        Some(
            app.service
                .recompute_settings(app.user())
                .context("Failed to recompute cards")?,
        )
    } else {
        None
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "settings": settings,
                "recompute": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            print_settings(app, &settings);
            if let Some(report) = report {
                println!(
                    "\nRecomputed {} cards ({} updated, {} failed)",
                    report.processed_count,
                    report.updated_count,
                    report.failures.len()
                );
            } else {
                println!("\nRun `kotoba-cli recompute` to apply the new settings to existing cards.");
            }
        }
    }

    Ok(())
}
