use anyhow::{Context, Result};

use crate::app::App;
use crate::OutputFormat;

pub fn run(
    app: &App,
    after: Option<i64>,
    page_size: Option<usize>,
    format: &OutputFormat,
) -> Result<()> {
    // A page size means one resumable page; otherwise run to the end
    let report = match page_size {
        Some(size) => app.service.recompute_settings_batch(app.user(), after, Some(size)),
        None if after.is_some() => app.service.recompute_settings_batch(app.user(), after, None),
        None => app.service.recompute_settings(app.user()),
    }
    .context("Recompute failed")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Plain => {
            println!(
                "Processed {} cards: {} updated, {} kana readings mirrored",
                report.processed_count, report.updated_count, report.mirrored_count
            );
            for failure in &report.failures {
                println!("  card {}: {}", failure.card_id, failure.reason);
            }
            match (report.done, report.last_card_id) {
                (true, _) => println!("Done."),
                (false, Some(last)) => println!("More cards remain; resume with --after {}", last),
                (false, None) => {}
            }
        }
    }

    Ok(())
}
