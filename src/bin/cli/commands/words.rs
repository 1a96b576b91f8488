use anyhow::{Context, Result};

use kotoba_lib::srs::ReadingKind;

use crate::app::App;
use crate::OutputFormat;

pub fn run_add(
    app: &App,
    word_id: i64,
    readings: &[(u32, ReadingKind)],
    format: &OutputFormat,
) -> Result<()> {
    for (index, kind) in readings {
        app.service
            .store()
            .register_reading(word_id, *index, *kind)
            .with_context(|| format!("Failed to register reading {} of word {}", index, word_id))?;
    }

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "wordId": word_id,
                "readings": readings.iter().map(|(index, kind)| {
                    serde_json::json!({ "readingIndex": index, "kind": kind })
                }).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("Word {}:", word_id);
            for (index, kind) in readings {
                println!("  #{:<3} {}", index, kind.as_str());
            }
        }
    }

    Ok(())
}
