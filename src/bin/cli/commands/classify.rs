use anyhow::{Context, Result};

use kotoba_lib::srs::{KnownState, KnownStateSet};

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(
    app: &App,
    word_id: i64,
    readings: &[u32],
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let states = readings
        .iter()
        .map(|&reading| {
            app.service
                .classify(app.user(), word_id, reading)
                .map(|state| (reading, state))
        })
        .collect::<Result<Vec<(u32, KnownState)>, _>>()
        .context("Failed to classify word")?;

    // Every label that applies to the word through any of its readings
    let word_states: KnownStateSet = states.iter().map(|(_, state)| *state).collect();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "wordId": word_id,
                "readings": states.iter().map(|(reading, state)| {
                    serde_json::json!({ "readingIndex": reading, "state": state })
                }).collect::<Vec<_>>(),
                "states": word_states.states(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            for (reading, state) in &states {
                println!(
                    "{}#{:<4} {}",
                    word_id,
                    reading,
                    terminal::paint(state.as_str(), terminal::known_state_color(*state), use_color)
                );
            }
            if states.len() > 1 {
                let labels = word_states
                    .states()
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                println!("\nWord {}: {}", word_id, labels);
            }
        }
    }

    Ok(())
}
