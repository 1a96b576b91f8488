use anyhow::{Context, Result};
use chrono::Utc;

use kotoba_lib::srs::OverrideOp;

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

pub fn run(
    app: &App,
    op: OverrideOp,
    word_id: i64,
    reading_index: u32,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let result = app
        .service
        .set_override_state(app.user(), word_id, reading_index, op)
        .with_context(|| format!("Failed to apply {} to {}#{}", op, word_id, reading_index))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Plain => {
            let verb = if result.changed { "Applied" } else { "Already applied" };
            println!("{} {} to {}#{}", verb, op, word_id, reading_index);
            match &result.card {
                Some(card) => {
                    for line in terminal::render_card(card, Utc::now(), use_color) {
                        println!("{}", line);
                    }
                }
                None => println!("  Card and review history removed"),
            }
            if result.mirrored {
                println!("{}", terminal::paint("  Kana reading updated too", Color::DIM, use_color));
            }
        }
    }

    Ok(())
}
