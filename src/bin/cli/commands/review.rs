use anyhow::{Context, Result};
use chrono::{SubsecRound, Utc};

use kotoba_lib::srs::{format_interval, Rating};

use crate::app::App;
use crate::render::terminal::{self, Color};
use crate::OutputFormat;

pub fn run(
    app: &App,
    word_id: i64,
    reading_index: u32,
    rating: Rating,
    duration_ms: Option<u32>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let result = app
        .service
        .review_card(app.user(), word_id, reading_index, rating, duration_ms)
        .context("Review failed")?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Plain => {
            let state = result.known_state.as_str();
            println!(
                "Reviewed {}#{} as {} ({})",
                word_id,
                reading_index,
                rating,
                terminal::paint(state, terminal::known_state_color(result.known_state), use_color)
            );
            for line in terminal::render_card(&result.card, result.log.reviewed_at, use_color) {
                println!("{}", line);
            }
            if result.mirrored {
                println!("{}", terminal::paint("  Kana reading updated too", Color::DIM, use_color));
            }
        }
    }

    Ok(())
}

pub fn run_preview(
    app: &App,
    word_id: i64,
    reading_index: u32,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let now = Utc::now().trunc_subsecs(0);
    let preview = app
        .service
        .preview(app.user(), word_id, reading_index, now)
        .context("Failed to preview intervals")?;

    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = preview
                .iter()
                .map(|(rating, due)| {
                    serde_json::json!({
                        "rating": rating,
                        "due": due.to_rfc3339(),
                        "interval": format_interval(*due - now),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if let Some(card) = app.service.get_card(app.user(), word_id, reading_index)? {
                println!("{}#{}", word_id, reading_index);
                for line in terminal::render_card(&card, now, use_color) {
                    println!("{}", line);
                }
                println!();
            }

            println!("{:<7} {}", "Rating", "Next");
            println!("{} {}", "\u{2500}".repeat(7), "\u{2500}".repeat(6));
            for (rating, due) in &preview {
                println!("{:<7} {}", rating.as_str(), format_interval(*due - now));
            }
        }
    }

    Ok(())
}
