use chrono::{DateTime, Utc};

use kotoba_lib::srs::{format_interval, Card, CardState, KnownState};

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

pub fn known_state_color(state: KnownState) -> &'static str {
    match state {
        KnownState::New => Color::BLUE,
        KnownState::Young => Color::YELLOW,
        KnownState::Mature => Color::GREEN,
        KnownState::Mastered => Color::MAGENTA,
        KnownState::Blacklisted => Color::GRAY,
    }
}

fn card_state_color(state: CardState) -> &'static str {
    match state {
        CardState::New => Color::BLUE,
        CardState::Learning | CardState::Relearning => Color::RED,
        CardState::Review => Color::GREEN,
        CardState::Mastered => Color::MAGENTA,
        CardState::Blacklisted => Color::GRAY,
    }
}

/// "in 3d", "now", or "4h ago"
pub fn relative_due(due: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if due > now {
        format!("in {}", format_interval(due - now))
    } else if now - due < chrono::Duration::minutes(1) {
        "now".to_string()
    } else {
        format!("{} ago", format_interval(now - due))
    }
}

/// Multi-line summary of a card
pub fn render_card(card: &Card, now: DateTime<Utc>, use_color: bool) -> Vec<String> {
    let mut lines = vec![format!(
        "  State:      {}",
        paint(card.state.as_str(), card_state_color(card.state), use_color)
    )];

    if let Some(step) = card.step {
        lines.push(format!("  Step:       {}", step));
    }
    if let Some((stability, difficulty)) = card.memory() {
        lines.push(format!("  Stability:  {:.2}d", stability));
        lines.push(format!("  Difficulty: {:.2}", difficulty));
    }
    if !card.state.is_override() {
        lines.push(format!(
            "  Due:        {} ({})",
            card.due.format("%Y-%m-%d %H:%M"),
            if card.is_due(now) {
                paint(&relative_due(card.due, now), Color::RED, use_color)
            } else {
                relative_due(card.due, now)
            }
        ));
    }
    if let Some(last) = card.last_review {
        lines.push(format!(
            "  Last:       {}",
            paint(&last.format("%Y-%m-%d %H:%M").to_string(), Color::DIM, use_color)
        ));
    }
    lines
}
