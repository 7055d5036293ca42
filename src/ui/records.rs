use std::fmt::Write;

use crate::game::difficulty::CASUAL_DIFFICULTIES;
use crate::game::records::GameRecords;

use super::hud::format_mm_ss;

pub fn render_records(records: &GameRecords) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Level mode");
    let _ = writeln!(out, "  Max level:  {}", records.level.max_level);
    let _ = writeln!(out, "  High score: {}", records.level.high_score);
    if !records.level.history.is_empty() {
        let _ = writeln!(out, "  Recent:");
        for entry in records.level.history.iter().rev() {
            let _ = writeln!(
                out,
                "    level {:>2}  score {:>6}",
                entry.level.unwrap_or(0),
                entry.score.unwrap_or(0)
            );
        }
    }

    let _ = writeln!(out, "Casual mode");
    for difficulty in CASUAL_DIFFICULTIES {
        match records.casual.get(difficulty.id) {
            Some(best) => {
                let _ = writeln!(
                    out,
                    "  {:<7} {}  {} moves",
                    difficulty.name,
                    format_mm_ss(best.time.unwrap_or(0)),
                    best.moves.unwrap_or(0)
                );
            }
            None => {
                let _ = writeln!(out, "  {:<7} no records yet", difficulty.name);
            }
        }
    }
    out
}
