use crate::game::difficulty;
use crate::game::scheduler::Scheduler;
use crate::game::session::Session;
use crate::game::state::{GameMode, GameStatus};

pub fn format_mm_ss(total_secs: u32) -> String {
    let mins = total_secs / 60;
    let secs = total_secs % 60;
    format!("{:02}:{:02}", mins, secs)
}

pub fn mode_label<S: Scheduler>(session: &Session<S>) -> String {
    let st = session.state();
    match st.mode {
        GameMode::Casual => format!(
            "Casual {}",
            difficulty::casual_difficulty(session.casual_difficulty()).name
        ),
        GameMode::Level => format!("Level {}", st.level),
    }
}

pub fn status_line<S: Scheduler>(session: &Session<S>) -> String {
    let st = session.state();
    let clock = match st.mode {
        GameMode::Casual => format_mm_ss(st.timer),
        GameMode::Level => format!("{} left", format_mm_ss(st.timer)),
    };
    format!(
        "{} | {} | {} | Moves {} | Pairs {}/{} | Score {}",
        mode_label(session),
        st.theme_name,
        clock,
        st.moves,
        st.matched_pairs,
        st.required_pairs,
        st.score
    )
}

pub fn banner<S: Scheduler>(session: &Session<S>) -> Option<String> {
    let st = session.state();
    match st.status {
        GameStatus::Won if st.mode == GameMode::Casual => Some(format!(
            "You completed the {} deck in {} moves. [r] play again",
            st.theme_name, st.moves
        )),
        GameStatus::Won => Some(format!(
            "Level {} complete! Getting harder... [n] next level, [r] start over",
            st.level
        )),
        GameStatus::GameOver => Some(format!(
            "Time's up! You reached level {}. [r] try again",
            st.level
        )),
        GameStatus::Loading => Some("Generating theme...".to_string()),
        GameStatus::Idle => session.error_message().map(|e| e.to_string()),
        GameStatus::Playing => None,
    }
}
