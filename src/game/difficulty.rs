use super::state::GameMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CasualDifficulty {
    pub id: &'static str,
    pub name: &'static str,
    pub pairs: usize,
    pub cols: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelConfig {
    pub pairs: usize,
    pub time_limit_secs: u32,
}

pub const CASUAL_DIFFICULTIES: [CasualDifficulty; 4] = [
    CasualDifficulty { id: "easy", name: "Easy", pairs: 6, cols: 3 },
    CasualDifficulty { id: "normal", name: "Normal", pairs: 8, cols: 4 },
    CasualDifficulty { id: "hard", name: "Hard", pairs: 12, cols: 4 },
    CasualDifficulty { id: "master", name: "Master", pairs: 18, cols: 6 },
];

pub const DEFAULT_CASUAL_ID: &str = "normal";

pub const LEVEL_CONFIGS: [LevelConfig; 7] = [
    LevelConfig { pairs: 4, time_limit_secs: 30 },
    LevelConfig { pairs: 6, time_limit_secs: 45 },
    LevelConfig { pairs: 8, time_limit_secs: 60 },
    LevelConfig { pairs: 10, time_limit_secs: 80 },
    LevelConfig { pairs: 12, time_limit_secs: 100 },
    LevelConfig { pairs: 15, time_limit_secs: 140 },
    LevelConfig { pairs: 18, time_limit_secs: 180 },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DifficultyConfig {
    pub pair_count: usize,
    pub time_limit_secs: Option<u32>,
}

pub fn casual_difficulty(id: &str) -> CasualDifficulty {
    CASUAL_DIFFICULTIES
        .iter()
        .copied()
        .find(|d| d.id == id)
        .unwrap_or_else(default_casual)
}

fn default_casual() -> CasualDifficulty {
    CASUAL_DIFFICULTIES
        .iter()
        .copied()
        .find(|d| d.id == DEFAULT_CASUAL_ID)
        .unwrap_or(CASUAL_DIFFICULTIES[0])
}

pub fn level_config(level: u32) -> LevelConfig {
    let idx = (level.max(1) as usize - 1).min(LEVEL_CONFIGS.len() - 1);
    LEVEL_CONFIGS[idx]
}

pub fn resolve(mode: GameMode, casual_id: &str, level: u32) -> DifficultyConfig {
    match mode {
        GameMode::Casual => DifficultyConfig {
            pair_count: casual_difficulty(casual_id).pairs,
            time_limit_secs: None,
        },
        GameMode::Level => {
            let cfg = level_config(level);
            DifficultyConfig {
                pair_count: cfg.pairs,
                time_limit_secs: Some(cfg.time_limit_secs),
            }
        }
    }
}

pub fn hardest_pair_count() -> usize {
    let casual = CASUAL_DIFFICULTIES.iter().map(|d| d.pairs).max().unwrap_or(0);
    let level = LEVEL_CONFIGS.iter().map(|l| l.pairs).max().unwrap_or(0);
    casual.max(level)
}

pub fn board_columns(mode: GameMode, casual_id: &str, pair_count: usize) -> usize {
    match mode {
        GameMode::Casual => casual_difficulty(casual_id).cols,
        GameMode::Level if pair_count >= 18 => 6,
        GameMode::Level if pair_count >= 10 => 5,
        GameMode::Level => 4,
    }
}
