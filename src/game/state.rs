use std::fmt;

use super::difficulty::DifficultyConfig;

const BASE_SCORE: i64 = 1000;
const CASUAL_MIN_SCORE: i64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GameMode {
    #[default]
    Casual,
    Level,
}

impl GameMode {
    pub fn toggled(self) -> Self {
        match self {
            GameMode::Casual => GameMode::Level,
            GameMode::Level => GameMode::Casual,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GameMode::Casual => "Casual",
            GameMode::Level => "Level",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "casual" => Some(GameMode::Casual),
            "level" => Some(GameMode::Level),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GameStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Won,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CardId {
    pub round: u64,
    pub position: u32,
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card-{}-{}", self.position, self.round)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub id: CardId,
    pub content: String,
    pub is_flipped: bool,
    pub is_matched: bool,
}

impl Card {
    pub fn is_face_up(&self) -> bool {
        self.is_flipped || self.is_matched
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundOutcome {
    CasualWin {
        moves: u32,
        time_secs: u32,
        score: u32,
    },
    LevelWin {
        level: u32,
        remaining_secs: u32,
        round_score: u32,
        total_score: u32,
    },
    TimedOut {
        level: u32,
        score: u32,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlipResult {
    Ignored,
    Revealed,
    Matched { outcome: Option<RoundOutcome> },
    Mismatched { pair: [CardId; 2] },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickResult {
    Ignored,
    Counted,
    Finished(RoundOutcome),
}

pub fn casual_score(elapsed_secs: u32, moves: u32) -> u32 {
    let raw = BASE_SCORE - i64::from(elapsed_secs) * 2 - i64::from(moves) * 5;
    raw.max(CASUAL_MIN_SCORE) as u32
}

pub fn level_round_score(level: u32, remaining_secs: u32) -> u32 {
    let raw = BASE_SCORE + i64::from(remaining_secs) * 10 + i64::from(level) * 200;
    raw.min(i64::from(u32::MAX)) as u32
}

#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pub status: GameStatus,
    pub cards: Vec<Card>,
    pub flipped_ids: Vec<CardId>,
    pub matched_pairs: usize,
    pub required_pairs: usize,
    pub moves: u32,
    // Elapsed seconds in casual mode, remaining seconds in level mode.
    pub timer: u32,
    pub score: u32,
    pub mode: GameMode,
    pub level: u32,
    pub theme_name: String,
}

impl SessionState {
    pub fn new(mode: GameMode, theme_name: &str) -> Self {
        SessionState {
            mode,
            level: 1,
            theme_name: theme_name.to_string(),
            ..Self::default()
        }
    }

    pub fn start_round(&mut self, cards: Vec<Card>, config: DifficultyConfig) {
        self.status = GameStatus::Idle;
        self.cards = cards;
        self.flipped_ids.clear();
        self.matched_pairs = 0;
        self.required_pairs = config.pair_count;
        self.moves = 0;
        match self.mode {
            GameMode::Casual => {
                self.timer = 0;
                self.score = 0;
            }
            GameMode::Level => {
                self.timer = config.time_limit_secs.unwrap_or(0);
                if self.level <= 1 {
                    self.score = 0;
                }
            }
        }
    }

    pub fn begin_play(&mut self) -> bool {
        if self.status != GameStatus::Idle || self.cards.is_empty() {
            return false;
        }
        self.status = GameStatus::Playing;
        true
    }

    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn flip(&mut self, id: CardId) -> FlipResult {
        if self.status != GameStatus::Playing
            || self.flipped_ids.len() >= 2
            || self.flipped_ids.contains(&id)
        {
            return FlipResult::Ignored;
        }
        let Some(card) = self.cards.iter_mut().find(|c| c.id == id) else {
            return FlipResult::Ignored;
        };
        if card.is_matched {
            return FlipResult::Ignored;
        }
        card.is_flipped = true;
        self.flipped_ids.push(id);

        if self.flipped_ids.len() < 2 {
            return FlipResult::Revealed;
        }

        self.moves = self.moves.saturating_add(1);
        let pair = [self.flipped_ids[0], self.flipped_ids[1]];
        let same = match (self.card(pair[0]), self.card(pair[1])) {
            (Some(a), Some(b)) => a.content == b.content,
            _ => false,
        };
        if !same {
            return FlipResult::Mismatched { pair };
        }

        for card in self.cards.iter_mut().filter(|c| pair.contains(&c.id)) {
            card.is_matched = true;
            card.is_flipped = true;
        }
        self.matched_pairs += 1;
        self.flipped_ids.clear();
        FlipResult::Matched {
            outcome: self.check_win(),
        }
    }

    pub fn revert(&mut self, pair: &[CardId; 2]) -> bool {
        if self.flipped_ids.as_slice() != pair.as_slice() {
            return false;
        }
        for card in self.cards.iter_mut().filter(|c| pair.contains(&c.id)) {
            if !card.is_matched {
                card.is_flipped = false;
            }
        }
        self.flipped_ids.clear();
        true
    }

    pub fn tick(&mut self) -> TickResult {
        if self.status != GameStatus::Playing {
            return TickResult::Ignored;
        }
        // A cleared board wins even when the clock runs out on the same boundary.
        if let Some(outcome) = self.check_win() {
            return TickResult::Finished(outcome);
        }
        match self.mode {
            GameMode::Casual => {
                self.timer = self.timer.saturating_add(1);
                TickResult::Counted
            }
            GameMode::Level => {
                if self.timer <= 1 {
                    self.timer = 0;
                    self.status = GameStatus::GameOver;
                    TickResult::Finished(RoundOutcome::TimedOut {
                        level: self.level,
                        score: self.score,
                    })
                } else {
                    self.timer -= 1;
                    TickResult::Counted
                }
            }
        }
    }

    fn check_win(&mut self) -> Option<RoundOutcome> {
        if self.status != GameStatus::Playing
            || self.required_pairs == 0
            || self.matched_pairs != self.required_pairs
        {
            return None;
        }
        self.status = GameStatus::Won;
        let outcome = match self.mode {
            GameMode::Casual => {
                let score = casual_score(self.timer, self.moves);
                self.score = self.score.saturating_add(score);
                RoundOutcome::CasualWin {
                    moves: self.moves,
                    time_secs: self.timer,
                    score,
                }
            }
            GameMode::Level => {
                let round_score = level_round_score(self.level, self.timer);
                self.score = self.score.saturating_add(round_score);
                RoundOutcome::LevelWin {
                    level: self.level,
                    remaining_secs: self.timer,
                    round_score,
                    total_score: self.score,
                }
            }
        };
        Some(outcome)
    }
}
