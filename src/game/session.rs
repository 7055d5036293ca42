use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use super::deck;
use super::difficulty::{self, DEFAULT_CASUAL_ID, DifficultyConfig};
use super::records::RecordsStore;
use super::scheduler::{Scheduler, TimerEvent, TimerHandle, TimerKind, VirtualScheduler};
use super::state::{
    CardId, FlipResult, GameMode, GameStatus, RoundOutcome, SessionState, TickResult,
};
use super::theme::{self, Theme};
use crate::config::SessionTimings;
use crate::provider::{ContentProvider, GenerationError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThemeRequest {
    pub ticket: u64,
    pub prompt: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThemeOutcome {
    Applied,
    Failed(String),
    Stale,
}

pub struct Session<S: Scheduler> {
    state: SessionState,
    casual_id: String,
    theme: Theme,
    records: RecordsStore,
    scheduler: S,
    timings: SessionTimings,
    rng: StdRng,
    round: u64,
    restarts: u64,
    next_ticket: u64,
    pending_theme: Option<ThemeRequest>,
    settle_timer: Option<TimerHandle>,
    clock_timer: Option<TimerHandle>,
    revert_timer: Option<(TimerHandle, [CardId; 2])>,
    error: Option<String>,
}

impl<S: Scheduler> Session<S> {
    pub fn new(scheduler: S, records: RecordsStore, timings: SessionTimings) -> Self {
        Self::with_rng(scheduler, records, timings, StdRng::from_rng(&mut rand::rng()))
    }

    pub fn with_seed(scheduler: S, records: RecordsStore, timings: SessionTimings, seed: u64) -> Self {
        Self::with_rng(scheduler, records, timings, StdRng::seed_from_u64(seed))
    }

    fn with_rng(scheduler: S, records: RecordsStore, timings: SessionTimings, rng: StdRng) -> Self {
        let theme = theme::default_theme();
        Session {
            state: SessionState::new(GameMode::Casual, &theme.name),
            casual_id: DEFAULT_CASUAL_ID.to_string(),
            theme,
            records,
            scheduler,
            timings,
            rng,
            round: 0,
            restarts: 0,
            next_ticket: 0,
            pending_theme: None,
            settle_timer: None,
            clock_timer: None,
            revert_timer: None,
            error: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> GameStatus {
        self.state.status
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn casual_difficulty(&self) -> &str {
        &self.casual_id
    }

    pub fn records(&self) -> &RecordsStore {
        &self.records
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn restart_count(&self) -> u64 {
        self.restarts
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn difficulty(&self) -> DifficultyConfig {
        difficulty::resolve(self.state.mode, &self.casual_id, self.state.level)
    }

    pub fn initialize(&mut self) {
        self.cancel_timers();
        self.pending_theme = None;
        self.error = None;
        self.round = self.round.wrapping_add(1);

        let config = self.difficulty();
        let cards = deck::build_deck(&self.theme.items, config.pair_count, self.round, &mut self.rng);
        self.state.theme_name = self.theme.name.clone();
        self.state.start_round(cards, config);
        info!(
            round = self.round,
            mode = self.state.mode.name(),
            level = self.state.level,
            pairs = config.pair_count,
            theme = %self.theme.name,
            "dealt new round"
        );

        if self.timings.start_delay.is_zero() {
            self.enter_playing();
        } else {
            let event = self.event(TimerKind::Settle);
            self.settle_timer = Some(self.scheduler.schedule_once(self.timings.start_delay, event));
        }
    }

    pub fn flip_card(&mut self, id: CardId) -> FlipResult {
        let result = self.state.flip(id);
        match &result {
            FlipResult::Ignored => debug!(card = %id, "flip ignored"),
            FlipResult::Revealed => debug!(card = %id, "card revealed"),
            FlipResult::Matched { outcome } => {
                debug!(card = %id, matched = self.state.matched_pairs, "pair matched");
                if let Some(outcome) = outcome.clone() {
                    self.finish_round(outcome);
                }
            }
            FlipResult::Mismatched { pair } => {
                debug!(first = %pair[0], second = %pair[1], "mismatch");
                let pair = *pair;
                if self.timings.mismatch_delay.is_zero() {
                    self.state.revert(&pair);
                } else {
                    let event = self.event(TimerKind::Revert);
                    let handle = self.scheduler.schedule_once(self.timings.mismatch_delay, event);
                    self.revert_timer = Some((handle, pair));
                }
            }
        }
        result
    }

    pub fn flip_at(&mut self, position: usize) -> FlipResult {
        match self.state.cards.get(position).map(|c| c.id) {
            Some(id) => self.flip_card(id),
            None => FlipResult::Ignored,
        }
    }

    // Events from an earlier round, or for a cancelled timer, are dropped.
    pub fn handle_timer(&mut self, event: TimerEvent) {
        if event.round != self.round {
            debug!(?event, current = self.round, "dropping stale timer");
            return;
        }
        match event.kind {
            TimerKind::Settle => {
                if self.settle_timer.take().is_some() {
                    self.enter_playing();
                }
            }
            TimerKind::Tick => {
                if self.clock_timer.is_none() {
                    return;
                }
                match self.state.tick() {
                    TickResult::Finished(outcome) => self.finish_round(outcome),
                    TickResult::Counted => {}
                    TickResult::Ignored => self.stop_clock(),
                }
            }
            TimerKind::Revert => {
                if let Some((_, pair)) = self.revert_timer.take() {
                    self.state.revert(&pair);
                }
            }
        }
    }

    pub fn restart(&mut self) {
        if self.state.mode == GameMode::Level {
            self.state.level = 1;
        }
        self.restarts = self.restarts.wrapping_add(1);
        self.initialize();
    }

    pub fn next_level(&mut self) -> bool {
        if self.state.mode != GameMode::Level || self.state.status != GameStatus::Won {
            return false;
        }
        self.state.level = self.state.level.saturating_add(1);
        self.initialize();
        true
    }

    pub fn toggle_mode(&mut self) {
        self.state.mode = self.state.mode.toggled();
        self.state.level = 1;
        self.initialize();
    }

    pub fn set_casual_difficulty(&mut self, id: &str) {
        self.casual_id = difficulty::casual_difficulty(id).id.to_string();
        self.initialize();
    }

    pub fn select_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.initialize();
    }

    pub fn begin_theme_request(&mut self, prompt: &str) -> ThemeRequest {
        // The current deck stays on screen, so a pending mismatch still turns back over.
        if let Some((handle, pair)) = self.revert_timer.take() {
            self.scheduler.cancel(handle);
            self.state.revert(&pair);
        }
        self.cancel_timers();
        // Bump the round so nothing already in flight can touch the old deck.
        self.round = self.round.wrapping_add(1);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        let request = ThemeRequest {
            ticket: self.next_ticket,
            prompt: prompt.trim().to_string(),
            count: difficulty::hardest_pair_count(),
        };
        self.state.status = GameStatus::Loading;
        self.error = None;
        self.pending_theme = Some(request.clone());
        info!(prompt = %request.prompt, count = request.count, "requesting generated theme");
        request
    }

    pub fn complete_theme_request(
        &mut self,
        ticket: u64,
        result: Result<Vec<String>, GenerationError>,
    ) -> ThemeOutcome {
        let request = match self.pending_theme.take() {
            Some(request) if request.ticket == ticket => request,
            other => {
                self.pending_theme = other;
                debug!(ticket, "ignoring superseded theme result");
                return ThemeOutcome::Stale;
            }
        };

        let theme = result.and_then(|mut tokens| {
            if tokens.len() < request.count {
                return Err(GenerationError::TooFew {
                    got: tokens.len(),
                    expected: request.count,
                });
            }
            tokens.truncate(request.count);
            Theme::generated(&request.prompt, tokens).ok_or(GenerationError::EmptyResponse)
        });

        match theme {
            Ok(theme) => {
                info!(theme = %theme.name, "generated theme ready");
                self.select_theme(theme);
                ThemeOutcome::Applied
            }
            Err(err) => {
                warn!("theme generation failed: {err}");
                let message = format!("AI generation failed. Check your API settings. {err}");
                self.state.status = GameStatus::Idle;
                self.error = Some(message.clone());
                ThemeOutcome::Failed(message)
            }
        }
    }

    pub async fn request_new_theme(
        &mut self,
        prompt: &str,
        provider: &dyn ContentProvider,
    ) -> ThemeOutcome {
        let request = self.begin_theme_request(prompt);
        let result = provider.generate(&request.prompt, request.count).await;
        self.complete_theme_request(request.ticket, result)
    }

    pub fn fail_theme_request(&mut self, prompt: &str, err: GenerationError) -> ThemeOutcome {
        let request = self.begin_theme_request(prompt);
        self.complete_theme_request(request.ticket, Err(err))
    }

    fn event(&self, kind: TimerKind) -> TimerEvent {
        TimerEvent {
            round: self.round,
            kind,
        }
    }

    fn enter_playing(&mut self) {
        if !self.state.begin_play() {
            return;
        }
        let event = self.event(TimerKind::Tick);
        self.clock_timer = Some(self.scheduler.schedule_repeating(self.timings.tick_interval, event));
    }

    fn stop_clock(&mut self) {
        if let Some(handle) = self.clock_timer.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn cancel_timers(&mut self) {
        self.stop_clock();
        if let Some(handle) = self.settle_timer.take() {
            self.scheduler.cancel(handle);
        }
        if let Some((handle, _)) = self.revert_timer.take() {
            self.scheduler.cancel(handle);
        }
    }

    fn finish_round(&mut self, outcome: RoundOutcome) {
        self.stop_clock();
        match outcome {
            RoundOutcome::CasualWin { moves, time_secs, score } => {
                info!(moves, time_secs, score, difficulty = %self.casual_id, "casual round won");
                let casual_id = self.casual_id.clone();
                if self.records.record_casual(&casual_id, moves, time_secs) {
                    info!(difficulty = %casual_id, "new casual record");
                }
            }
            RoundOutcome::LevelWin { level, remaining_secs, round_score, total_score } => {
                info!(level, remaining_secs, round_score, total_score, "level cleared");
                self.records.record_level(level, total_score);
            }
            RoundOutcome::TimedOut { level, score } => {
                info!(level, score, "time ran out");
                self.records.record_level(level, score);
            }
        }
    }
}

impl Session<VirtualScheduler> {
    pub fn advance(&mut self, by: Duration) {
        let deadline = self.scheduler.now() + by;
        while let Some(event) = self.scheduler.pop_due(deadline) {
            self.handle_timer(event);
        }
        self.scheduler.set_now(deadline);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn session(timings: SessionTimings) -> Session<VirtualScheduler> {
        let records = RecordsStore::load(Box::new(MemoryStore::new()));
        let mut s = Session::with_seed(VirtualScheduler::new(), records, timings, 11);
        s.initialize();
        s
    }

    #[test]
    fn settle_delay_gates_input() {
        let mut s = session(SessionTimings::default());
        assert_eq!(s.status(), GameStatus::Idle);
        assert_eq!(s.flip_at(0), FlipResult::Ignored);
        s.advance(Duration::from_millis(100));
        assert_eq!(s.status(), GameStatus::Playing);
        assert_eq!(s.flip_at(0), FlipResult::Revealed);
    }

    #[test]
    fn clock_counts_up_in_casual() {
        let mut s = session(SessionTimings::immediate());
        s.advance(Duration::from_secs(5));
        assert_eq!(s.state().timer, 5);
        assert_eq!(s.state().required_pairs, 8);
        assert_eq!(s.state().cards.len(), 16);
    }

    #[test]
    fn reinitialize_drops_pending_revert() {
        let mut s = session(SessionTimings::immediate());
        let (a, b) = mismatched_positions(&s);
        s.flip_at(a);
        assert!(matches!(s.flip_at(b), FlipResult::Mismatched { .. }));
        s.restart();
        assert_eq!(s.restart_count(), 1);
        assert_eq!(s.scheduler().pending(), 1, "only the new clock remains");
        s.advance(Duration::from_secs(2));
        assert!(s.state().flipped_ids.is_empty());
        assert!(s.state().cards.iter().all(|c| !c.is_flipped));
    }

    #[test]
    fn zero_mismatch_delay_reverts_immediately() {
        let timings = SessionTimings {
            mismatch_delay: Duration::ZERO,
            ..SessionTimings::immediate()
        };
        let mut s = session(timings);
        let (a, b) = mismatched_positions(&s);
        s.flip_at(a);
        s.flip_at(b);
        assert!(s.state().flipped_ids.is_empty());
        assert_eq!(s.state().moves, 1);
    }

    #[test]
    fn next_level_only_after_a_level_win() {
        let mut s = session(SessionTimings::immediate());
        assert!(!s.next_level());
        s.toggle_mode();
        assert_eq!(s.state().mode, GameMode::Level);
        assert!(!s.next_level());
        assert_eq!(s.state().level, 1);
    }

    #[test]
    fn unknown_difficulty_uses_default() {
        let mut s = session(SessionTimings::immediate());
        s.set_casual_difficulty("impossible");
        assert_eq!(s.casual_difficulty(), DEFAULT_CASUAL_ID);
        s.set_casual_difficulty("easy");
        assert_eq!(s.state().cards.len(), 12);
    }

    fn mismatched_positions(s: &Session<VirtualScheduler>) -> (usize, usize) {
        let cards = &s.state().cards;
        let b = cards
            .iter()
            .position(|c| c.content != cards[0].content)
            .expect("deck has more than one face");
        (0, b)
    }
}
