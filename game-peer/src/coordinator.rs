use game_core::{
    ChatEventKind, ChatLog, ComputerAgent, MatchEvent, PuzzleGenerator, RematchHandshake,
    ThemeBallot, TurnEngine, any_state_change, draw_theme_options, ensure_playable, flip_coin,
    next_first_mover, random_theme, resolve_coin_flip, selection_hits, text_hits,
};
use game_types::{
    ActionIntent, CellCoord, ChatMessage, CoinFlipOutcome, CoinSide, Contestant, ContestantId,
    Identity, MatchConfig, MatchError, MatchMode, MatchSnapshot, PeerMessage, PeerRole, Violation,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::link::LinkSender;
use crate::services::Services;

/// What the local user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalCommand {
    SelectCells(Vec<CellCoord>),
    SelectWord(String),
    SpendBonus,
    Forfeit,
    Chat(String),
    CallCoin(CoinSide),
    StartMatch { theme: Option<String> },
    RequestRematch,
    VoteTheme(String),
    Quit,
}

/// Everything the session loop feeds into the coordinator, one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Local(LocalCommand),
    Peer(PeerMessage),
    LinkClosed,
    Tick { generation: u64 },
    ComputerMove { generation: u64 },
    ComputerLine { text: String },
}

/// What the local user gets told.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    PeerIdentified { identity: Identity },
    CoinCallRequested,
    CoinFlipResolved { outcome: CoinFlipOutcome },
    MatchStarted { first_mover_index: usize, theme: Option<String> },
    StartFailed { theme: String, reason: String },
    StateUpdated { snapshot: MatchSnapshot },
    SelectionFeedback { event: MatchEvent },
    ActionRefused { error: MatchError },
    ChatReceived { message: ChatMessage },
    MatchOver { winner_id: ContestantId, final_contestants: Vec<Contestant> },
    RematchRequested,
    ThemeVoteOpened { options: Vec<String> },
    ThemeChosen { theme: String },
    SessionEnded { error: Option<MatchError> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// One side of a match. The Authority owns the canonical engine and runs the clock;
/// the Mirror forwards intents and renders whatever snapshot arrived last.
pub struct MatchCoordinator {
    role: PeerRole,
    mode: MatchMode,
    local: Identity,
    opponent: Option<Identity>,
    link: Option<LinkSender>,
    computer: Option<ComputerAgent>,
    services: Services,
    engine: Option<TurnEngine>,
    view: Option<MatchSnapshot>,
    chat: ChatLog,
    pending_first_mover: Option<usize>,
    start_failed: bool,
    coin_called: bool,
    rematch: RematchHandshake,
    ballot: Option<ThemeBallot>,
    result_recorded: bool,
    events: mpsc::UnboundedSender<CoordinatorEvent>,
    internal: mpsc::UnboundedSender<Inbound>,
    clock: Option<JoinHandle<()>>,
    computer_move: Option<JoinHandle<()>>,
    rng: StdRng,
}

impl MatchCoordinator {
    /// Against a remote peer over `link`.
    pub fn with_peer(
        role: PeerRole,
        local: Identity,
        link: LinkSender,
        services: Services,
        events: mpsc::UnboundedSender<CoordinatorEvent>,
        internal: mpsc::UnboundedSender<Inbound>,
    ) -> Self {
        Self::build(role, MatchMode::HumanVsHuman, local, Some(link), None, services, events, internal)
    }

    /// Against the computer. The local human always holds the Authority.
    pub fn with_computer(
        local: Identity,
        computer: ComputerAgent,
        services: Services,
        events: mpsc::UnboundedSender<CoordinatorEvent>,
        internal: mpsc::UnboundedSender<Inbound>,
    ) -> Self {
        Self::build(
            PeerRole::Authority,
            MatchMode::HumanVsComputer,
            local,
            None,
            Some(computer),
            services,
            events,
            internal,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        role: PeerRole,
        mode: MatchMode,
        local: Identity,
        link: Option<LinkSender>,
        computer: Option<ComputerAgent>,
        services: Services,
        events: mpsc::UnboundedSender<CoordinatorEvent>,
        internal: mpsc::UnboundedSender<Inbound>,
    ) -> Self {
        Self {
            role,
            mode,
            local,
            opponent: None,
            link,
            computer,
            services,
            engine: None,
            view: None,
            chat: ChatLog::new(),
            pending_first_mover: None,
            start_failed: false,
            coin_called: false,
            rematch: RematchHandshake::default(),
            ballot: None,
            result_recorded: false,
            events,
            internal,
            clock: None,
            computer_move: None,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn view(&self) -> Option<&MatchSnapshot> {
        self.view.as_ref()
    }

    /// Announce ourselves, or against the computer go straight into the first match.
    pub async fn open(&mut self) -> Result<(), MatchError> {
        if self.link.is_some() {
            self.send_peer(PeerMessage::IdentityExchange {
                identity: self.local.clone(),
            })?;
        }

        if let Some(agent) = &self.computer {
            let identity = agent.identity();
            self.opponent = Some(identity.clone());
            self.emit(CoordinatorEvent::PeerIdentified { identity });
            self.pending_first_mover = Some(0);
            self.start_match(None).await?;
        }
        Ok(())
    }

    pub async fn handle(&mut self, inbound: Inbound) -> Result<Flow, MatchError> {
        match inbound {
            Inbound::Local(LocalCommand::Quit) => return Ok(Flow::Stop),
            Inbound::Local(command) => self.handle_local(command).await?,
            Inbound::Peer(message) => self.handle_peer(message).await?,
            Inbound::LinkClosed => return Err(MatchError::LinkLost),
            Inbound::Tick { generation } => self.handle_tick(generation).await?,
            Inbound::ComputerMove { generation } => self.handle_computer_move(generation).await?,
            Inbound::ComputerLine { text } => self.handle_computer_line(&text)?,
        }
        Ok(Flow::Continue)
    }

    /// Tell the peer we are going down because of `error`.
    pub fn report_fault(&self, error: &MatchError) {
        if error.is_terminal() {
            return;
        }
        let _ = self.send_peer(PeerMessage::Fault {
            message: error.to_string(),
        });
    }

    /// Stop every timer and tell the local user the session is over.
    pub fn shutdown(&mut self, error: Option<MatchError>) {
        self.stop_timers();
        self.emit(CoordinatorEvent::SessionEnded { error });
    }

    async fn handle_local(&mut self, command: LocalCommand) -> Result<(), MatchError> {
        match command {
            LocalCommand::SelectCells(cells) => self.submit(ActionIntent::SelectCells { cells }).await,
            LocalCommand::SelectWord(text) => self.submit(ActionIntent::SelectWord { text }).await,
            LocalCommand::SpendBonus => self.submit(ActionIntent::SpendBonus).await,
            LocalCommand::Forfeit => self.submit(ActionIntent::Forfeit).await,
            LocalCommand::Chat(text) => self.post_chat(&text),
            LocalCommand::CallCoin(call) => self.call_coin(call),
            LocalCommand::StartMatch { theme } => self.request_start(theme).await,
            LocalCommand::RequestRematch => self.request_rematch().await,
            LocalCommand::VoteTheme(theme) => self.vote(&theme).await,
            LocalCommand::Quit => Ok(()),
        }
    }

    async fn handle_peer(&mut self, message: PeerMessage) -> Result<(), MatchError> {
        debug!("Handling {} as {:?}", message.kind(), self.role);

        match (self.role, message) {
            (_, PeerMessage::IdentityExchange { identity }) => {
                info!("Opponent is {}", identity.display_name);
                self.opponent = Some(identity.clone());
                self.emit(CoordinatorEvent::PeerIdentified { identity });
                if self.role == PeerRole::Mirror {
                    self.emit(CoordinatorEvent::CoinCallRequested);
                }
                Ok(())
            }
            (_, PeerMessage::Fault { message }) => Err(MatchError::RemoteFault { message }),
            (_, PeerMessage::ChatMessage { message }) => {
                self.chat.push(message.clone());
                self.emit(CoordinatorEvent::ChatReceived { message });
                Ok(())
            }
            (_, PeerMessage::RematchFlag) => self.remote_rematch_flag(),
            (_, PeerMessage::ThemeVote { theme }) => {
                let remote = self.remote_role();
                match self.ballot.as_mut() {
                    Some(ballot) => {
                        ballot.cast(remote, &theme);
                    }
                    None => warn!("Theme vote '{}' arrived with no vote open", theme),
                }
                self.try_resolve_vote().await
            }

            (PeerRole::Authority, PeerMessage::CoinFlipCall { call }) => self.flip_for(call).await,
            (PeerRole::Authority, PeerMessage::ActionIntent { intent }) => {
                let Some(actor) = self.opponent.as_ref().map(|o| o.id) else {
                    warn!("Intent from a peer that never identified");
                    return Ok(());
                };
                self.apply_intent(actor, intent).await
            }

            (PeerRole::Mirror, PeerMessage::CoinFlipOutcome { outcome }) => {
                info!("Coin landed {:?}, contestant {} opens", outcome.result, outcome.winner_index);
                self.emit(CoordinatorEvent::CoinFlipResolved { outcome });
                Ok(())
            }
            (PeerRole::Mirror, PeerMessage::MatchStart { first_mover_index, puzzle, .. }) => {
                info!("Match starting with {} words", puzzle.words.len());
                self.reset_between_matches();
                self.view = None;
                self.emit(CoordinatorEvent::MatchStarted {
                    first_mover_index,
                    theme: None,
                });
                Ok(())
            }
            (PeerRole::Mirror, PeerMessage::StateSnapshot { snapshot }) => {
                self.chat.replace(snapshot.chat.clone());
                self.view = Some(snapshot.clone());
                self.emit(CoordinatorEvent::StateUpdated { snapshot });
                Ok(())
            }
            (PeerRole::Mirror, PeerMessage::MatchOver { winner_id, final_contestants }) => {
                self.record_result(winner_id, &final_contestants).await;
                self.emit(CoordinatorEvent::MatchOver {
                    winner_id,
                    final_contestants,
                });
                Ok(())
            }
            (PeerRole::Mirror, PeerMessage::MatchStartFailed { theme, reason }) => {
                warn!("Host could not start a match on '{}': {}", theme, reason);
                self.emit(CoordinatorEvent::StartFailed { theme, reason });
                Ok(())
            }
            (PeerRole::Mirror, PeerMessage::ThemeOptions { themes }) => {
                self.ballot = Some(ThemeBallot::new(themes.clone()));
                self.emit(CoordinatorEvent::ThemeVoteOpened { options: themes });
                Ok(())
            }

            (role, message) => Err(MatchError::InvalidMatchState {
                current_state: format!("{:?} cannot accept {}", role, message.kind()),
            }),
        }
    }

    async fn submit(&mut self, intent: ActionIntent) -> Result<(), MatchError> {
        match self.role {
            PeerRole::Authority => self.apply_intent(self.local.id, intent).await,
            PeerRole::Mirror => {
                let Some(view) = self.view.as_ref().filter(|view| !view.is_over()) else {
                    self.refuse("no match in progress");
                    return Ok(());
                };
                let our_turn = view
                    .active_contestant()
                    .is_some_and(|active| active.id == self.local.id);
                if !our_turn && intent != ActionIntent::Forfeit {
                    self.emit(CoordinatorEvent::ActionRefused {
                        error: MatchError::OwnershipViolation {
                            contestant_id: self.local.id,
                            violation: Violation::NotYourTurn,
                        },
                    });
                    return Ok(());
                }

                // Misses never reach the Authority; only likely finds are forwarded.
                let target = view.turn.target_word.as_ref();
                let judged = match &intent {
                    ActionIntent::SelectCells { cells } => {
                        Some(selection_hits(target, cells, view.puzzle.grid.size))
                    }
                    ActionIntent::SelectWord { text } => Some(text_hits(target, text)),
                    _ => None,
                };
                let feedback = match judged {
                    Some(Ok(false)) => Some(MatchEvent::SelectionMissed {
                        contestant_id: self.local.id,
                    }),
                    Some(Err(reason)) => Some(MatchEvent::SelectionRejected {
                        contestant_id: self.local.id,
                        reason,
                    }),
                    _ => None,
                };
                if let Some(event) = feedback {
                    self.emit(CoordinatorEvent::SelectionFeedback { event });
                    return Ok(());
                }
                self.send_peer(PeerMessage::ActionIntent { intent })
            }
        }
    }

    async fn apply_intent(
        &mut self,
        actor: ContestantId,
        intent: ActionIntent,
    ) -> Result<(), MatchError> {
        let Some(engine) = self.engine.as_mut() else {
            if actor == self.local.id {
                self.refuse("no match in progress");
            }
            return Ok(());
        };

        let turn_before = engine.turn().turn_number;
        let result = match intent {
            ActionIntent::SelectCells { cells } => engine.select_cells(actor, &cells),
            ActionIntent::SelectWord { text } => engine.select_text(actor, &text),
            ActionIntent::SpendBonus => engine.spend_bonus(actor),
            ActionIntent::Forfeit => engine.forfeit(actor),
        };

        match result {
            Ok(events) => self.after_mutation(Some(actor), turn_before, events).await,
            Err(error) => {
                if actor == self.local.id {
                    self.emit(CoordinatorEvent::ActionRefused { error });
                }
                Ok(())
            }
        }
    }

    async fn handle_tick(&mut self, generation: u64) -> Result<(), MatchError> {
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        let turn_before = engine.turn().turn_number;
        if turn_before != generation || engine.is_over() {
            debug!("Dropping stale tick for turn {}", generation);
            return Ok(());
        }

        let events = engine.tick();
        self.after_mutation(None, turn_before, events).await
    }

    async fn handle_computer_move(&mut self, generation: u64) -> Result<(), MatchError> {
        let (Some(engine), Some(agent)) = (self.engine.as_ref(), self.computer.as_ref()) else {
            return Ok(());
        };
        if engine.turn().turn_number != generation || engine.is_over() {
            return Ok(());
        }
        let computer_id = engine.active_contestant().id;
        if !engine.active_contestant().is_computer {
            return Ok(());
        }
        let Some(cells) = agent.plan_selection(engine.turn()) else {
            return Ok(());
        };

        self.apply_intent(computer_id, ActionIntent::SelectCells { cells }).await
    }

    fn handle_computer_line(&mut self, text: &str) -> Result<(), MatchError> {
        let Some(identity) = self.computer.as_ref().map(|agent| agent.identity()) else {
            return Ok(());
        };
        if let Some(message) = self.chat.post(&identity, text) {
            self.emit(CoordinatorEvent::ChatReceived { message });
            if self.engine.is_some() {
                self.broadcast_snapshot()?;
            }
        }
        Ok(())
    }

    async fn after_mutation(
        &mut self,
        actor: Option<ContestantId>,
        turn_before: u64,
        events: Vec<MatchEvent>,
    ) -> Result<(), MatchError> {
        for event in &events {
            match event {
                MatchEvent::SelectionMissed { .. } | MatchEvent::SelectionRejected { .. }
                    if actor == Some(self.local.id) =>
                {
                    self.emit(CoordinatorEvent::SelectionFeedback {
                        event: event.clone(),
                    });
                }
                _ => {}
            }
        }
        self.react_to_events(&events);

        if any_state_change(&events) {
            self.broadcast_snapshot()?;
        }

        let Some(engine) = self.engine.as_ref() else {
            return Ok(());
        };
        if engine.is_over() {
            self.finish_match().await?;
        } else if engine.turn().turn_number != turn_before {
            self.restart_clock();
            self.schedule_computer();
        }
        Ok(())
    }

    /// Hand notable moments to the computer opponent, which may decide to comment.
    fn react_to_events(&mut self, events: &[MatchEvent]) {
        let Some(computer_id) = self.computer.as_ref().map(|agent| agent.identity().id) else {
            return;
        };
        for event in events {
            let kind = match event {
                MatchEvent::WordFound { contestant_id, .. } if *contestant_id == computer_id => {
                    ChatEventKind::ComputerFoundWord
                }
                MatchEvent::WordFound { .. } => ChatEventKind::OpponentFoundWord,
                MatchEvent::StealOpened { stealer_id, .. } if *stealer_id == computer_id => {
                    ChatEventKind::ComputerStealChance
                }
                _ => continue,
            };
            self.computer_comment(kind);
        }
    }

    fn computer_comment(&mut self, kind: ChatEventKind) {
        let (Some(agent), Some(engine)) = (self.computer.as_mut(), self.engine.as_ref()) else {
            return;
        };
        let contestants = engine.contestants();
        let Some(request) =
            agent.consider_comment(kind, &contestants[1], &contestants[0], Instant::now())
        else {
            return;
        };

        let flavor = self.services.flavor.clone();
        let internal = self.internal.clone();
        tokio::spawn(async move {
            let line = flavor.generate_line(&request).await;
            if !line.is_empty() {
                let _ = internal.send(Inbound::ComputerLine { text: line });
            }
        });
    }

    fn post_chat(&mut self, text: &str) -> Result<(), MatchError> {
        let Some(message) = self.chat.post(&self.local, text) else {
            return Ok(());
        };
        self.send_peer(PeerMessage::ChatMessage {
            message: message.clone(),
        })?;
        self.emit(CoordinatorEvent::ChatReceived { message });
        Ok(())
    }

    fn call_coin(&mut self, call: CoinSide) -> Result<(), MatchError> {
        if self.role != PeerRole::Mirror {
            self.refuse("only the joining side calls the coin");
            return Ok(());
        }
        if self.opponent.is_none() || self.coin_called {
            self.refuse("no coin flip pending");
            return Ok(());
        }
        self.coin_called = true;
        self.send_peer(PeerMessage::CoinFlipCall { call })
    }

    async fn flip_for(&mut self, call: CoinSide) -> Result<(), MatchError> {
        if self.pending_first_mover.is_some() || self.engine.is_some() {
            warn!("Ignoring coin call, order already settled");
            return Ok(());
        }

        let outcome = resolve_coin_flip(call, flip_coin(&mut self.rng));
        info!(
            "Coin landed {:?} on a call of {:?}, contestant {} opens",
            outcome.result, call, outcome.winner_index
        );
        self.send_peer(PeerMessage::CoinFlipOutcome { outcome })?;
        self.emit(CoordinatorEvent::CoinFlipResolved { outcome });

        self.pending_first_mover = Some(outcome.winner_index);
        self.start_match(None).await
    }

    async fn request_start(&mut self, theme: Option<String>) -> Result<(), MatchError> {
        if self.role != PeerRole::Authority {
            self.refuse("only the hosting side starts matches");
            return Ok(());
        }
        if self.pending_first_mover.is_none() {
            self.refuse("the coin has not been flipped yet");
            return Ok(());
        }
        if self.engine.as_ref().is_some_and(|engine| !engine.is_over()) {
            self.refuse("a match is already in progress");
            return Ok(());
        }
        // Manual starts only retry a failed start; later matches go through the rematch vote.
        if self.engine.is_some() && !self.start_failed {
            self.refuse("request a rematch to play again");
            return Ok(());
        }
        self.start_match(theme).await
    }

    /// Build a fresh puzzle and engine. Failures to get a playable puzzle are reported
    /// to the local user and leave the session waiting for another start.
    async fn start_match(&mut self, theme: Option<String>) -> Result<(), MatchError> {
        let Some(opponent) = self.opponent.clone() else {
            self.refuse("the opponent has not identified yet");
            return Ok(());
        };
        if self.engine.as_ref().is_some_and(|engine| !engine.is_over()) {
            self.refuse("a match is already in progress");
            return Ok(());
        }

        let first_mover = self.pending_first_mover.unwrap_or(0);
        let theme = theme.unwrap_or_else(|| random_theme(&mut self.rng));
        let config = MatchConfig::for_mode(self.mode);
        info!("Starting match on '{}'", theme);

        let words = match self
            .services
            .words
            .fetch_words(&theme, config.total_words_requested as usize)
            .await
        {
            Ok(words) => words,
            Err(e) => {
                warn!("Word supplier failed for '{}': {}", theme, e);
                return self.report_start_failure(theme, e.to_string());
            }
        };

        let engine = match self.build_engine(&words, config, vec![&self.local, &opponent], first_mover) {
            Ok(engine) => engine,
            Err(e) => {
                warn!("Could not start match on '{}': {}", theme, e);
                return self.report_start_failure(theme, e.to_string());
            }
        };

        self.send_peer(PeerMessage::MatchStart {
            first_mover_index: first_mover,
            puzzle: engine.puzzle().clone(),
            config: engine.config().clone(),
        })?;

        self.reset_between_matches();
        self.engine = Some(engine);
        self.start_failed = false;
        self.emit(CoordinatorEvent::MatchStarted {
            first_mover_index: first_mover,
            theme: Some(theme),
        });

        self.broadcast_snapshot()?;
        self.restart_clock();
        self.schedule_computer();
        self.computer_comment(ChatEventKind::MatchStart);
        Ok(())
    }

    fn report_start_failure(&mut self, theme: String, reason: String) -> Result<(), MatchError> {
        self.start_failed = true;
        self.send_peer(PeerMessage::MatchStartFailed {
            theme: theme.clone(),
            reason: reason.clone(),
        })?;
        self.emit(CoordinatorEvent::StartFailed { theme, reason });
        Ok(())
    }

    fn build_engine(
        &self,
        words: &[String],
        config: MatchConfig,
        identities: Vec<&Identity>,
        first_mover: usize,
    ) -> Result<TurnEngine, MatchError> {
        let requested = config.total_words_requested;
        if (words.len() as u32) < requested {
            return Err(MatchError::GenerationShortfall {
                usable: words.len() as u32,
                required: requested,
            });
        }

        let puzzle = PuzzleGenerator::new(config.grid_size).generate(words);
        ensure_playable(&puzzle, config.words_required)?;

        let contestants = identities.into_iter().map(Contestant::new).collect();
        TurnEngine::new(contestants, puzzle, config, first_mover)
    }

    fn reset_between_matches(&mut self) {
        self.chat.clear();
        self.rematch.reset();
        self.ballot = None;
        self.result_recorded = false;
    }

    fn broadcast_snapshot(&mut self) -> Result<(), MatchError> {
        let Some(engine) = self.engine.as_ref() else {
            return Ok(());
        };
        let snapshot = engine.snapshot(self.chat.messages());
        self.view = Some(snapshot.clone());
        self.send_peer(PeerMessage::StateSnapshot {
            snapshot: snapshot.clone(),
        })?;
        self.emit(CoordinatorEvent::StateUpdated { snapshot });
        Ok(())
    }

    async fn finish_match(&mut self) -> Result<(), MatchError> {
        self.stop_timers();
        let Some((winner_id, reason)) = self.engine.as_ref().and_then(|e| e.outcome()) else {
            return Ok(());
        };
        let final_contestants = self
            .engine
            .as_ref()
            .map(|e| e.contestants().to_vec())
            .unwrap_or_default();
        info!("Match over: {} wins ({:?})", winner_id, reason);

        self.send_peer(PeerMessage::MatchOver {
            winner_id,
            final_contestants: final_contestants.clone(),
        })?;
        self.record_result(winner_id, &final_contestants).await;
        self.emit(CoordinatorEvent::MatchOver {
            winner_id,
            final_contestants,
        });
        Ok(())
    }

    async fn record_result(&mut self, winner_id: ContestantId, contestants: &[Contestant]) {
        if self.result_recorded {
            return;
        }
        let winner = contestants.iter().find(|c| c.id == winner_id);
        let loser = contestants.iter().find(|c| c.id != winner_id);
        if let (Some(winner), Some(loser)) = (winner, loser) {
            self.services.stats.record_result(winner, loser).await;
            self.result_recorded = true;
        }
    }

    fn match_finished(&self) -> bool {
        match self.role {
            PeerRole::Authority => self.engine.as_ref().is_some_and(|e| e.is_over()),
            PeerRole::Mirror => self.view.as_ref().is_some_and(|v| v.is_over()),
        }
    }

    async fn request_rematch(&mut self) -> Result<(), MatchError> {
        if !self.match_finished() {
            self.refuse("no finished match to replay");
            return Ok(());
        }
        if self.rematch.local_flagged() {
            return Ok(());
        }

        let mut agreed = self.rematch.flag_local();
        self.send_peer(PeerMessage::RematchFlag)?;
        if self.computer.is_some() {
            agreed = self.rematch.flag_remote();
        }
        if agreed {
            self.open_vote().await?;
        }
        Ok(())
    }

    fn remote_rematch_flag(&mut self) -> Result<(), MatchError> {
        if !self.match_finished() {
            warn!("Rematch flag arrived before the match ended");
            return Ok(());
        }
        self.emit(CoordinatorEvent::RematchRequested);
        if self.rematch.flag_remote() && self.role == PeerRole::Authority {
            self.offer_themes()?;
        }
        Ok(())
    }

    async fn open_vote(&mut self) -> Result<(), MatchError> {
        if self.role == PeerRole::Authority {
            self.offer_themes()?;
            self.try_resolve_vote().await?;
        }
        Ok(())
    }

    /// Authority draws the options; the computer votes as soon as they exist.
    fn offer_themes(&mut self) -> Result<(), MatchError> {
        let options = draw_theme_options(&mut self.rng);
        let mut ballot = ThemeBallot::new(options.clone());
        if let Some(agent) = self.computer.as_mut() {
            if let Some(vote) = agent.vote_theme(&options) {
                debug!("Computer votes for '{}'", vote);
                ballot.cast(PeerRole::Mirror, &vote);
            }
        }
        self.ballot = Some(ballot);

        self.send_peer(PeerMessage::ThemeOptions {
            themes: options.clone(),
        })?;
        self.emit(CoordinatorEvent::ThemeVoteOpened { options });
        Ok(())
    }

    async fn vote(&mut self, theme: &str) -> Result<(), MatchError> {
        let role = self.role;
        let Some(ballot) = self.ballot.as_mut() else {
            self.refuse("no theme vote open");
            return Ok(());
        };
        let Some(choice) = ballot
            .options()
            .iter()
            .find(|option| option.eq_ignore_ascii_case(theme.trim()))
            .cloned()
        else {
            self.refuse("that theme is not on offer");
            return Ok(());
        };

        if !ballot.cast(role, &choice) {
            self.refuse("already voted");
            return Ok(());
        }
        if self.link.is_some() {
            self.send_peer(PeerMessage::ThemeVote { theme: choice })?;
        }
        self.try_resolve_vote().await
    }

    async fn try_resolve_vote(&mut self) -> Result<(), MatchError> {
        let Some(ballot) = self.ballot.as_ref() else {
            return Ok(());
        };
        let Some(theme) = ballot.resolve(self.mode, &mut self.rng) else {
            return Ok(());
        };
        info!("Next theme is '{}'", theme);
        self.ballot = None;
        self.emit(CoordinatorEvent::ThemeChosen {
            theme: theme.clone(),
        });

        if self.role == PeerRole::Authority {
            let previous = self
                .engine
                .as_ref()
                .map(|e| e.first_mover_index())
                .unwrap_or(0);
            self.pending_first_mover = Some(next_first_mover(self.mode, previous));
            self.start_match(Some(theme)).await?;
        }
        Ok(())
    }

    fn remote_role(&self) -> PeerRole {
        match self.role {
            PeerRole::Authority => PeerRole::Mirror,
            PeerRole::Mirror => PeerRole::Authority,
        }
    }

    fn restart_clock(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
        let Some(engine) = self.engine.as_ref().filter(|e| !e.is_over()) else {
            return;
        };

        let generation = engine.turn().turn_number;
        let internal = self.internal.clone();
        self.clock = Some(tokio::spawn(async move {
            let period = Duration::from_secs(1);
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                if internal.send(Inbound::Tick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn schedule_computer(&mut self) {
        if let Some(pending) = self.computer_move.take() {
            pending.abort();
        }
        let (Some(agent), Some(engine)) = (self.computer.as_mut(), self.engine.as_ref()) else {
            return;
        };
        if engine.is_over() || !engine.active_contestant().is_computer {
            return;
        }

        let generation = engine.turn().turn_number;
        let delay = agent.think_time();
        debug!("Computer answers turn {} in {:?}", generation, delay);
        let internal = self.internal.clone();
        self.computer_move = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = internal.send(Inbound::ComputerMove { generation });
        }));
    }

    fn stop_timers(&mut self) {
        if let Some(clock) = self.clock.take() {
            clock.abort();
        }
        if let Some(pending) = self.computer_move.take() {
            pending.abort();
        }
    }

    fn send_peer(&self, message: PeerMessage) -> Result<(), MatchError> {
        match &self.link {
            Some(link) => link.send(message).map_err(|_| MatchError::LinkLost),
            None => Ok(()),
        }
    }

    fn refuse(&self, reason: &str) {
        debug!("Refusing local command: {}", reason);
        self.emit(CoordinatorEvent::ActionRefused {
            error: MatchError::InvalidMatchState {
                current_state: reason.to_string(),
            },
        });
    }

    fn emit(&self, event: CoordinatorEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for MatchCoordinator {
    fn drop(&mut self) {
        self.stop_timers();
    }
}
