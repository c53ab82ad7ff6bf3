//! Session controller for the hunt: owns the player record and drives it
//! from clock ticks, decoded codes, and backend responses.

pub mod clock;
pub mod player;
pub mod scan_gate;
pub mod state_machine;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    api::{
        GameBackend,
        models::{QrCodePayload, ScanOutcome, ScanRequest},
    },
    error::{GameErrorKind, classify},
    scanner::ScannerHandle,
    session::{
        clock::{ClockHandle, Tick},
        player::{PlayerSession, ScanAttempt},
        scan_gate::{Admission, ScanGate},
        state_machine::{Phase, SessionEvent, SessionStateMachine, TickOutcome},
    },
};

/// Total play budget granted at registration.
pub const GAME_DURATION_SECS: u32 = 60 * 60;

/// Channels and handles connecting the controller to its collaborators.
pub struct SessionIo {
    /// Handle used to stop the countdown source at teardown.
    pub clock: ClockHandle,
    /// Inbound once-per-second ticks.
    pub ticks: mpsc::UnboundedReceiver<Tick>,
    /// Handle used to stop the decoder at teardown.
    pub scanner: ScannerHandle,
    /// Inbound decoded-text events.
    pub codes: mpsc::UnboundedReceiver<String>,
}

/// Where the session ended up once the controller returned.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Phase at teardown; terminal unless an input source closed early.
    pub phase: Phase,
    /// Final player record.
    pub session: PlayerSession,
}

impl SessionOutcome {
    /// Whether the stored identity must be discarded.
    pub fn discard_identity(&self) -> bool {
        self.phase.is_terminal()
    }
}

/// Drives one player's hunt from bootstrap to a terminal phase.
///
/// The controller is a single task: every mutation of the player record
/// happens between its `await` points, and the scan gate serializes result
/// application, so a second admitted attempt can never overtake the first.
pub struct SessionController {
    backend: Arc<dyn GameBackend>,
    machine: SessionStateMachine,
    gate: ScanGate,
    io: SessionIo,
    debug: bool,
}

impl SessionController {
    /// Wire a controller for the given player against a backend.
    pub fn new(
        backend: Arc<dyn GameBackend>,
        player_id: impl Into<String>,
        debug: bool,
        io: SessionIo,
    ) -> Self {
        Self {
            backend,
            machine: SessionStateMachine::new(player_id),
            gate: ScanGate::new(),
            io,
            debug,
        }
    }

    /// Run until a terminal phase is reached or every input source closes.
    pub async fn run(mut self) -> SessionOutcome {
        self.bootstrap().await;

        while !self.machine.phase().is_terminal() {
            tokio::select! {
                tick = self.io.ticks.recv() => match tick {
                    Some(Tick) => self.on_tick(),
                    None => {
                        debug!("tick source closed; tearing down");
                        break;
                    }
                },
                code = self.io.codes.recv() => match code {
                    Some(code) => self.on_code(code).await,
                    None => {
                        debug!("decoder source closed; tearing down");
                        break;
                    }
                },
            }
        }

        self.teardown()
    }

    /// Reconcile the authoritative backend state into the machine before
    /// normal operation begins.
    async fn bootstrap(&mut self) {
        match self.backend.player_state().await {
            Ok(state) => {
                if let Some(completion_time) = state.completion_time {
                    info!(completion_time, "session was already completed");
                    self.apply(SessionEvent::BootstrapCompleted { completion_time });
                    return;
                }

                // An expired player gets a bare message body: the backend has
                // already discarded the record and the time fields are gone.
                let Some(time_left) = state.time_left else {
                    info!(message = ?state.message, "backend reports the session expired");
                    self.apply(SessionEvent::TimeExpired);
                    return;
                };

                let current_level = state.current_level.unwrap_or(0);
                info!(current_level, time_left, "resuming from server state");
                self.apply(SessionEvent::BootstrapLoaded {
                    current_level,
                    time_left,
                });
                self.seed_hint(current_level).await;
            }
            Err(err) => match classify(&err) {
                GameErrorKind::PlayerNotFound => {
                    warn!(error = %err, "player unknown at bootstrap");
                    self.apply(SessionEvent::PlayerUnknown);
                }
                GameErrorKind::TimeExpired => {
                    warn!(error = %err, "session expired at bootstrap");
                    self.apply(SessionEvent::TimeExpired);
                }
                _ => {
                    // Start from local defaults; the next scan reaches the
                    // backend and resolves the truth either way.
                    warn!(error = %err, "player state fetch failed; starting from defaults");
                    self.apply(SessionEvent::BootstrapLoaded {
                        current_level: 0,
                        time_left: GAME_DURATION_SECS,
                    });
                }
            },
        }
    }

    /// Seed the display with the hint for the resumed level.
    async fn seed_hint(&mut self, level: u32) {
        match self.backend.hints().await {
            Ok(hints) => match hints.into_iter().nth(level as usize) {
                Some(entry) => {
                    info!(level, hint = %entry.text, "hint seeded");
                    self.machine.seed_hint(entry.into());
                }
                None => warn!(level, "no hint published for the current level"),
            },
            Err(err) => warn!(error = %err, "hint fetch failed; display stays unseeded"),
        }
    }

    fn on_tick(&mut self) {
        match self.machine.tick() {
            TickOutcome::LocallyExpired => info!("countdown reached zero; session expired"),
            TickOutcome::Counting(remaining) if remaining % 60 == 0 => {
                info!(minutes_left = remaining / 60, "countdown");
            }
            TickOutcome::Counting(_) | TickOutcome::Frozen => {}
        }
    }

    /// One admission cycle: gate, submit, apply, release.
    async fn on_code(&mut self, code: String) {
        if self.machine.phase() != Phase::InProgress {
            debug!(%code, phase = ?self.machine.phase(), "ignoring decoded code");
            return;
        }

        match self.gate.admit(&code) {
            Admission::RejectedDuplicate => {
                debug!(%code, "duplicate code suppressed");
                return;
            }
            Admission::RejectedBusy => {
                debug!(%code, "attempt already in flight");
                return;
            }
            Admission::Admitted => {}
        }

        let attempt = ScanAttempt::new(code, self.machine.session().current_level + 1, self.debug);
        self.apply(SessionEvent::ScanAdmitted);
        self.submit(attempt).await;
        self.gate.release();
    }

    /// Submit the admitted attempt and apply the backend's verdict.
    async fn submit(&mut self, attempt: ScanAttempt) {
        let request = ScanRequest {
            player_id: self.machine.session().player_id.clone(),
            qr_code: QrCodePayload {
                code: attempt.raw_code,
                level: attempt.target_level,
            },
            debug: attempt.debug,
        };

        let result = self.backend.submit_scan(request).await;
        debug!(
            elapsed_ms = attempt.submitted_at.elapsed().as_millis() as u64,
            "scan round trip finished"
        );

        match result {
            Ok(response) => match response.into_outcome() {
                ScanOutcome::Completed { completion_time } => {
                    info!(completion_time, "game completed");
                    self.apply(SessionEvent::GameCompleted { completion_time });
                }
                ScanOutcome::NextHint(hint) => {
                    info!(
                        level = attempt.target_level,
                        hint = %hint.text,
                        "correct code; next hint revealed"
                    );
                    self.apply(SessionEvent::HintRevealed { hint });
                }
                ScanOutcome::Notice(message) => {
                    debug!(%message, "scan acknowledged without progression");
                    self.apply(SessionEvent::ScanNotice { message });
                }
            },
            Err(err) => {
                let kind = classify(&err);
                warn!(error = %err, ?kind, "scan rejected");
                match kind {
                    GameErrorKind::PlayerNotFound => self.apply(SessionEvent::PlayerUnknown),
                    GameErrorKind::TimeExpired => self.apply(SessionEvent::TimeExpired),
                    kind => self.apply(SessionEvent::ScanFailed { kind }),
                }
            }
        }
    }

    fn apply(&mut self, event: SessionEvent) {
        // Transitions issued here are valid by construction; a rejection
        // indicates a controller bug, not a recoverable condition.
        if let Err(err) = self.machine.apply(event) {
            error!(%err, "event rejected by the session state machine");
        }
    }

    /// Stop the collaborators and surrender the final record. Nothing
    /// mutates the session after this point; still-queued events die with
    /// the receivers.
    fn teardown(mut self) -> SessionOutcome {
        self.io.clock.stop();
        self.io.scanner.stop();
        self.gate.reset();

        let phase = self.machine.phase();
        SessionOutcome {
            phase,
            session: self.machine.into_session(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use futures::future::{self, BoxFuture};
    use reqwest::StatusCode;
    use tokio::sync::watch;

    use crate::api::{
        error::{ApiError, ApiResult},
        models::{
            HintEntry, PlayerStateResponse, RegisterRequest, RegisterResponse, ResultsResponse,
            ScanResponse,
        },
    };

    fn status_error(status: u16, detail: Option<&str>) -> ApiError {
        ApiError::Status {
            path: "scripted".into(),
            status: StatusCode::from_u16(status).unwrap(),
            detail: detail.map(str::to_owned),
            error_kind: None,
        }
    }

    fn hint_entry(text: &str) -> HintEntry {
        HintEntry {
            text: text.into(),
            educational_text: None,
        }
    }

    fn running_state(current_level: u32, time_left: u32) -> PlayerStateResponse {
        PlayerStateResponse {
            time_left: Some(time_left),
            current_level: Some(current_level),
            completion_time: None,
            message: None,
        }
    }

    fn hint_response(text: &str) -> ScanResponse {
        ScanResponse {
            hint: Some(text.into()),
            ..ScanResponse::default()
        }
    }

    #[derive(Default)]
    struct ScriptedBackend {
        state: Mutex<Option<ApiResult<PlayerStateResponse>>>,
        hints: Vec<HintEntry>,
        scans: Mutex<VecDeque<ApiResult<ScanResponse>>>,
        scan_count: AtomicUsize,
    }

    impl ScriptedBackend {
        fn with_state(state: PlayerStateResponse) -> Self {
            Self {
                state: Mutex::new(Some(Ok(state))),
                ..Self::default()
            }
        }

        fn with_state_error(error: ApiError) -> Self {
            Self {
                state: Mutex::new(Some(Err(error))),
                ..Self::default()
            }
        }

        fn with_hints(mut self, hints: Vec<HintEntry>) -> Self {
            self.hints = hints;
            self
        }

        fn scan(self, result: ApiResult<ScanResponse>) -> Self {
            self.scans.lock().unwrap().push_back(result);
            self
        }

        fn submissions(&self) -> usize {
            self.scan_count.load(Ordering::SeqCst)
        }
    }

    impl GameBackend for ScriptedBackend {
        fn register(
            &self,
            _request: RegisterRequest,
        ) -> BoxFuture<'static, ApiResult<RegisterResponse>> {
            Box::pin(future::ready(Err(status_error(500, None))))
        }

        fn player_state(&self) -> BoxFuture<'static, ApiResult<PlayerStateResponse>> {
            let result = self
                .state
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(status_error(500, None)));
            Box::pin(future::ready(result))
        }

        fn hints(&self) -> BoxFuture<'static, ApiResult<Vec<HintEntry>>> {
            Box::pin(future::ready(Ok(self.hints.clone())))
        }

        fn submit_scan(
            &self,
            _request: ScanRequest,
        ) -> BoxFuture<'static, ApiResult<ScanResponse>> {
            self.scan_count.fetch_add(1, Ordering::SeqCst);
            let result = self
                .scans
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(status_error(500, None)));
            Box::pin(future::ready(result))
        }

        fn results(&self, _player_id: &str) -> BoxFuture<'static, ApiResult<ResultsResponse>> {
            Box::pin(future::ready(Err(status_error(
                404,
                Some("Player results not found"),
            ))))
        }
    }

    struct Wiring {
        io: SessionIo,
        ticks: mpsc::UnboundedSender<Tick>,
        codes: mpsc::UnboundedSender<String>,
    }

    fn wiring() -> Wiring {
        let (tick_tx, ticks) = mpsc::unbounded_channel();
        let (code_tx, codes) = mpsc::unbounded_channel();
        let (clock, idle_ticks) = clock::start(Duration::from_secs(3600));
        drop(idle_ticks);
        let (stop_tx, _) = watch::channel(false);

        Wiring {
            io: SessionIo {
                clock,
                ticks,
                scanner: ScannerHandle::new(stop_tx),
                codes,
            },
            ticks: tick_tx,
            codes: code_tx,
        }
    }

    fn controller(backend: &Arc<ScriptedBackend>, io: SessionIo) -> SessionController {
        let backend: Arc<dyn GameBackend> = backend.clone();
        SessionController::new(backend, "p-1", false, io)
    }

    #[tokio::test]
    async fn bootstrap_seeds_level_time_and_hint() {
        let backend = Arc::new(
            ScriptedBackend::with_state(running_state(2, 1800)).with_hints(vec![
                hint_entry("first"),
                hint_entry("second"),
                hint_entry("third"),
            ]),
        );
        let Wiring { io, ticks, codes } = wiring();
        drop(codes);

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::InProgress);
        assert_eq!(outcome.session.current_level, 2);
        assert_eq!(outcome.session.time_left_seconds, 1800);
        assert_eq!(
            outcome.session.hint.as_ref().map(|hint| hint.text.as_str()),
            Some("third")
        );
        drop(ticks);
    }

    #[tokio::test]
    async fn bootstrap_completion_disables_scanning() {
        let backend = Arc::new(ScriptedBackend::with_state(PlayerStateResponse {
            completion_time: Some(1500),
            ..PlayerStateResponse::default()
        }));
        let Wiring { io, ticks, codes } = wiring();
        // A code queued before bootstrap must never reach the backend.
        codes.send("qr-1".into()).unwrap();

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::Completed);
        assert_eq!(outcome.session.completion_time_seconds, Some(1500));
        assert_eq!(backend.submissions(), 0);
        drop((ticks, codes));
    }

    #[tokio::test]
    async fn bootstrap_404_invalidates_the_session() {
        let backend = Arc::new(ScriptedBackend::with_state_error(status_error(
            404,
            Some("Player not found"),
        )));
        let Wiring { io, ticks, codes } = wiring();

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::Invalid);
        assert!(outcome.discard_identity());
        drop((ticks, codes));
    }

    #[tokio::test]
    async fn bootstrap_expired_message_body_expires_the_session() {
        let backend = Arc::new(ScriptedBackend::with_state(PlayerStateResponse {
            message: Some("Game time expired".into()),
            ..PlayerStateResponse::default()
        }));
        let Wiring { io, ticks, codes } = wiring();

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::Expired);
        assert_eq!(outcome.session.completion_time_seconds, Some(0));
        drop((ticks, codes));
    }

    #[tokio::test]
    async fn bootstrap_transport_failure_starts_from_defaults() {
        let backend = Arc::new(ScriptedBackend::with_state_error(status_error(500, None)));
        let Wiring { io, ticks, codes } = wiring();
        drop(codes);

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::InProgress);
        assert_eq!(outcome.session.current_level, 0);
        assert_eq!(outcome.session.time_left_seconds, GAME_DURATION_SECS);
        drop(ticks);
    }

    #[tokio::test]
    async fn correct_scan_advances_and_reveals_hint() {
        let backend = Arc::new(
            ScriptedBackend::with_state(running_state(0, 3600))
                .with_hints(vec![hint_entry("first")])
                .scan(Ok(hint_response("second"))),
        );
        let Wiring { io, ticks, codes } = wiring();
        codes.send("qr-1".into()).unwrap();
        drop(codes);

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::InProgress);
        assert_eq!(outcome.session.current_level, 1);
        assert_eq!(
            outcome.session.hint.as_ref().map(|hint| hint.text.as_str()),
            Some("second")
        );
        assert_eq!(outcome.session.notice, None);
        assert_eq!(backend.submissions(), 1);
        drop(ticks);
    }

    #[tokio::test]
    async fn completion_scan_records_server_time() {
        let backend = Arc::new(
            ScriptedBackend::with_state(running_state(4, 600)).scan(Ok(ScanResponse {
                message: Some("game completed".into()),
                completion_time: Some(1200),
                ..ScanResponse::default()
            })),
        );
        let Wiring { io, ticks, codes } = wiring();
        codes.send("qr-final".into()).unwrap();
        // Queued after completion; must be dropped, not submitted.
        codes.send("qr-extra".into()).unwrap();

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::Completed);
        assert_eq!(outcome.session.completion_time_seconds, Some(1200));
        assert_eq!(backend.submissions(), 1);
        drop((ticks, codes));
    }

    #[tokio::test]
    async fn wrong_code_keeps_level_then_admits_a_different_code() {
        let backend = Arc::new(
            ScriptedBackend::with_state(running_state(0, 3600))
                .scan(Err(status_error(400, Some("Wrong QR code"))))
                .scan(Ok(hint_response("second"))),
        );
        let Wiring { io, ticks, codes } = wiring();
        codes.send("qr-bad".into()).unwrap();
        codes.send("qr-good".into()).unwrap();
        drop(codes);

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::InProgress);
        assert_eq!(outcome.session.current_level, 1);
        // The wrong-code notice was set, then cleared by the success.
        assert_eq!(outcome.session.notice, None);
        assert_eq!(backend.submissions(), 2);
        drop(ticks);
    }

    #[tokio::test]
    async fn repeated_identical_codes_submit_once() {
        let backend = Arc::new(
            ScriptedBackend::with_state(running_state(0, 3600))
                .scan(Ok(hint_response("second"))),
        );
        let Wiring { io, ticks, codes } = wiring();
        for _ in 0..5 {
            codes.send("qr-1".into()).unwrap();
        }
        drop(codes);

        let outcome = controller(&backend, io).run().await;

        assert_eq!(backend.submissions(), 1);
        assert_eq!(outcome.session.current_level, 1);
        drop(ticks);
    }

    #[tokio::test]
    async fn rate_limited_scan_keeps_the_session_alive() {
        let backend = Arc::new(
            ScriptedBackend::with_state(running_state(1, 3000))
                .scan(Err(status_error(429, None))),
        );
        let Wiring { io, ticks, codes } = wiring();
        codes.send("qr-2".into()).unwrap();
        drop(codes);

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::InProgress);
        assert_eq!(outcome.session.current_level, 1);
        assert!(outcome.session.notice.is_some());
        drop(ticks);
    }

    #[tokio::test]
    async fn scan_404_is_fatal() {
        let backend = Arc::new(
            ScriptedBackend::with_state(running_state(0, 3600))
                .scan(Err(status_error(404, Some("Player does not exist")))),
        );
        let Wiring { io, ticks, codes } = wiring();
        codes.send("qr-1".into()).unwrap();

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::Invalid);
        assert!(outcome.discard_identity());
        drop((ticks, codes));
    }

    #[tokio::test]
    async fn scan_time_up_expires_the_session() {
        let backend = Arc::new(
            ScriptedBackend::with_state(running_state(2, 5))
                .scan(Err(status_error(400, Some("Game time is up")))),
        );
        let Wiring { io, ticks, codes } = wiring();
        codes.send("qr-3".into()).unwrap();

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::Expired);
        assert_eq!(outcome.session.completion_time_seconds, Some(0));
        assert!(outcome.discard_identity());
        drop((ticks, codes));
    }

    #[tokio::test]
    async fn ticks_decrement_the_countdown() {
        let backend = Arc::new(ScriptedBackend::with_state(running_state(0, 1800)));
        let Wiring { io, ticks, codes } = wiring();
        for _ in 0..3 {
            ticks.send(Tick).unwrap();
        }
        drop(ticks);

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::InProgress);
        assert_eq!(outcome.session.time_left_seconds, 1797);
        drop(codes);
    }

    #[tokio::test]
    async fn local_countdown_expiry_terminates_the_run() {
        let backend = Arc::new(ScriptedBackend::with_state(running_state(0, 2)));
        let Wiring { io, ticks, codes } = wiring();
        ticks.send(Tick).unwrap();
        ticks.send(Tick).unwrap();

        let outcome = controller(&backend, io).run().await;

        assert_eq!(outcome.phase, Phase::Expired);
        assert_eq!(outcome.session.completion_time_seconds, Some(0));
        assert!(outcome.discard_identity());
        drop((ticks, codes));
    }
}
