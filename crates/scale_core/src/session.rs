//! Loop principal da simulação.
//!
//! A cada tick: lê no máximo uma tecla → aplica à máquina de controle →
//! (se rodando) gera, formata e transmite um frame → dorme o intervalo
//! inteiro, pausado ou não. O pedido de saída é uma flag verificada no
//! início do ciclo e logo após cada escrita.

use crate::config::{AppConfig, FrameConfig, ScaleConfig};
use crate::control::{self, ControlEvent, ControlKeys, Transition};
use crate::frame::{format_field, format_frame};
use crate::generator::next_sample;
use crate::messages::{StatusMessage, StatusReporter};
use crate::transport::{FrameSink, TransportError};
use crate::types::SessionState;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Fatia máxima de espera entre verificações da flag de saída.
pub const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

/// Fonte de teclas sem bloqueio.
pub trait ControlInput {
    /// Retorna imediatamente; no máximo um caractere por chamada.
    fn poll(&mut self) -> Option<char>;
}

impl<T: ControlInput + ?Sized> ControlInput for &mut T {
    fn poll(&mut self) -> Option<char> {
        (**self).poll()
    }
}

/// Espera entre ticks.
pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Relógio que acorda cedo quando a saída é pedida.
///
/// Sem pedido de saída dorme o intervalo inteiro, em fatias de
/// [`SHUTDOWN_POLL`].
#[derive(Debug, Clone)]
pub struct ShutdownAwareClock {
    shutdown: ShutdownSignal,
}

impl ShutdownAwareClock {
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self { shutdown }
    }
}

impl Clock for ShutdownAwareClock {
    fn sleep(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        loop {
            if self.shutdown.is_requested() {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep(SHUTDOWN_POLL.min(deadline - now));
        }
    }
}

/// Pedido de encerramento compartilhado com o handler de sinal.
///
/// O handler apenas marca a flag; toda a limpeza roda no fluxo normal.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Contadores da sessão.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames_sent: u64,
    pub manual_resets: u64,
    pub auto_resets: u64,
}

/// Erros que encerram a sessão.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Falha no transporte após {frames_sent} frames: {source}")]
    Transport {
        frames_sent: u64,
        #[source]
        source: TransportError,
    },
}

/// O que aconteceu em um ciclo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Sent,
    Paused,
    Stopped,
}

/// Dono exclusivo do estado da sessão.
pub struct Scheduler<S, I, C, R, P> {
    scale: ScaleConfig,
    frame: FrameConfig,
    keys: ControlKeys,
    tick: Duration,
    sink: S,
    input: I,
    clock: C,
    rng: R,
    reporter: P,
    shutdown: ShutdownSignal,
    state: SessionState,
    summary: SessionSummary,
}

impl<S, I, C, R, P> Scheduler<S, I, C, R, P>
where
    S: FrameSink,
    I: ControlInput,
    C: Clock,
    R: Rng,
    P: StatusReporter,
{
    pub fn new(
        config: &AppConfig,
        sink: S,
        input: I,
        clock: C,
        rng: R,
        reporter: P,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            scale: config.scale.clone(),
            frame: config.frame.clone(),
            keys: ControlKeys::from_config(&config.sender),
            tick: config.sender.tick_interval(),
            sink,
            input,
            clock,
            rng,
            reporter,
            shutdown,
            state: SessionState::new(),
            summary: SessionSummary::default(),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    // ── Ganchos de teste ──

    /// Começa de um estado conhecido em vez de sortear o valor inicial.
    #[cfg(test)]
    pub(crate) fn with_state(mut self, state: SessionState) -> Self {
        self.state = state;
        self
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &SessionState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }

    #[cfg(test)]
    pub(crate) fn reporter(&self) -> &P {
        &self.reporter
    }

    /// Desmonta o scheduler devolvendo o transporte e o reporter.
    pub fn into_parts(self) -> (S, P) {
        (self.sink, self.reporter)
    }

    /// Roda até o pedido de saída. Erro de transporte é fatal.
    pub fn run(&mut self) -> Result<SessionSummary, SessionError> {
        info!(
            "Sessão iniciada: tick {:?}, limite {:.1}",
            self.tick, self.scale.reset_limit
        );

        loop {
            if self.step()? == CycleOutcome::Stopped || self.observe_shutdown() {
                break;
            }
            self.clock.sleep(self.tick);
        }

        info!(
            "Sessão encerrada: {} frames, {} resets manuais, {} automáticos",
            self.summary.frames_sent, self.summary.manual_resets, self.summary.auto_resets
        );
        Ok(self.summary)
    }

    /// Executa um ciclo sem dormir.
    pub fn step(&mut self) -> Result<CycleOutcome, SessionError> {
        if self.observe_shutdown() {
            return Ok(CycleOutcome::Stopped);
        }

        let event = self
            .input
            .poll()
            .map(|c| self.keys.classify(c))
            .unwrap_or(ControlEvent::None);
        if let Some(transition) = control::apply(event, &mut self.state, self.scale.reset_value) {
            self.on_transition(transition);
        }

        if !self.state.is_running() {
            return Ok(CycleOutcome::Paused);
        }

        let sample = next_sample(&mut self.state, &self.scale, &mut self.rng);
        if sample.auto_reset {
            self.summary.auto_resets += 1;
            let reading = self.reading();
            self.reporter.report(StatusMessage::AutoReset { reading });
        }

        let frame = format_frame(sample.value, &self.frame);
        self.sink
            .write_frame(&frame)
            .map_err(|source| SessionError::Transport {
                frames_sent: self.summary.frames_sent,
                source,
            })?;
        self.summary.frames_sent += 1;

        let line = frame.to_string().trim_end_matches(['\r', '\n']).to_string();
        debug!("→ {line}");
        self.reporter.report(StatusMessage::Sent { frame: line });

        Ok(CycleOutcome::Sent)
    }

    fn observe_shutdown(&mut self) -> bool {
        if self.state.shutting_down {
            return true;
        }
        if self.shutdown.is_requested() {
            control::apply(ControlEvent::Quit, &mut self.state, self.scale.reset_value);
            info!("Pedido de encerramento recebido");
            return true;
        }
        false
    }

    fn on_transition(&mut self, transition: Transition) {
        let reading = self.reading();
        match transition {
            Transition::Paused => {
                debug!("Pausado em {reading}");
                self.reporter.report(StatusMessage::Paused { reading });
            }
            Transition::Resumed => {
                debug!("Retomado em {reading}");
                self.reporter.report(StatusMessage::Resumed { reading });
            }
            Transition::Reset { value } => {
                self.summary.manual_resets += 1;
                debug!("Reset manual para {value:.1}");
                self.reporter.report(StatusMessage::ManualReset { reading });
            }
            Transition::Quit => {}
        }
    }

    /// Leitura atual no formato do frame (ex: "+   12.3kg").
    fn reading(&self) -> String {
        match self.state.current_value {
            Some(value) => format!("{}{}", format_field(value, self.frame.field_width), self.frame.unit()),
            None => format!("---{}", self.frame.unit()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::types::RunState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Teclas roteirizadas, uma entrada por ciclo.
    struct Script(VecDeque<Option<char>>);

    impl Script {
        fn new(keys: &[Option<char>]) -> Self {
            Self(keys.iter().copied().collect())
        }
    }

    impl ControlInput for Script {
        fn poll(&mut self) -> Option<char> {
            self.0.pop_front().flatten()
        }
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Frame>,
    }

    impl FrameSink for Recorder {
        fn write_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
            self.frames.push(frame.clone());
            Ok(())
        }
    }

    impl Recorder {
        fn lines(&self) -> Vec<String> {
            self.frames.iter().map(|f| f.to_string()).collect()
        }
    }

    /// Falha a partir da escrita `fail_at`; conta quantas vezes foi liberado.
    struct Flaky {
        fail_at: usize,
        writes: usize,
        drops: Rc<Cell<usize>>,
    }

    impl FrameSink for Flaky {
        fn write_frame(&mut self, _frame: &Frame) -> Result<(), TransportError> {
            self.writes += 1;
            if self.writes >= self.fail_at {
                return Err(TransportError::Write(std::io::Error::other("link caiu")));
            }
            Ok(())
        }
    }

    impl Drop for Flaky {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    /// Relógio real, para testes que só chamam `step`.
    struct ThreadClock;

    impl Clock for ThreadClock {
        fn sleep(&mut self, duration: Duration) {
            std::thread::sleep(duration);
        }
    }

    /// Registra as esperas e pede saída após `stop_after` ticks.
    struct TestClock {
        sleeps: Vec<Duration>,
        stop_after: usize,
        shutdown: ShutdownSignal,
    }

    impl TestClock {
        fn new(stop_after: usize, shutdown: &ShutdownSignal) -> Self {
            Self {
                sleeps: Vec::new(),
                stop_after,
                shutdown: shutdown.clone(),
            }
        }
    }

    impl Clock for TestClock {
        fn sleep(&mut self, duration: Duration) {
            self.sleeps.push(duration);
            if self.sleeps.len() >= self.stop_after {
                self.shutdown.request();
            }
        }
    }

    fn unit_step_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.scale.increment_min = 1.0;
        config.scale.increment_max = 1.0;
        config
    }

    fn scheduler<I: ControlInput>(
        config: &AppConfig,
        input: I,
        shutdown: &ShutdownSignal,
    ) -> Scheduler<Recorder, I, ThreadClock, StdRng, Vec<StatusMessage>> {
        Scheduler::new(
            config,
            Recorder::default(),
            input,
            ThreadClock,
            StdRng::seed_from_u64(99),
            Vec::new(),
            shutdown.clone(),
        )
    }

    #[test]
    fn shutdown_aware_clock_wakes_early() {
        let shutdown = ShutdownSignal::new();
        shutdown.request();
        let mut clock = ShutdownAwareClock::new(shutdown);
        let start = Instant::now();
        clock.sleep(Duration::from_secs(10));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn shutdown_aware_clock_sleeps_full_interval() {
        let mut clock = ShutdownAwareClock::new(ShutdownSignal::new());
        let start = Instant::now();
        clock.sleep(Duration::from_millis(120));
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn one_step_increments_and_transmits() {
        let config = unit_step_config();
        let shutdown = ShutdownSignal::new();
        let mut s = scheduler(&config, Script::new(&[]), &shutdown).with_state(SessionState::with_value(10.0));

        assert_eq!(s.step().unwrap(), CycleOutcome::Sent);
        assert_eq!(s.state().current_value, Some(11.0));
        assert_eq!(s.sink().lines(), vec!["ST,NT,+   11.0kg\r\n"]);
        assert_eq!(
            s.reporter().as_slice(),
            &[StatusMessage::Sent {
                frame: "ST,NT,+   11.0kg".into()
            }]
        );
    }

    #[test]
    fn crossing_limit_transmits_reset_value() {
        let config = unit_step_config();
        let shutdown = ShutdownSignal::new();
        let mut s = scheduler(&config, Script::new(&[]), &shutdown).with_state(SessionState::with_value(1349.9));

        s.step().unwrap();
        assert_eq!(s.sink().lines(), vec!["ST,NT,+    0.0kg\r\n"]);
        assert_eq!(s.summary().auto_resets, 1);
        assert!(matches!(s.reporter()[0], StatusMessage::AutoReset { .. }));
    }

    #[test]
    fn first_step_seeds_from_start_range() {
        let config = AppConfig::default();
        let shutdown = ShutdownSignal::new();
        let mut s = scheduler(&config, Script::new(&[]), &shutdown);

        s.step().unwrap();
        let value = s.state().current_value.unwrap();
        assert!(value >= config.scale.min_start && value <= config.scale.max_start);
        assert_eq!(s.sink().frames.len(), 1);
    }

    #[test]
    fn pause_key_stops_transmission() {
        let config = unit_step_config();
        let shutdown = ShutdownSignal::new();
        let mut s = scheduler(&config, Script::new(&[Some('p'), None, Some('P'), None]), &shutdown)
            .with_state(SessionState::with_value(10.0));

        assert_eq!(s.step().unwrap(), CycleOutcome::Paused);
        assert_eq!(s.state().run_state, RunState::Paused);
        assert_eq!(s.step().unwrap(), CycleOutcome::Paused);
        assert!(s.sink().frames.is_empty());
        assert_eq!(s.state().current_value, Some(10.0));

        assert_eq!(s.step().unwrap(), CycleOutcome::Sent);
        assert_eq!(s.state().run_state, RunState::Running);
        assert_eq!(s.sink().lines(), vec!["ST,NT,+   11.0kg\r\n"]);
    }

    #[test]
    fn paused_session_still_sleeps_full_interval() {
        let mut config = unit_step_config();
        config.sender.interval_secs = 2.0;
        let shutdown = ShutdownSignal::new();
        let mut clock = TestClock::new(3, &shutdown);
        let mut s = Scheduler::new(
            &config,
            Recorder::default(),
            Script::new(&[Some('p')]),
            &mut clock,
            StdRng::seed_from_u64(1),
            Vec::new(),
            shutdown.clone(),
        )
        .with_state(SessionState::with_value(10.0));

        let summary = s.run().unwrap();
        assert_eq!(summary.frames_sent, 0);
        assert!(s.sink().frames.is_empty());
        drop(s);
        assert_eq!(clock.sleeps, vec![Duration::from_secs(2); 3]);
    }

    #[test]
    fn reset_while_paused_stays_paused() {
        let config = unit_step_config();
        let shutdown = ShutdownSignal::new();
        let mut s = scheduler(&config, Script::new(&[Some('p'), Some(' ')]), &shutdown)
            .with_state(SessionState::with_value(800.0));

        s.step().unwrap();
        assert_eq!(s.step().unwrap(), CycleOutcome::Paused);
        assert_eq!(s.state().current_value, Some(0.0));
        assert_eq!(s.state().run_state, RunState::Paused);
        assert!(s.sink().frames.is_empty());
        assert_eq!(s.summary().manual_resets, 1);
        assert_eq!(
            s.reporter().last(),
            Some(&StatusMessage::ManualReset {
                reading: "+    0.0kg".into()
            })
        );
    }

    #[test]
    fn reset_then_send_uses_reset_value() {
        let mut config = unit_step_config();
        config.scale.reset_value = 25.0;
        config.scale.increment_min = 0.0;
        config.scale.increment_max = 0.0;
        let shutdown = ShutdownSignal::new();
        let mut s = scheduler(&config, Script::new(&[Some(' ')]), &shutdown)
            .with_state(SessionState::with_value(600.0));

        s.step().unwrap();
        assert_eq!(s.sink().lines(), vec!["ST,NT,+   25.0kg\r\n"]);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = unit_step_config();
        let shutdown = ShutdownSignal::new();
        let mut s = scheduler(&config, Script::new(&[Some('z'), Some('\u{1b}')]), &shutdown)
            .with_state(SessionState::with_value(1.0));

        s.step().unwrap();
        s.step().unwrap();
        assert_eq!(s.sink().frames.len(), 2);
        assert_eq!(s.state().run_state, RunState::Running);
        assert_eq!(s.summary().manual_resets, 0);
    }

    #[test]
    fn shutdown_request_stops_before_next_cycle() {
        let config = unit_step_config();
        let shutdown = ShutdownSignal::new();
        let mut s = scheduler(&config, Script::new(&[]), &shutdown).with_state(SessionState::with_value(1.0));

        s.step().unwrap();
        shutdown.request();
        assert_eq!(s.step().unwrap(), CycleOutcome::Stopped);
        assert!(s.state().shutting_down);
        assert_eq!(s.sink().frames.len(), 1);
    }

    #[test]
    fn run_sends_one_frame_per_tick() {
        let config = unit_step_config();
        let shutdown = ShutdownSignal::new();
        let mut clock = TestClock::new(4, &shutdown);
        let mut s = Scheduler::new(
            &config,
            Recorder::default(),
            Script::new(&[]),
            &mut clock,
            StdRng::seed_from_u64(5),
            Vec::new(),
            shutdown.clone(),
        )
        .with_state(SessionState::with_value(100.0));

        let summary = s.run().unwrap();
        // 4 ticks dormidos; o quinto ciclo observa o pedido de saída
        assert_eq!(summary.frames_sent, 4);
        assert_eq!(
            s.sink().lines(),
            vec![
                "ST,NT,+  101.0kg\r\n",
                "ST,NT,+  102.0kg\r\n",
                "ST,NT,+  103.0kg\r\n",
                "ST,NT,+  104.0kg\r\n",
            ]
        );
    }

    #[test]
    fn transport_failure_ends_session_and_releases_sink_once() {
        let config = unit_step_config();
        let shutdown = ShutdownSignal::new();
        let drops = Rc::new(Cell::new(0));
        let mut clock = TestClock::new(usize::MAX, &shutdown);
        let mut s = Scheduler::new(
            &config,
            Flaky {
                fail_at: 3,
                writes: 0,
                drops: drops.clone(),
            },
            Script::new(&[]),
            &mut clock,
            StdRng::seed_from_u64(5),
            Vec::new(),
            shutdown.clone(),
        );

        let err = s.run().unwrap_err();
        assert!(matches!(err, SessionError::Transport { frames_sent: 2, .. }));
        assert_eq!(drops.get(), 0);
        drop(s);
        assert_eq!(drops.get(), 1);
        assert_eq!(clock.sleeps.len(), 2);
    }
}
