//! Máquina de estados de controle (pausa / reset / saída).
//!
//! | atual           | evento     | próximo    | efeito                     |
//! |-----------------|------------|------------|----------------------------|
//! | Running         | pause_key  | Paused     | -                          |
//! | Paused          | pause_key  | Running    | -                          |
//! | Running/Paused  | reset_key  | inalterado | `current_value = reset`    |
//! | qualquer        | outro      | inalterado | ignorado                   |

use crate::config::SenderConfig;
use crate::types::{RunState, SessionState};

/// Evento derivado de no máximo um caractere por ciclo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    None,
    PauseToggle,
    Reset,
    Quit,
}

/// Teclas de controle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlKeys {
    pub pause: char,
    pub reset: char,
}

impl ControlKeys {
    pub fn from_config(config: &SenderConfig) -> Self {
        Self {
            pause: config.pause_key,
            reset: config.reset_key,
        }
    }

    /// Classifica um caractere lido do teclado.
    pub fn classify(&self, c: char) -> ControlEvent {
        if c.eq_ignore_ascii_case(&self.pause) {
            ControlEvent::PauseToggle
        } else if c == self.reset {
            ControlEvent::Reset
        } else {
            ControlEvent::None
        }
    }
}

impl Default for ControlKeys {
    fn default() -> Self {
        Self::from_config(&SenderConfig::default())
    }
}

/// O que mudou após aplicar um evento.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Paused,
    Resumed,
    Reset { value: f64 },
    Quit,
}

/// Aplica um evento ao estado da sessão.
pub fn apply(event: ControlEvent, state: &mut SessionState, reset_value: f64) -> Option<Transition> {
    match event {
        ControlEvent::None => None,
        ControlEvent::PauseToggle => {
            state.run_state = state.run_state.toggled();
            Some(match state.run_state {
                RunState::Paused => Transition::Paused,
                RunState::Running => Transition::Resumed,
            })
        }
        ControlEvent::Reset => {
            state.current_value = Some(reset_value);
            Some(Transition::Reset { value: reset_value })
        }
        ControlEvent::Quit => {
            state.shutting_down = true;
            Some(Transition::Quit)
        }
    }
}
