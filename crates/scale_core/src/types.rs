//! Estado mutável da sessão de simulação.
//!
//! O único escritor é o [`Scheduler`](crate::session::Scheduler); gerador e
//! máquina de controle recebem `&mut SessionState` emprestado a cada ciclo.

/// Estado de execução controlado pela tecla de pausa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Running,
    Paused,
}

impl RunState {
    /// Estado oposto (usado pela tecla de pausa).
    pub fn toggled(self) -> Self {
        match self {
            RunState::Running => RunState::Paused,
            RunState::Paused => RunState::Running,
        }
    }
}

/// Contexto da sessão (substitui variáveis globais).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Peso atual com sinal (kg). `None` até a primeira amostra.
    pub current_value: Option<f64>,
    pub run_state: RunState,
    pub shutting_down: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessão já iniciada com um peso conhecido.
    pub fn with_value(value: f64) -> Self {
        Self {
            current_value: Some(value),
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_state == RunState::Running
    }
}

/// Resultado de um passo do gerador.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Peso a transmitir (kg)
    pub value: f64,
    /// `true` quando o limite foi atingido e o valor voltou ao reset
    pub auto_reset: bool,
}
