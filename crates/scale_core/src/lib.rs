//! # Scale Core
//!
//! Crate compartilhada do simulador de balança serial: configuração TOML,
//! gerador de peso, formato do frame ASCII, máquina de controle e o loop
//! principal da sessão.
//!
//! ## Módulos
//! - [`config`] – Configuração unificada via TOML
//! - [`types`] – Estado da sessão e amostras
//! - [`generator`] – Peso simulado com reset automático
//! - [`frame`] – Formatação/parsing do frame `ST,NT,+   12.3kg\r\n`
//! - [`control`] – Pausa, reset e saída
//! - [`transport`] – Escrita tudo-ou-nada no link
//! - [`messages`] – Mensagens de status do console
//! - [`session`] – Loop de ticks

pub mod config;
pub mod control;
pub mod frame;
pub mod generator;
pub mod messages;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports convenientes
pub use config::{AppConfig, ConfigError, FrameConfig, ScaleConfig, SenderConfig, SerialConfig};
pub use frame::{Frame, FrameError, format_frame, parse_frame};
pub use session::{Scheduler, SessionError, SessionSummary, ShutdownAwareClock, ShutdownSignal};
pub use transport::{FrameSink, IoSink, TransportError};
