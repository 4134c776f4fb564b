//! Erros fatais do sender.

use scale_core::{ConfigError, SessionError};

#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Não foi possível abrir a porta serial {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: serialport::Error,
    },

    #[error("Falha ao configurar o handler de Ctrl+C: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("Falha ao configurar o terminal: {0}")]
    Terminal(#[source] std::io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}
