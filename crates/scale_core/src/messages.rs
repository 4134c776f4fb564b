//! Mensagens de status do console.
//!
//! Cada tipo de mensagem é uma variante com argumentos tipados; o texto é
//! gerado por `Display`. As cores ANSI são opcionais e só marcam as
//! transições (pausa, retomada, reset).

use crate::session::SessionSummary;
use std::fmt;

/// Cor ANSI associada a uma mensagem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Yellow,
    Green,
    Red,
}

impl Tone {
    fn ansi(self) -> Option<&'static str> {
        match self {
            Tone::Plain => None,
            Tone::Yellow => Some("\x1b[33m"),
            Tone::Green => Some("\x1b[32m"),
            Tone::Red => Some("\x1b[31m"),
        }
    }
}

const ANSI_RESET: &str = "\x1b[0m";

/// Uma linha de status para o operador.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusMessage {
    /// Sem argumentos na linha de comando
    Defaults { interval_secs: f64, increment_min: f64, increment_max: f64 },
    Usage { program: String },
    Started {
        device: String,
        baud_rate: u32,
        interval_secs: f64,
        pause_key: char,
        reset_key: char,
    },
    /// Espelho de um frame transmitido (sem o CR/LF)
    Sent { frame: String },
    Paused { reading: String },
    Resumed { reading: String },
    ManualReset { reading: String },
    AutoReset { reading: String },
    Stopped { summary: SessionSummary },
}

impl StatusMessage {
    pub fn tone(&self) -> Tone {
        match self {
            StatusMessage::Paused { .. } => Tone::Yellow,
            StatusMessage::Resumed { .. } => Tone::Green,
            StatusMessage::ManualReset { .. } | StatusMessage::AutoReset { .. } => Tone::Red,
            _ => Tone::Plain,
        }
    }

    /// Texto final, com ou sem cor.
    pub fn render(&self, color: bool) -> String {
        match self.tone().ansi() {
            Some(code) if color => format!("{code}{self}{ANSI_RESET}"),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::Defaults {
                interval_secs,
                increment_min,
                increment_max,
            } => write!(
                f,
                "Usando valores padrão: intervalo={interval_secs}s, incremento={increment_min:.1}–{increment_max:.1}kg"
            ),
            StatusMessage::Usage { program } => write!(
                f,
                "Lembrete: também é possível rodar assim: {program} <intervalo 1-10s> <passo 1-10kg>"
            ),
            StatusMessage::Started {
                device,
                baud_rate,
                interval_secs,
                pause_key,
                reset_key,
            } => write!(
                f,
                "Enviando para {device} @ {baud_rate} baud a cada {interval_secs}s. \
                 Pausa/retoma com '{pause_key}', reset com {}, Ctrl+C para sair.",
                key_name(*reset_key)
            ),
            StatusMessage::Sent { frame } => write!(f, "Enviado: {frame}"),
            StatusMessage::Paused { reading } => write!(f, " -> Pausa: {reading}"),
            StatusMessage::Resumed { reading } => write!(f, " -> Retoma: {reading}"),
            StatusMessage::ManualReset { reading } => write!(f, " -> Reset manual: {reading}"),
            StatusMessage::AutoReset { reading } => write!(f, " -> Reset automático: {reading}"),
            StatusMessage::Stopped { summary } => write!(
                f,
                "Porta fechada. {} frames enviados, {} resets manuais, {} automáticos. Saindo...",
                summary.frames_sent, summary.manual_resets, summary.auto_resets
            ),
        }
    }
}

fn key_name(key: char) -> String {
    match key {
        ' ' => "espaço".into(),
        other => format!("'{other}'"),
    }
}

/// Destino das mensagens de status (stdout no sender, `Vec` nos testes).
pub trait StatusReporter {
    fn report(&mut self, message: StatusMessage);
}

impl StatusReporter for Vec<StatusMessage> {
    fn report(&mut self, message: StatusMessage) {
        self.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_are_colored() {
        let msg = StatusMessage::Paused {
            reading: "+   12.3kg".into(),
        };
        assert_eq!(msg.render(false), " -> Pausa: +   12.3kg");
        assert_eq!(msg.render(true), "\x1b[33m -> Pausa: +   12.3kg\x1b[0m");
    }

    #[test]
    fn plain_messages_never_colored() {
        let msg = StatusMessage::Sent {
            frame: "ST,NT,+   12.3kg".into(),
        };
        assert_eq!(msg.render(true), "Enviado: ST,NT,+   12.3kg");
    }

    #[test]
    fn resets_share_red_tone() {
        let manual = StatusMessage::ManualReset { reading: String::new() };
        let auto = StatusMessage::AutoReset { reading: String::new() };
        assert_eq!(manual.tone(), Tone::Red);
        assert_eq!(auto.tone(), Tone::Red);
    }

    #[test]
    fn started_names_space_key() {
        let msg = StatusMessage::Started {
            device: "/dev/ttyUSB0".into(),
            baud_rate: 9600,
            interval_secs: 1.0,
            pause_key: 'p',
            reset_key: ' ',
        };
        assert!(msg.to_string().contains("reset com espaço"));
    }

    #[test]
    fn stopped_reports_summary() {
        let msg = StatusMessage::Stopped {
            summary: SessionSummary {
                frames_sent: 3,
                manual_resets: 1,
                auto_resets: 0,
            },
        };
        assert!(msg.to_string().contains("3 frames enviados"));
    }
}
