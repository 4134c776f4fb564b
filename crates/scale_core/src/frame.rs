//! Frame ASCII da balança.
//!
//! Formato do frame:
//!
//! ```text
//! ┌──────────┬───────┬───────────┬─────────┬──────────┐
//! │ Prefixo  │ Sinal │ Espaços   │ Número  │ Sufixo   │
//! │ "ST,NT," │ + / - │ 0..width  │ "%.1f"  │ "kg\r\n" │
//! └──────────┴───────┴───────────┴─────────┴──────────┘
//! ```
//!
//! - Sinal + espaços + número ocupam `field_width + 1` caracteres
//! - Números maiores que o campo não são truncados (o campo cresce)
//! - O sufixo termina sempre em CR/LF

use crate::config::FrameConfig;
use std::fmt;

/// Erros ao interpretar um frame recebido.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FrameError {
    #[error("Frame não é ASCII")]
    NotAscii,

    #[error("Prefixo ausente (esperado {0:?})")]
    MissingPrefix(String),

    #[error("Sufixo ausente (esperado {0:?})")]
    MissingSuffix(String),

    #[error("Sinal inválido: {0:?}")]
    InvalidSign(char),

    #[error("Campo vazio")]
    EmptyField,

    #[error("Número inválido: {0:?}")]
    InvalidNumber(String),
}

/// Um frame pronto para transmissão. Imutável após a construção.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Box<[u8]>,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

/// Caractere de sinal: `+` para zero e positivos.
pub fn sign_char(value: f64) -> char {
    if value >= 0.0 { '+' } else { '-' }
}

/// Renderiza o campo numérico com sinal e preenchimento.
///
/// Ex: `format_field(12.3, 7)` → `"+   12.3"`.
pub fn format_field(value: f64, field_width: usize) -> String {
    let digits = format!("{:.1}", value.abs());
    let padding = field_width.saturating_sub(digits.len());

    let mut field = String::with_capacity(1 + padding + digits.len());
    field.push(sign_char(value));
    field.extend(std::iter::repeat_n(' ', padding));
    field.push_str(&digits);
    field
}

/// Monta o frame completo `prefix + campo + suffix`.
pub fn format_frame(value: f64, config: &FrameConfig) -> Frame {
    let field = format_field(value, config.field_width);

    let mut bytes = Vec::with_capacity(config.prefix.len() + field.len() + config.suffix.len());
    bytes.extend_from_slice(config.prefix.as_bytes());
    bytes.extend_from_slice(field.as_bytes());
    bytes.extend_from_slice(config.suffix.as_bytes());

    Frame {
        bytes: bytes.into_boxed_slice(),
    }
}

/// Interpreta um frame recebido e retorna o peso com sinal.
///
/// Aceita qualquer quantidade de espaços entre o sinal e o número.
pub fn parse_frame(bytes: &[u8], config: &FrameConfig) -> Result<f64, FrameError> {
    if !bytes.is_ascii() {
        return Err(FrameError::NotAscii);
    }
    // ASCII é sempre UTF-8 válido
    let text = std::str::from_utf8(bytes).map_err(|_| FrameError::NotAscii)?;

    let body = text
        .strip_prefix(config.prefix.as_str())
        .ok_or_else(|| FrameError::MissingPrefix(config.prefix.clone()))?;
    let field = body
        .strip_suffix(config.suffix.as_str())
        .ok_or_else(|| FrameError::MissingSuffix(config.suffix.clone()))?;

    let mut chars = field.chars();
    let sign = match chars.next() {
        Some('+') => 1.0,
        Some('-') => -1.0,
        Some(other) => return Err(FrameError::InvalidSign(other)),
        None => return Err(FrameError::EmptyField),
    };

    let digits = chars.as_str().trim_start_matches(' ');
    if digits.is_empty() {
        return Err(FrameError::EmptyField);
    }
    if !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(FrameError::InvalidNumber(digits.to_string()));
    }
    let magnitude: f64 = digits
        .parse()
        .map_err(|_| FrameError::InvalidNumber(digits.to_string()))?;

    Ok(sign * magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn frame_str(value: f64) -> String {
        format_frame(value, &FrameConfig::default()).to_string()
    }

    #[test]
    fn canonical_example() {
        assert_eq!(frame_str(12.3), "ST,NT,+   12.3kg\r\n");
    }

    #[test]
    fn zero_uses_plus_sign() {
        assert_eq!(frame_str(0.0), "ST,NT,+    0.0kg\r\n");
    }

    #[test]
    fn negative_value() {
        assert_eq!(frame_str(-45.67), "ST,NT,-   45.7kg\r\n");
    }

    #[test]
    fn field_fills_exactly() {
        assert_eq!(frame_str(12345.6), "ST,NT,+12345.6kg\r\n");
    }

    #[test]
    fn overflow_grows_field_without_truncation() {
        assert_eq!(frame_str(1234567.8), "ST,NT,+1234567.8kg\r\n");
        assert_eq!(format_field(-98765432.1, 7), "-98765432.1");
    }

    #[test]
    fn custom_layout() {
        let config = FrameConfig {
            prefix: "W=".into(),
            suffix: " lb\r\n".into(),
            field_width: 4,
        };
        let frame = format_frame(3.26, &config);
        assert_eq!(frame.as_bytes(), b"W=+ 3.3 lb\r\n");
    }

    #[test]
    fn parse_accepts_formatted_frames() {
        let config = FrameConfig::default();
        assert_eq!(parse_frame(b"ST,NT,+   12.3kg\r\n", &config), Ok(12.3));
        assert_eq!(parse_frame(b"ST,NT,-    0.5kg\r\n", &config), Ok(-0.5));
        assert_eq!(parse_frame(b"ST,NT,+1234567.8kg\r\n", &config), Ok(1234567.8));
    }

    #[test]
    fn parse_rejects_malformed_frames() {
        let config = FrameConfig::default();
        assert!(matches!(
            parse_frame(b"US,NT,+   12.3kg\r\n", &config),
            Err(FrameError::MissingPrefix(_))
        ));
        assert!(matches!(
            parse_frame(b"ST,NT,+   12.3kg\n", &config),
            Err(FrameError::MissingSuffix(_))
        ));
        assert_eq!(
            parse_frame(b"ST,NT,*   12.3kg\r\n", &config),
            Err(FrameError::InvalidSign('*'))
        );
        assert_eq!(parse_frame(b"ST,NT,+    kg\r\n", &config), Err(FrameError::EmptyField));
        assert_eq!(parse_frame(b"ST,NT,kg\r\n", &config), Err(FrameError::EmptyField));
        assert!(matches!(
            parse_frame(b"ST,NT,+  1 2.3kg\r\n", &config),
            Err(FrameError::InvalidNumber(_))
        ));
        assert_eq!(parse_frame("ST,NT,+ 12.3kg\u{b0}\r\n".as_bytes(), &config), Err(FrameError::NotAscii));
    }

    proptest! {
        #[test]
        fn frame_length_law(value in -1350.7f64..1350.7) {
            let config = FrameConfig::default();
            let frame = format_frame(value, &config);
            let digit_len = format!("{:.1}", value.abs()).len();
            let expected = config.prefix.len() + 1 + digit_len.max(7) + config.suffix.len();
            prop_assert_eq!(frame.len(), expected);
            prop_assert!(frame.as_bytes().ends_with(b"\r\n"));
        }

        #[test]
        fn padding_only_between_sign_and_digits(value in -1e9f64..1e9) {
            let field = format_field(value, 7);
            let rest = &field[1..];
            let digits = rest.trim_start_matches(' ');
            prop_assert!(!digits.contains(' '));
            prop_assert_eq!(field.chars().next(), Some(sign_char(value)));
        }
    }
}
