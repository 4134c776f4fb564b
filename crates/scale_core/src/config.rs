//! Configuração unificada via TOML.
//!
//! Um único `config.toml` descreve a porta serial, a faixa de pesos
//! simulados, o formato do frame e as teclas de controle do sender.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Faixa aceita para o intervalo de envio passado na linha de comando (segundos).
pub const CLI_INTERVAL_RANGE: RangeInclusive<u64> = 1..=10;

/// Faixa aceita para o passo inteiro passado na linha de comando (kg).
pub const CLI_STEP_RANGE: RangeInclusive<u32> = 1..=10;

/// Variação decimal aplicada em torno do passo inteiro (±0.9 kg).
pub const STEP_JITTER_KG: f64 = 0.9;

/// Terminador obrigatório de todo frame.
pub const FRAME_TERMINATOR: &str = "\r\n";

/// Erros de configuração. Todos são fatais e reportados antes de abrir a porta.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Erro ao ler {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Erro ao parsear {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Erro ao serializar configuração: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Erro ao salvar {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Intervalo deve estar entre 1 e 10 segundos (recebido {0})")]
    IntervalOutOfRange(u64),

    #[error("Passo deve ser inteiro entre 1 e 10 kg (recebido {0})")]
    StepOutOfRange(u32),

    #[error("Configuração inválida: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Porta serial (compartilhada entre sender e receiver).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Caminho do dispositivo (ex: "/dev/ttyUSB0", "COM3")
    pub device: String,
    /// Velocidade em baud
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".into(),
            baud_rate: 9600,
        }
    }
}

/// Faixas do gerador de peso.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Limite inferior do valor inicial sorteado (kg)
    pub min_start: f64,
    /// Limite superior do valor inicial sorteado (kg)
    pub max_start: f64,
    /// Valor absoluto que dispara o reset automático (kg)
    pub reset_limit: f64,
    /// Valor atribuído em qualquer reset (kg)
    pub reset_value: f64,
    /// Incremento mínimo por tick (kg)
    pub increment_min: f64,
    /// Incremento máximo por tick (kg)
    pub increment_max: f64,
    /// Semente fixa do gerador (vazio = relógio do sistema)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            min_start: -50.3,
            max_start: 543.5,
            reset_limit: 1350.8,
            reset_value: 0.0,
            increment_min: 0.2,
            increment_max: 1.5,
            seed: None,
        }
    }
}

/// Layout do frame ASCII.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Literal antes do sinal
    pub prefix: String,
    /// Literal após o número; termina sempre em CR/LF
    pub suffix: String,
    /// Caracteres reservados para o número (dígitos + ponto + decimal)
    pub field_width: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            prefix: "ST,NT,".into(),
            suffix: "kg\r\n".into(),
            field_width: 7,
        }
    }
}

impl FrameConfig {
    /// Sufixo sem o terminador CR/LF (ex: "kg"), para mensagens de console.
    pub fn unit(&self) -> &str {
        self.suffix.trim_end_matches(['\r', '\n'])
    }
}

/// Configuração do Sender (ciclo e teclado).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Intervalo entre envios em segundos
    pub interval_secs: f64,
    /// Tecla de pausa/retomada (case-insensitive)
    pub pause_key: char,
    /// Tecla de reset manual
    pub reset_key: char,
    /// Cores ANSI nas mensagens de console
    pub color: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            pause_key: 'p',
            reset_key: ' ',
            color: true,
        }
    }
}

impl SenderConfig {
    /// Duração de um tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }
}

/// Configuração raiz do aplicativo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub scale: ScaleConfig,
    pub frame: FrameConfig,
    pub sender: SenderConfig,
}

impl AppConfig {
    /// Carrega configuração de um arquivo TOML.
    ///
    /// Arquivo ausente resulta na configuração padrão; arquivo ilegível ou
    /// malformado é erro.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("{} não encontrado, usando configuração padrão", path.display());
            return Ok(AppConfig::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str::<AppConfig>(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Configuração carregada de {}", path.display());
        Ok(config)
    }

    /// Salva configuração em arquivo TOML.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Configuração salva em {}", path.display());
        Ok(())
    }

    /// Retorna o caminho padrão do config.toml (ao lado do executável).
    pub fn default_path() -> PathBuf {
        let exe_dir = std::env::current_exe()
            .map(|p| p.parent().unwrap_or(Path::new(".")).to_path_buf())
            .unwrap_or_else(|_| PathBuf::from("."));
        exe_dir.join("config.toml")
    }

    /// Aplica o par `<intervalo> <passo>` da linha de comando.
    ///
    /// O passo inteiro vira a faixa de incremento `passo ± 0.9` kg.
    pub fn apply_interval_and_step(&mut self, interval_secs: u64, step_kg: u32) -> Result<(), ConfigError> {
        if !CLI_INTERVAL_RANGE.contains(&interval_secs) {
            return Err(ConfigError::IntervalOutOfRange(interval_secs));
        }
        if !CLI_STEP_RANGE.contains(&step_kg) {
            return Err(ConfigError::StepOutOfRange(step_kg));
        }

        self.sender.interval_secs = interval_secs as f64;
        self.scale.increment_min = f64::from(step_kg) - STEP_JITTER_KG;
        self.scale.increment_max = f64::from(step_kg) + STEP_JITTER_KG;
        Ok(())
    }

    /// Valida a configuração e retorna lista de erros.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.serial.device.trim().is_empty() {
            errors.push("Dispositivo serial não pode ser vazio".into());
        }
        if self.serial.baud_rate == 0 {
            errors.push("Baud rate não pode ser 0".into());
        }

        let scale = &self.scale;
        let numbers = [
            ("min_start", scale.min_start),
            ("max_start", scale.max_start),
            ("reset_limit", scale.reset_limit),
            ("reset_value", scale.reset_value),
            ("increment_min", scale.increment_min),
            ("increment_max", scale.increment_max),
        ];
        for (name, value) in numbers {
            if !value.is_finite() {
                errors.push(format!("{name} precisa ser um número finito ({value})"));
            }
        }
        if scale.min_start > scale.max_start {
            errors.push(format!(
                "min_start ({}) maior que max_start ({})",
                scale.min_start, scale.max_start
            ));
        }
        if scale.increment_min > scale.increment_max {
            errors.push(format!(
                "increment_min ({}) maior que increment_max ({})",
                scale.increment_min, scale.increment_max
            ));
        }
        for (name, low, high) in [
            ("min_start..max_start", scale.min_start, scale.max_start),
            ("increment_min..increment_max", scale.increment_min, scale.increment_max),
        ] {
            if low.is_finite() && high.is_finite() && !(high - low).is_finite() {
                errors.push(format!("Faixa {name} [{low}, {high}] larga demais para sortear"));
            }
        }
        if scale.reset_limit <= 0.0 {
            errors.push(format!("reset_limit precisa ser positivo ({})", scale.reset_limit));
        } else {
            if scale.reset_value.abs() >= scale.reset_limit {
                errors.push(format!(
                    "|reset_value| ({}) precisa ser menor que reset_limit ({})",
                    scale.reset_value, scale.reset_limit
                ));
            }
            if scale.min_start.abs() >= scale.reset_limit || scale.max_start.abs() >= scale.reset_limit {
                errors.push(format!(
                    "Faixa inicial [{}, {}] precisa ficar abaixo de reset_limit ({})",
                    scale.min_start, scale.max_start, scale.reset_limit
                ));
            }
        }

        let frame = &self.frame;
        if frame.field_width == 0 || frame.field_width > 32 {
            errors.push(format!("field_width inválido: {} (1–32)", frame.field_width));
        }
        if !frame.prefix.is_ascii() || !frame.suffix.is_ascii() {
            errors.push("prefix e suffix precisam ser ASCII".into());
        }
        if !frame.suffix.ends_with(FRAME_TERMINATOR) {
            errors.push("suffix precisa terminar em \\r\\n".into());
        }

        let sender = &self.sender;
        if !(sender.interval_secs >= 0.1 && sender.interval_secs <= 60.0) {
            errors.push(format!(
                "Intervalo do sender inválido: {} (0.1–60.0)",
                sender.interval_secs
            ));
        }
        // O teclado é lido byte a byte
        if !sender.pause_key.is_ascii() || !sender.reset_key.is_ascii() {
            errors.push(format!(
                "pause_key e reset_key precisam ser ASCII ({:?}, {:?})",
                sender.pause_key, sender.reset_key
            ));
        }
        if sender.pause_key.eq_ignore_ascii_case(&sender.reset_key) {
            errors.push("pause_key e reset_key precisam ser diferentes".into());
        }

        errors
    }

    /// Igual a [`validate`](Self::validate), mas como `Result`.
    pub fn ensure_valid(&self) -> Result<(), ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}
