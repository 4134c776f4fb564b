//! # Scale Receiver
//!
//! Lê o fluxo da balança (real ou simulada) de uma porta serial, valida
//! cada frame e registra o peso no log. Útil para conferir o sender de
//! ponta a ponta, por exemplo com um par de ptys do `socat`.
//!
//! ## Uso
//! ```bash
//! scale_receiver --device /dev/ttyUSB1
//! RUST_LOG=debug scale_receiver          # Mostra também os bytes brutos
//! ```

mod assembler;

use assembler::FrameAssembler;
use clap::Parser;
use scale_core::config::AppConfig;
use scale_core::frame::parse_frame;
use scale_core::session::ShutdownSignal;
use scale_core::ConfigError;
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Timeout de leitura; define a rapidez com que o Ctrl+C é percebido.
const READ_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, thiserror::Error)]
enum ReceiverError {
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

    #[error("Erro lendo a porta serial: {0}")]
    Read(#[source] std::io::Error),
}

#[derive(Parser)]
#[command(name = "scale_receiver")]
#[command(about = "Monitor do fluxo serial da balança", long_about = None)]
struct Cli {
    /// Arquivo de configuração (padrão: config.toml ao lado do executável)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Dispositivo serial (sobrepõe o config)
    #[arg(short, long)]
    device: Option<String>,
    /// Baud rate (sobrepõe o config)
    #[arg(short, long)]
    baud: Option<u32>,
}

fn main() -> ExitCode {
    // ── Logging ──
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ReceiverError> {
    // ── Config ──
    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path)?;
    if let Some(device) = cli.device {
        config.serial.device = device;
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    config.ensure_valid()?;

    // ── Porta serial ──
    let mut port = serialport::new(config.serial.device.as_str(), config.serial.baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|source| ReceiverError::Open {
            device: config.serial.device.clone(),
            source,
        })?;
    info!(
        "Receiver escutando {} @ {} baud",
        config.serial.device, config.serial.baud_rate
    );

    let shutdown = ShutdownSignal::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.request())?;
    }

    let unit = config.frame.unit().to_string();
    let mut assembler = FrameAssembler::new();
    let mut buf = [0u8; 256];
    let (mut valid, mut invalid) = (0u64, 0u64);

    while !shutdown.is_requested() {
        let n = match port.read(&mut buf) {
            Ok(n) => n,
            Err(ref e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                // Timeout normal, continua
                continue;
            }
            Err(e) => return Err(ReceiverError::Read(e)),
        };

        for line in assembler.push(&buf[..n]) {
            debug!("← {:?}", String::from_utf8_lossy(&line));
            match parse_frame(&line, &config.frame) {
                Ok(weight) => {
                    valid += 1;
                    info!("⚖ {weight:+.1} {unit}");
                }
                Err(e) => {
                    invalid += 1;
                    warn!("Frame inválido: {e}");
                }
            }
        }
    }

    info!("Receiver encerrado: {valid} frames válidos, {invalid} inválidos");
    Ok(())
}
