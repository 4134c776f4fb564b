//! # Scale Sender
//!
//! Simula a saída serial de uma balança digital: gera um peso que cresce
//! devagar e envia frames `ST,NT,+   12.3kg\r\n` pela porta serial.
//!
//! ## Uso
//! ```bash
//! scale_sender                          # Valores do config.toml
//! scale_sender 2 5                      # A cada 2s, passo de 5kg (±0.9)
//! scale_sender --device /dev/ttyACM0    # Outra porta
//! ```
//!
//! ## Teclas
//! - `P`: Pausa / retoma
//! - `Espaço`: Reset manual
//! - `Ctrl+C`: Sair (fecha a porta e restaura o terminal)

mod console;
mod error;
mod keyboard;
mod serial;

use clap::Parser;
use console::ConsoleReporter;
use error::SenderError;
use keyboard::{RawModeGuard, StdinKeys};
use scale_core::config::AppConfig;
use scale_core::generator::seeded_rng;
use scale_core::messages::{StatusMessage, StatusReporter};
use scale_core::session::{Scheduler, SessionError, SessionSummary, ShutdownAwareClock, ShutdownSignal};
use scale_core::transport::FrameSink;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "scale_sender")]
#[command(about = "Simulador de balança – envia o peso por porta serial", long_about = None)]
struct Cli {
    /// Intervalo entre envios em segundos (1–10)
    #[arg(requires = "step")]
    interval: Option<u64>,
    /// Passo inteiro do peso em kg (1–10), com variação decimal de ±0.9
    step: Option<u32>,
    /// Arquivo de configuração (padrão: config.toml ao lado do executável)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Dispositivo serial (sobrepõe o config)
    #[arg(short, long)]
    device: Option<String>,
    /// Baud rate (sobrepõe o config)
    #[arg(short, long)]
    baud: Option<u32>,
    /// Semente fixa do gerador
    #[arg(long)]
    seed: Option<u64>,
    /// Desativa cores ANSI nas mensagens
    #[arg(long)]
    no_color: bool,
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

fn run(cli: Cli) -> Result<(), SenderError> {
    // ── Carregar config ──
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_path);
    let mut config = AppConfig::load(&config_path)?;

    // Salva config padrão se não existir
    if !config_path.exists() {
        if let Err(e) = config.save(&config_path) {
            warn!("Não foi possível salvar config padrão: {e}");
        }
    }

    if let Some(device) = cli.device {
        config.serial.device = device;
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if cli.seed.is_some() {
        config.scale.seed = cli.seed;
    }

    let mut console = ConsoleReporter::new(config.sender.color && !cli.no_color);

    // ── Argumentos <intervalo> <passo> ──
    match (cli.interval, cli.step) {
        (Some(interval), Some(step)) => config.apply_interval_and_step(interval, step)?,
        _ => {
            console.report(StatusMessage::Defaults {
                interval_secs: config.sender.interval_secs,
                increment_min: config.scale.increment_min,
                increment_max: config.scale.increment_max,
            });
            console.report(StatusMessage::Usage {
                program: std::env::args().next().unwrap_or_else(|| "scale_sender".into()),
            });
        }
    }
    config.ensure_valid()?;

    // ── Porta serial ──
    let port = serial::open(&config.serial).map_err(|source| SenderError::Open {
        device: config.serial.device.clone(),
        source,
    })?;

    // ── Ctrl+C: só marca a flag, a limpeza roda abaixo ──
    let shutdown = ShutdownSignal::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.request())?;
    }

    // ── Teclado ──
    let mut raw_mode = RawModeGuard::enable().map_err(SenderError::Terminal)?;
    if raw_mode.is_active() {
        info!("Teclado em modo raw");
    }

    let (rng, seed) = seeded_rng(config.scale.seed);
    debug!("Semente do gerador: {seed}");

    // ── Banner ──
    println!();
    println!("══════════════════════════════════════════════");
    println!("   ⚖ BALANÇA SIMULADA – ATIVA");
    println!("══════════════════════════════════════════════");
    println!("  Porta:     {} @ {}", config.serial.device, config.serial.baud_rate);
    println!("  Intervalo: {:.1}s", config.sender.interval_secs);
    println!(
        "  Faixa:     {:.1}…{:.1}kg (reset em {:.1})",
        config.scale.min_start, config.scale.max_start, config.scale.reset_limit
    );
    println!("══════════════════════════════════════════════");
    println!();

    console.report(StatusMessage::Started {
        device: config.serial.device.clone(),
        baud_rate: config.serial.baud_rate,
        interval_secs: config.sender.interval_secs,
        pause_key: config.sender.pause_key,
        reset_key: config.sender.reset_key,
    });

    // ── Loop principal ──
    let mut scheduler = Scheduler::new(
        &config,
        port,
        StdinKeys::stdin(),
        ShutdownAwareClock::new(shutdown.clone()),
        rng,
        console,
        shutdown,
    );
    let result = scheduler.run();

    let (port, console) = scheduler.into_parts();
    finish(result, port, console, &mut raw_mode)
}

/// Terminal que pode voltar ao estado original.
trait RestoreTerminal {
    fn restore(&mut self) -> io::Result<()>;
}

impl RestoreTerminal for RawModeGuard {
    fn restore(&mut self) -> io::Result<()> {
        RawModeGuard::restore(self)
    }
}

/// Limpeza, uma vez em todos os caminhos: fecha a porta, restaura o
/// terminal e só então reporta o fim ou propaga o erro.
fn finish<S, P, T>(
    result: Result<SessionSummary, SessionError>,
    port: S,
    mut console: P,
    terminal: &mut T,
) -> Result<(), SenderError>
where
    S: FrameSink,
    P: StatusReporter,
    T: RestoreTerminal,
{
    drop(port);
    if let Err(e) = terminal.restore() {
        warn!("Falha ao restaurar o terminal: {e}");
    }

    let summary = result?;
    console.report(StatusMessage::Stopped { summary });
    Ok(())
}
