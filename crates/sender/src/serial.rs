//! Abertura da porta serial (8N1, sem controle de fluxo, modo raw).

use scale_core::config::SerialConfig;
use scale_core::transport::IoSink;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::time::Duration;
use tracing::info;

/// Tempo máximo de uma escrita antes de contar como falha.
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

pub type SerialSink = IoSink<Box<dyn SerialPort>>;

/// Abre o dispositivo configurado. Falha aqui é fatal (sem retry).
pub fn open(config: &SerialConfig) -> Result<SerialSink, serialport::Error> {
    let port = serialport::new(config.device.as_str(), config.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(WRITE_TIMEOUT)
        .open()?;

    info!("Porta {} aberta @ {} baud (8N1)", config.device, config.baud_rate);
    Ok(IoSink::new(port))
}
