//! Gerador do peso simulado.
//!
//! O peso parte de um valor sorteado em `[min_start, max_start]` e cresce a
//! cada tick por um incremento sorteado em `[increment_min, increment_max]`.
//! Ao atingir `|valor| >= reset_limit` volta para `reset_value` (reset
//! automático, comportamento normal de uma leitura sempre crescente).

use crate::config::ScaleConfig;
use crate::types::{Sample, SessionState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Produz a próxima amostra e atualiza `state.current_value`.
///
/// A primeira chamada da sessão apenas sorteia o valor inicial.
pub fn next_sample<R: Rng>(state: &mut SessionState, config: &ScaleConfig, rng: &mut R) -> Sample {
    let Some(current) = state.current_value else {
        let seeded = rng.gen_range(config.min_start..=config.max_start);
        state.current_value = Some(seeded);
        return Sample {
            value: seeded,
            auto_reset: false,
        };
    };

    let increment = rng.gen_range(config.increment_min..=config.increment_max);
    let mut value = current + increment;
    let auto_reset = value.abs() >= config.reset_limit;
    if auto_reset {
        debug!("Limite {:.1} atingido ({value:.1}), reset automático", config.reset_limit);
        value = config.reset_value;
    }

    state.current_value = Some(value);
    Sample { value, auto_reset }
}

/// Gerador padrão: semente fixa da configuração ou relógio do sistema.
pub fn seeded_rng(seed: Option<u64>) -> (StdRng, u64) {
    let seed = seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default()
    });
    (StdRng::seed_from_u64(seed), seed)
}
