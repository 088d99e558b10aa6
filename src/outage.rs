use crate::storage::{IntervalStore, KeyValueStore, StoreError};
use crate::types::OutageInterval;
use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, info};

/// Registra uma mudança de estado da energia no histórico persistido.
///
/// - `available == false`: abre um novo intervalo em `now`, a menos que o
///   último já esteja aberto (no máximo um intervalo aberto, sempre o último).
/// - `available == true`: encerra o último intervalo se ele estiver aberto.
///
/// Faz exatamente uma leitura e uma escrita no store, mesmo sem alterações.
pub fn record_transition<S: KeyValueStore>(
    store: &IntervalStore<S>,
    available: bool,
    now: DateTime<Tz>,
) -> Result<(), StoreError> {
    let mut intervals = store.load_intervals()?;
    apply_transition(&mut intervals, available, now);
    store.save_intervals(&intervals)
}

fn apply_transition(intervals: &mut Vec<OutageInterval>, available: bool, now: DateTime<Tz>) {
    let last_open = intervals.last().is_some_and(OutageInterval::is_open);

    match (available, last_open) {
        (false, false) => {
            info!("[OUTAGE] Início de falta de energia em {}", now);
            intervals.push(OutageInterval::new(now));
        }
        (false, true) => {
            debug!("[OUTAGE] Já existe um intervalo aberto, nada a fazer");
        }
        (true, true) => {
            if let Some(last) = intervals.last_mut() {
                info!(
                    "[OUTAGE] Fim de falta de energia iniciada em {}, encerrada em {}",
                    last.start_time(),
                    now
                );
                last.finalize(now);
            }
        }
        (true, false) => {
            debug!("[OUTAGE] Nenhum intervalo aberto para encerrar");
        }
    }
}
