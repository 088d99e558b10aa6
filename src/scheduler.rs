// src/scheduler.rs

use crate::chart::ChartRenderer;
use crate::config::Config;
use crate::messages::{WEEKLY_CAPTION, build_message};
use crate::notifier::Notifier;
use crate::outage::record_transition;
use crate::ping::{Probe, check_availability};
use crate::report::{WeeklySchedule, compute_weekly_report};
use crate::storage::{IntervalStore, KeyValueStore, StoreError};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use chrono_tz::Tz;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Parâmetros do loop derivados da configuração.
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub retries_count: u32,
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    pub send_weekly_stats: bool,
    pub schedule: WeeklySchedule,
}

impl From<&Config> for MonitorSettings {
    fn from(config: &Config) -> Self {
        Self {
            retries_count: config.retries_count,
            retry_delay: config.retry_delay(),
            poll_interval: config.poll_interval(),
            send_weekly_stats: config.send_weekly_stats,
            schedule: config.schedule(),
        }
    }
}

/// Resultado de um ciclo de monitoramento.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Relatório semanal processado neste ciclo.
    pub report_sent: bool,
    /// Novo estado, se houve mudança.
    pub state_changed: Option<bool>,
}

/// Loop de monitoramento: probe, detecção de mudança, histórico e relatório semanal.
pub struct Monitor<S, P, N, R> {
    settings: MonitorSettings,
    store: IntervalStore<S>,
    probe: P,
    notifier: N,
    renderer: R,
    previous_state: bool,
    last_state_change: Option<DateTime<Tz>>,
    last_report_date: Option<NaiveDate>,
}

impl<S, P, N, R> Monitor<S, P, N, R>
where
    S: KeyValueStore,
    P: Probe,
    N: Notifier,
    R: ChartRenderer,
{
    /// Cria o monitor com o estado inicial já medido.
    pub fn new(
        settings: MonitorSettings,
        store: IntervalStore<S>,
        probe: P,
        notifier: N,
        renderer: R,
        initial_state: bool,
    ) -> Self {
        Self {
            settings,
            store,
            probe,
            notifier,
            renderer,
            previous_state: initial_state,
            last_state_change: None,
            last_report_date: None,
        }
    }

    /// Faz a primeira medição e cria o monitor.
    pub async fn start(
        settings: MonitorSettings,
        store: IntervalStore<S>,
        probe: P,
        notifier: N,
        renderer: R,
    ) -> Self {
        let initial_state = check_availability(&probe, settings.retries_count, settings.retry_delay).await;
        info!(
            "[ESTADO INICIAL] Energia {}",
            if initial_state { "presente" } else { "ausente" }
        );
        Self::new(settings, store, probe, notifier, renderer, initial_state)
    }

    pub fn previous_state(&self) -> bool {
        self.previous_state
    }

    /// Alinha o histórico com o estado inicial após um reinício: fecha um
    /// intervalo que ficou aberto se a energia voltou, ou abre um se a falta
    /// começou com o processo parado.
    pub fn reconcile(&self, now: DateTime<Tz>) -> Result<(), StoreError> {
        if !self.settings.send_weekly_stats {
            return Ok(());
        }
        record_transition(&self.store, self.previous_state, now)
    }

    /// Um ciclo completo. Erros de store abortam apenas este ciclo.
    pub async fn run_cycle(&mut self, now: DateTime<Tz>) -> Result<CycleOutcome, StoreError> {
        let mut outcome = CycleOutcome::default();

        if self.settings.send_weekly_stats {
            outcome.report_sent = self.check_weekly_report(now).await?;
        }

        let current_state =
            check_availability(&self.probe, self.settings.retries_count, self.settings.retry_delay).await;

        if current_state == self.previous_state {
            debug!("[MONITOR] Sem mudança de estado ({})", current_state);
            return Ok(outcome);
        }

        info!(
            "[MONITOR] Mudança de estado: {} -> {} em {}",
            self.previous_state, current_state, now
        );

        if self.settings.send_weekly_stats {
            record_transition(&self.store, current_state, now)?;
        }

        let message = build_message(current_state, self.last_state_change.map(|at| now - at));
        if let Err(e) = self.notifier.send_text(&message).await {
            warn!("[MONITOR] Falha ao enviar alerta: {}", e);
        }

        self.previous_state = current_state;
        self.last_state_change = Some(now);
        outcome.state_changed = Some(current_state);
        Ok(outcome)
    }

    /// Envia o relatório semanal se estiver no dia e hora configurados e
    /// ainda não tiver sido enviado hoje.
    async fn check_weekly_report(&mut self, now: DateTime<Tz>) -> Result<bool, StoreError> {
        let last_sent = match self.last_report_date {
            Some(date) => date,
            None => {
                let yesterday = (now - TimeDelta::days(1)).date_naive();
                let date = self.store.load_last_report_date()?.unwrap_or(yesterday);
                self.last_report_date = Some(date);
                date
            }
        };

        if !self.settings.schedule.is_due(&now, last_sent) {
            return Ok(false);
        }

        let today = now.date_naive();
        self.store.save_last_report_date(today)?;
        self.last_report_date = Some(today);

        let history = self.store.load_intervals()?;
        let total = history.len();
        let report = compute_weekly_report(history, now);
        self.store.save_intervals(&report.to_persist)?;

        info!(
            "[RELATÓRIO] {} intervalos lidos, {} no gráfico, {} mantidos",
            total,
            report.to_chart.len(),
            report.to_persist.len()
        );

        if report.to_chart.is_empty() {
            info!("[RELATÓRIO] Nenhuma falta na semana, nada a enviar");
            return Ok(true);
        }

        match self.renderer.render(&report.to_chart) {
            Ok(image) => {
                if let Err(e) = self.notifier.send_image(WEEKLY_CAPTION, image).await {
                    warn!("[RELATÓRIO] Falha ao enviar gráfico: {}", e);
                }
            }
            Err(e) => warn!("[RELATÓRIO] Falha ao gerar gráfico: {}", e),
        }

        Ok(true)
    }

    /// Roda indefinidamente, dormindo `poll_interval` entre ciclos.
    pub async fn run(mut self) {
        let tz = self.store.timezone();
        let mut cycle_number: u64 = 0;

        if let Err(e) = self.reconcile(Utc::now().with_timezone(&tz)) {
            error!("[MONITOR] Erro ao reconciliar histórico: {:?}", e);
        }

        loop {
            cycle_number += 1;
            let now = Utc::now().with_timezone(&tz);
            debug!("[CICLO {}] Iniciando em {}", cycle_number, now);

            if let Err(e) = self.run_cycle(now).await {
                error!("[CICLO {}] Erro de armazenamento: {:?}", cycle_number, e);
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}
