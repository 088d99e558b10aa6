use crate::ping::ProbeMethod;
use crate::report::WeeklySchedule;
use chrono_tz::Tz;
use config as config_crate;
use config_crate::{ConfigBuilder, builder::DefaultState};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration build error: {0}")]
    Build(#[from] config_crate::ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Configuração operacional do monitor.
///
/// Lida uma única vez na inicialização (variáveis de ambiente, `.env` e
/// arquivo `config.*` opcional) e repassada explicitamente aos componentes.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Token do bot do Telegram.
    pub api_token: String,
    /// Chat de destino: id numérico ou `@canal`.
    pub chat_id: String,
    /// Tópico dentro do chat (grupos com tópicos).
    #[serde(default)]
    pub thread_id: Option<i32>,
    /// Host cujo alcance indica presença de energia.
    pub ip_to_check: String,
    /// Retentativas do probe antes de declarar falta de energia.
    #[serde(default = "default_retries_count")]
    pub retries_count: u32,
    /// Intervalo entre ciclos em segundos.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_true")]
    pub send_weekly_stats: bool,
    /// Dia ISO do relatório (1 = segunda ... 7 = domingo).
    #[serde(default = "default_stats_day_of_week")]
    pub stats_day_of_week: u32,
    #[serde(default = "default_stats_hour")]
    pub stats_hour: u32,
    /// Fuso IANA do local monitorado.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default)]
    pub probe_method: ProbeMethod,
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_chart_title")]
    pub chart_title: String,
}

fn default_retries_count() -> u32 {
    3
}

fn default_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_stats_day_of_week() -> u32 {
    1
}

fn default_stats_hour() -> u32 {
    12
}

fn default_timezone() -> String {
    "Europe/Kyiv".to_owned()
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("power_outage_intervals.sqlite3")
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_chart_title() -> String {
    "Статистика світла за тиждень".to_owned()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("thread_id", &self.thread_id)
            .field("ip_to_check", &self.ip_to_check)
            .field("retries_count", &self.retries_count)
            .field("timeout", &self.timeout)
            .field("send_weekly_stats", &self.send_weekly_stats)
            .field("stats_day_of_week", &self.stats_day_of_week)
            .field("stats_hour", &self.stats_hour)
            .field("timezone", &self.timezone)
            .field("storage_path", &self.storage_path)
            .field("probe_method", &self.probe_method)
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("retry_delay_secs", &self.retry_delay_secs)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Carrega de `config.{toml,yaml,json}` (opcional) e das variáveis de ambiente.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = config_crate::Config::builder()
            .add_source(config_crate::File::with_name("config").required(false))
            .add_source(config_crate::Environment::default().try_parsing(true));
        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings = builder.build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::Validation("api_token não pode ser vazio".into()));
        }
        if self.chat_id.trim().is_empty() {
            return Err(ConfigError::Validation("chat_id não pode ser vazio".into()));
        }
        if self.ip_to_check.trim().is_empty() {
            return Err(ConfigError::Validation("ip_to_check não pode ser vazio".into()));
        }
        if self.timeout == 0 {
            return Err(ConfigError::Validation("timeout deve ser maior que zero".into()));
        }
        if !(1..=7).contains(&self.stats_day_of_week) {
            return Err(ConfigError::Validation(format!(
                "stats_day_of_week ({}) deve estar entre 1 e 7",
                self.stats_day_of_week
            )));
        }
        if self.stats_hour > 23 {
            return Err(ConfigError::Validation(format!(
                "stats_hour ({}) deve estar entre 0 e 23",
                self.stats_hour
            )));
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Validation(format!("fuso desconhecido: {}", self.timezone)))
    }

    pub fn schedule(&self) -> WeeklySchedule {
        WeeklySchedule {
            day_of_week: self.stats_day_of_week,
            hour: self.stats_hour,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
