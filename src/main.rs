use anyhow::Result;
use electricity_monitor::{
    chart::WeeklyChart,
    config::Config,
    notifier::TelegramNotifier,
    ping,
    scheduler::{Monitor, MonitorSettings},
    storage::{IntervalStore, SqliteStore},
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` é opcional; variáveis já exportadas têm precedência
    dotenvy::dotenv().ok();

    // Inicializa o sistema de logging (tracing), filtrado por RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;
    info!("Configuração carregada: {:?}", config);

    let tz = config.tz()?;
    let store = IntervalStore::new(SqliteStore::open(&config.storage_path)?, tz);
    info!("Store aberto em {}", config.storage_path.display());

    let probe = ping::build_probe(config.probe_method, &config.ip_to_check, config.probe_timeout());
    let notifier = TelegramNotifier::new(config.api_token.clone(), &config.chat_id, config.thread_id);
    let renderer = WeeklyChart::new(config.chart_title.clone());

    let monitor = Monitor::start(MonitorSettings::from(&config), store, probe, notifier, renderer).await;

    info!(
        "Iniciando monitoramento de {} a cada {}s",
        config.ip_to_check, config.timeout
    );
    monitor.run().await;

    Ok(())
}
