//! ping.rs: Verificação de alcançabilidade do host monitorado
//!
//! Duas estratégias: o binário `ping` do sistema (padrão) ou ICMP direto via
//! `surge-ping`. Falhas transitórias são absorvidas pelas retentativas de
//! `check_availability`; o chamador só vê um booleano.

use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tokio::time::{Duration, sleep, timeout};
use tracing::{debug, warn};
use trust_dns_resolver::TokioAsyncResolver;

/// Estratégia de probe escolhida na configuração.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    #[default]
    Command,
    Icmp,
}

/// Uma tentativa única de alcançar o host.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn ping(&self) -> bool;
}

/// Executa `ping -c 1 <alvo>` e considera sucesso o código de saída 0.
#[derive(Debug, Clone)]
pub struct CommandPing {
    target: String,
    timeout: Duration,
}

impl CommandPing {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Probe for CommandPing {
    async fn ping(&self) -> bool {
        let mut cmd = Command::new("ping");
        cmd.arg("-c").arg("1").arg(&self.target).kill_on_drop(true);

        match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => true,
            Ok(Ok(output)) => {
                debug!(
                    "[PROBE {}] ping falhou: {}",
                    self.target,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Ok(Err(e)) => {
                warn!("[PROBE {}] Erro ao executar ping: {}", self.target, e);
                false
            }
            Err(_) => {
                debug!("[PROBE {}] Timeout após {:?}", self.target, self.timeout);
                false
            }
        }
    }
}

/// Envia um echo ICMP diretamente. Requer permissão para sockets ICMP.
pub struct IcmpPing {
    target: String,
    timeout: Duration,
    // Criado no primeiro nome a resolver e reutilizado (mantém o cache de DNS)
    resolver: OnceCell<Option<TokioAsyncResolver>>,
}

impl IcmpPing {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            timeout,
            resolver: OnceCell::new(),
        }
    }

    async fn resolver(&self) -> Option<&TokioAsyncResolver> {
        self.resolver
            .get_or_init(|| async {
                TokioAsyncResolver::tokio_from_system_conf()
                    .map_err(|e| warn!("[PROBE {}] Resolver indisponível: {}", self.target, e))
                    .ok()
            })
            .await
            .as_ref()
    }

    /// Usa o alvo como IP literal ou resolve o nome via DNS.
    async fn resolve(&self) -> Option<IpAddr> {
        if let Ok(addr) = self.target.parse::<IpAddr>() {
            return Some(addr);
        }
        let resolver = self.resolver().await?;
        match resolver.lookup_ip(self.target.as_str()).await {
            Ok(lookup) => lookup.iter().next(),
            Err(e) => {
                debug!("[PROBE {}] Falha de DNS: {}", self.target, e);
                None
            }
        }
    }
}

#[async_trait]
impl Probe for IcmpPing {
    async fn ping(&self) -> bool {
        let Some(addr) = self.resolve().await else {
            return false;
        };
        match timeout(self.timeout, surge_ping::ping(addr, &[0; 8])).await {
            Ok(Ok((_, rtt))) => {
                debug!("[PROBE {}] Resposta ICMP em {:?}", addr, rtt);
                true
            }
            Ok(Err(e)) => {
                debug!("[PROBE {}] Falha ICMP: {}", addr, e);
                false
            }
            Err(_) => {
                debug!("[PROBE {}] Timeout após {:?}", addr, self.timeout);
                false
            }
        }
    }
}

/// Cria o probe configurado.
pub fn build_probe(method: ProbeMethod, target: &str, timeout: Duration) -> Box<dyn Probe> {
    match method {
        ProbeMethod::Command => Box::new(CommandPing::new(target, timeout)),
        ProbeMethod::Icmp => Box::new(IcmpPing::new(target, timeout)),
    }
}

#[async_trait]
impl<P: Probe + ?Sized> Probe for Box<P> {
    async fn ping(&self) -> bool {
        (**self).ping().await
    }
}

/// Verifica se há energia: uma tentativa e, se falhar, até `retries`
/// novas tentativas espaçadas por `retry_delay`.
pub async fn check_availability<P: Probe + ?Sized>(
    probe: &P,
    retries: u32,
    retry_delay: Duration,
) -> bool {
    if probe.ping().await {
        return true;
    }
    for attempt in 1..=retries {
        sleep(retry_delay).await;
        if probe.ping().await {
            debug!("[PROBE] Sucesso na retentativa {}", attempt);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Probe que devolve uma sequência pré-definida de respostas.
    struct ScriptedProbe {
        answers: Mutex<Vec<bool>>,
        calls: Mutex<usize>,
    }

    impl ScriptedProbe {
        fn new(answers: &[bool]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().rev().copied().collect()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        async fn ping(&self) -> bool {
            *self.calls.lock().unwrap() += 1;
            self.answers.lock().unwrap().pop().unwrap_or(false)
        }
    }

    #[tokio::test]
    async fn first_success_skips_retries() {
        let probe = ScriptedProbe::new(&[true]);

        assert!(check_availability(&probe, 3, Duration::ZERO).await);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn success_on_last_retry() {
        let probe = ScriptedProbe::new(&[false, false, false, true]);

        assert!(check_availability(&probe, 3, Duration::ZERO).await);
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test]
    async fn retries_exhausted() {
        let probe = ScriptedProbe::new(&[false, false, false, false, true]);

        assert!(!check_availability(&probe, 3, Duration::ZERO).await);
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_between_retries() {
        let probe = ScriptedProbe::new(&[false, false, true]);
        let started = tokio::time::Instant::now();

        assert!(check_availability(&probe, 3, Duration::from_secs(2)).await);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn literal_ip_skips_dns_resolver() {
        let icmp = IcmpPing::new("127.0.0.1", Duration::from_secs(1));

        assert_eq!(icmp.resolve().await, Some(IpAddr::from([127, 0, 0, 1])));
        assert!(!icmp.resolver.initialized());
    }

    #[tokio::test]
    async fn dns_resolver_is_built_once() {
        let icmp = IcmpPing::new("example.invalid", Duration::from_secs(1));

        let first = icmp.resolver().await.map(|r| r as *const TokioAsyncResolver);
        assert!(icmp.resolver.initialized());
        let second = icmp.resolver().await.map(|r| r as *const TokioAsyncResolver);
        assert_eq!(first, second);
    }

    #[test]
    fn probe_method_parses_lowercase() {
        let method: ProbeMethod = serde_json::from_str("\"icmp\"").unwrap();
        assert_eq!(method, ProbeMethod::Icmp);
        assert_eq!(ProbeMethod::default(), ProbeMethod::Command);
    }
}
