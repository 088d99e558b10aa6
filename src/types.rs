use chrono::{DateTime, FixedOffset};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Par `(início, fim)` já fechado, pronto para o gráfico semanal.
pub type ChartInterval = (DateTime<Tz>, DateTime<Tz>);

/// Intervalo de falta de energia.
///
/// O início é fixo após a construção; o fim fica aberto enquanto a falta
/// continua e é definido uma única vez pelo tracker quando a energia volta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutageInterval {
    start_time: DateTime<Tz>,
    end_time: Option<DateTime<Tz>>,
}

impl OutageInterval {
    /// Cria um intervalo aberto começando em `start_time`.
    pub fn new(start_time: DateTime<Tz>) -> Self {
        Self {
            start_time,
            end_time: None,
        }
    }

    /// Cria um intervalo já encerrado.
    pub fn closed(start_time: DateTime<Tz>, end_time: DateTime<Tz>) -> Self {
        Self {
            start_time,
            end_time: Some(end_time),
        }
    }

    pub fn start_time(&self) -> DateTime<Tz> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Tz>> {
        self.end_time
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Define o fim do intervalo. Chamadas repetidas sobrescrevem o fim anterior.
    pub fn finalize(&mut self, end_time: DateTime<Tz>) {
        self.end_time = Some(end_time);
    }

    /// Converte para a forma persistida (timestamps com offset explícito).
    pub fn to_stored(&self) -> StoredInterval {
        StoredInterval {
            start_time: self.start_time.fixed_offset(),
            end_time: self.end_time.map(|end| end.fixed_offset()),
        }
    }

    /// Reconstrói a partir da forma persistida, no fuso configurado.
    pub fn from_stored(stored: &StoredInterval, tz: &Tz) -> Self {
        Self {
            start_time: stored.start_time.with_timezone(tz),
            end_time: stored.end_time.map(|end| end.with_timezone(tz)),
        }
    }
}

/// Forma serializada de um intervalo no store chave-valor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredInterval {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: Option<DateTime<FixedOffset>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use chrono_tz::Europe::Kyiv;

    fn kyiv(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
        Kyiv.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn new_interval_is_open() {
        let start = kyiv(2022, 4, 15, 0, 0);
        let interval = OutageInterval::new(start);

        assert_eq!(interval.start_time(), start);
        assert_eq!(interval.end_time(), None);
        assert!(interval.is_open());
    }

    #[test]
    fn finalize_sets_end_and_last_write_wins() {
        let start = kyiv(2022, 4, 15, 0, 0);
        let mut interval = OutageInterval::new(start);

        interval.finalize(start + TimeDelta::days(1));
        assert_eq!(interval.end_time(), Some(start + TimeDelta::days(1)));
        assert!(!interval.is_open());

        interval.finalize(start + TimeDelta::hours(2));
        assert_eq!(interval.end_time(), Some(start + TimeDelta::hours(2)));
    }

    #[test]
    fn stored_form_keeps_instant_and_restores_zone() {
        let interval = OutageInterval::closed(kyiv(2022, 4, 14, 23, 15), kyiv(2022, 4, 15, 1, 17));
        let stored = interval.to_stored();

        assert_eq!(stored.start_time.offset().local_minus_utc(), 3 * 3600);

        let json = serde_json::to_string(&stored).unwrap();
        let parsed: StoredInterval = serde_json::from_str(&json).unwrap();
        let restored = OutageInterval::from_stored(&parsed, &Kyiv);

        assert_eq!(restored, interval);
    }
}
