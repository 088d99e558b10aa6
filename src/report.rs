//! report.rs: Janela semanal e recorte dos intervalos para o relatório
//!
//! Converte o histórico de faltas em dois conjuntos:
//! - o que vai para o gráfico (dias estritamente anteriores a hoje, dentro da janela);
//! - o que continua persistido (hoje em diante, incluindo continuações cortadas à meia-noite).

use crate::types::{ChartInterval, OutageInterval};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Timelike};
use chrono_tz::Tz;

/// Fronteiras da janela de relatório, todas no fuso de `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub now: DateTime<Tz>,
    /// Meia-noite de hoje.
    pub day_start: DateTime<Tz>,
    /// Meia-noite da data de calendário 7 dias antes de hoje.
    pub week_ago: DateTime<Tz>,
}

impl ReportWindow {
    pub fn new(now: DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let day_start = local_midnight(&tz, today);
        // Subtrai dias de calendário, não 168 horas: o horário de verão desloca a data
        let week_ago = local_midnight(&tz, today - Days::new(7));
        Self {
            now,
            day_start,
            week_ago,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }
}

/// Meia-noite local de `date`. Se a meia-noite cair num salto de horário de
/// verão, usa o primeiro instante válido do dia.
pub fn local_midnight(tz: &Tz, date: NaiveDate) -> DateTime<Tz> {
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| {
            (1..=3)
                .filter_map(|hour| tz.from_local_datetime(&(naive + TimeDelta::hours(hour))).earliest())
                .next()
                .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        })
}

/// Resultado do recorte semanal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyReport {
    /// Novo histórico completo a persistir.
    pub to_persist: Vec<OutageInterval>,
    /// Pares fechados a desenhar no gráfico.
    pub to_chart: Vec<ChartInterval>,
}

/// Recorta o histórico para o relatório semanal relativo a `now`.
///
/// Intervalos que terminam antes do dia de `week_ago` são descartados de vez;
/// os que começam antes são truncados para `week_ago`. Intervalos que cruzam a
/// meia-noite de hoje são divididos em `day_start`: o pedaço anterior vai para
/// o gráfico e o restante continua no histórico. Intervalos ainda abertos
/// permanecem intactos no histórico e nunca entram no gráfico.
pub fn compute_weekly_report(history: Vec<OutageInterval>, now: DateTime<Tz>) -> WeeklyReport {
    let window = ReportWindow::new(now);
    let week_ago_date = window.week_ago.date_naive();
    let today = window.today();

    let mut report = WeeklyReport::default();

    for interval in history {
        let Some(end) = interval.end_time() else {
            report.to_persist.push(interval);
            continue;
        };

        let mut start = interval.start_time();
        if start.date_naive() < week_ago_date {
            if end.date_naive() < week_ago_date {
                continue;
            }
            start = window.week_ago;
        }

        if start.date_naive() < today {
            let mut chart_end = end;
            if end.date_naive() >= today {
                report
                    .to_persist
                    .push(OutageInterval::closed(window.day_start, end));
                chart_end = window.day_start;
            }
            report.to_chart.push((start, chart_end));
        } else {
            report.to_persist.push(OutageInterval::closed(start, end));
        }
    }

    report
}

/// Condição de disparo do relatório semanal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    /// Dia da semana ISO (1 = segunda, 7 = domingo).
    pub day_of_week: u32,
    /// Hora local (0–23).
    pub hour: u32,
}

impl WeeklySchedule {
    /// Verdadeiro quando hoje ainda não houve envio e `now` cai no dia e na hora configurados.
    pub fn is_due(&self, now: &DateTime<Tz>, last_sent: NaiveDate) -> bool {
        now.date_naive() != last_sent
            && now.weekday().number_from_monday() == self.day_of_week
            && now.hour() == self.hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Kyiv;

    fn kyiv(d: u32, h: u32, min: u32) -> DateTime<Tz> {
        Kyiv.with_ymd_and_hms(2022, 4, d, h, min, 0).unwrap()
    }

    fn now() -> DateTime<Tz> {
        Kyiv.with_ymd_and_hms(2022, 4, 15, 12, 34, 1).unwrap()
    }

    #[test]
    fn window_boundaries_are_local_midnights() {
        let window = ReportWindow::new(now());

        assert_eq!(window.day_start, kyiv(15, 0, 0));
        assert_eq!(window.week_ago, kyiv(8, 0, 0));
        assert_eq!(window.today(), NaiveDate::from_ymd_opt(2022, 4, 15).unwrap());
    }

    #[test]
    fn weekly_report_matches_reference_week() {
        let history = vec![
            OutageInterval::closed(kyiv(7, 21, 0), kyiv(7, 22, 0)),
            OutageInterval::closed(kyiv(7, 23, 0), kyiv(8, 1, 34)),
            OutageInterval::closed(kyiv(13, 23, 1), kyiv(14, 1, 23)),
            OutageInterval::closed(kyiv(14, 23, 15), kyiv(15, 1, 17)),
            OutageInterval::closed(kyiv(15, 10, 7), kyiv(15, 11, 10)),
        ];

        let report = compute_weekly_report(history, now());

        assert_eq!(
            report.to_chart,
            vec![
                (kyiv(8, 0, 0), kyiv(8, 1, 34)),
                (kyiv(13, 23, 1), kyiv(14, 1, 23)),
                (kyiv(14, 23, 15), kyiv(15, 0, 0)),
            ]
        );
        assert_eq!(
            report.to_persist,
            vec![
                OutageInterval::closed(kyiv(15, 0, 0), kyiv(15, 1, 17)),
                OutageInterval::closed(kyiv(15, 10, 7), kyiv(15, 11, 10)),
            ]
        );
    }

    #[test]
    fn interval_older_than_window_disappears() {
        let history = vec![OutageInterval::closed(kyiv(7, 9, 0), kyiv(7, 11, 34))];

        let report = compute_weekly_report(history, now());

        assert!(report.to_chart.is_empty());
        assert!(report.to_persist.is_empty());
    }

    #[test]
    fn truncated_prefix_never_comes_back() {
        let history = vec![OutageInterval::closed(kyiv(7, 23, 0), kyiv(8, 1, 34))];

        let first = compute_weekly_report(history, now());
        assert_eq!(first.to_chart, vec![(kyiv(8, 0, 0), kyiv(8, 1, 34))]);
        assert!(first.to_persist.is_empty());

        let next_week = compute_weekly_report(first.to_persist, now() + TimeDelta::days(7));
        assert!(next_week.to_chart.is_empty());
    }

    #[test]
    fn midnight_split_preserves_total_span() {
        let original = OutageInterval::closed(kyiv(14, 23, 15), kyiv(15, 1, 17));

        let report = compute_weekly_report(vec![original.clone()], now());

        let (chart_start, chart_end) = report.to_chart[0];
        let kept = &report.to_persist[0];
        assert_eq!(chart_end, kyiv(15, 0, 0));
        assert_eq!(kept.start_time(), kyiv(15, 0, 0));
        assert_eq!(
            (chart_end - chart_start) + (kept.end_time().unwrap() - kept.start_time()),
            original.end_time().unwrap() - original.start_time()
        );
    }

    #[test]
    fn today_interval_is_kept_and_not_reported() {
        let today = OutageInterval::closed(kyiv(15, 10, 7), kyiv(15, 11, 10));

        let report = compute_weekly_report(vec![today.clone()], now());

        assert!(report.to_chart.is_empty());
        assert_eq!(report.to_persist, vec![today]);
    }

    #[test]
    fn open_intervals_are_kept_untouched() {
        let old_open = OutageInterval::new(kyiv(1, 8, 0));
        let recent_open = OutageInterval::new(kyiv(14, 22, 0));

        let report = compute_weekly_report(vec![old_open.clone()], now());
        assert!(report.to_chart.is_empty());
        assert_eq!(report.to_persist, vec![old_open]);

        let report = compute_weekly_report(vec![recent_open.clone()], now());
        assert!(report.to_chart.is_empty());
        assert_eq!(report.to_persist, vec![recent_open]);
    }

    #[test]
    fn interval_spanning_window_and_today_is_cut_on_both_sides() {
        let history = vec![OutageInterval::closed(kyiv(6, 12, 0), kyiv(15, 2, 0))];

        let report = compute_weekly_report(history, now());

        assert_eq!(report.to_chart, vec![(kyiv(8, 0, 0), kyiv(15, 0, 0))]);
        assert_eq!(
            report.to_persist,
            vec![OutageInterval::closed(kyiv(15, 0, 0), kyiv(15, 2, 0))]
        );
    }

    #[test]
    fn week_ago_follows_dst_offset() {
        // 2022-03-27 é a mudança para o horário de verão em Kyiv (+02 -> +03)
        let now = Kyiv.with_ymd_and_hms(2022, 4, 1, 12, 0, 0).unwrap();
        let window = ReportWindow::new(now);

        assert_eq!(window.week_ago, Kyiv.with_ymd_and_hms(2022, 3, 25, 0, 0, 0).unwrap());
        assert_eq!(window.week_ago.fixed_offset().offset().local_minus_utc(), 2 * 3600);
        assert_eq!(window.day_start.fixed_offset().offset().local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn week_ago_is_calendar_week_when_clocks_go_forward() {
        // Relógios adiantam em 2022-03-27 03:00
        let now = Kyiv.with_ymd_and_hms(2022, 4, 3, 0, 30, 0).unwrap();

        let window = ReportWindow::new(now);
        assert_eq!(window.week_ago, Kyiv.with_ymd_and_hms(2022, 3, 27, 0, 0, 0).unwrap());

        let eight_days_old = OutageInterval::closed(
            Kyiv.with_ymd_and_hms(2022, 3, 26, 10, 0, 0).unwrap(),
            Kyiv.with_ymd_and_hms(2022, 3, 26, 11, 0, 0).unwrap(),
        );
        let report = compute_weekly_report(vec![eight_days_old], now);
        assert!(report.to_chart.is_empty());
        assert!(report.to_persist.is_empty());
    }

    #[test]
    fn week_ago_is_calendar_week_when_clocks_go_back() {
        // Relógios atrasam em 2022-10-30 04:00
        let now = Kyiv.with_ymd_and_hms(2022, 11, 5, 23, 30, 0).unwrap();

        let window = ReportWindow::new(now);
        assert_eq!(window.week_ago, Kyiv.with_ymd_and_hms(2022, 10, 29, 0, 0, 0).unwrap());

        let start = Kyiv.with_ymd_and_hms(2022, 10, 29, 10, 0, 0).unwrap();
        let end = Kyiv.with_ymd_and_hms(2022, 10, 29, 11, 0, 0).unwrap();
        let report = compute_weekly_report(vec![OutageInterval::closed(start, end)], now);
        assert_eq!(report.to_chart, vec![(start, end)]);
    }

    #[test]
    fn schedule_requires_day_hour_and_new_date() {
        // 2022-04-15 é sexta-feira
        let schedule = WeeklySchedule {
            day_of_week: 5,
            hour: 12,
        };
        let yesterday = NaiveDate::from_ymd_opt(2022, 4, 14).unwrap();
        let today = NaiveDate::from_ymd_opt(2022, 4, 15).unwrap();

        assert!(schedule.is_due(&now(), yesterday));
        assert!(!schedule.is_due(&now(), today));
        assert!(!schedule.is_due(&kyiv(15, 13, 0), yesterday));

        let monday = WeeklySchedule {
            day_of_week: 1,
            hour: 12,
        };
        assert!(!monday.is_due(&now(), yesterday));
    }
}
