//! Gráfico semanal de faltas de energia
//!
//! Desenha com `embedded-graphics` num framebuffer em memória e codifica em PNG.
//! Painel superior: uma coluna por dia (verde = com energia, vermelho = falta).
//! Painel inferior: percentual do dia com energia e totais de horas.

use crate::report::local_midnight;
use crate::types::ChartInterval;
use chrono::{Datelike, NaiveDate, Timelike};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::iso_8859_5::{FONT_6X10, FONT_10X20};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use std::collections::BTreeMap;
use std::convert::Infallible;
use thiserror::Error;

const WIDTH: u32 = 980;
const HEIGHT: u32 = 780;
const MARGIN_LEFT: i32 = 70;
const MARGIN_RIGHT: i32 = 20;
const BARS_TOP: i32 = 60;
const PX_PER_HOUR: i32 = 20;
const BARS_HEIGHT: i32 = 24 * PX_PER_HOUR;
const PERCENT_TOP: i32 = 600;
const PERCENT_HEIGHT: i32 = 100;

const BACKGROUND: Rgb888 = Rgb888::new(0xf0, 0xf0, 0xf0);
const PANEL: Rgb888 = Rgb888::new(0xff, 0xf3, 0xe0);
const GRID: Rgb888 = Rgb888::new(0xcc, 0xcc, 0xcc);
const POWER: Rgb888 = Rgb888::new(0x2e, 0x8b, 0x22);
const OUTAGE: Rgb888 = Rgb888::new(0xd6, 0x27, 0x28);
const LINE: Rgb888 = Rgb888::new(0x1f, 0x77, 0xb4);
const OUTAGE_LABEL: Rgb888 = Rgb888::new(0xe0, 0x7b, 0x00);

const WEEKDAYS: [&str; 7] = ["пн.", "вт.", "ср.", "чт.", "пт.", "сб.", "нд."];

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("png encoding failed: {0}")]
    Encoding(#[from] png::EncodingError),
}

/// Converte pares `(início, fim)` numa imagem.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, intervals: &[ChartInterval]) -> Result<Vec<u8>, ChartError>;
}

/// Trecho de falta dentro de um único dia, em horas locais.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaySegment {
    pub start_hour: f64,
    pub duration_hours: f64,
}

/// Divide os intervalos nas meias-noites locais, agrupando por data.
/// Trechos de duração zero são ignorados.
pub fn split_by_day(intervals: &[ChartInterval]) -> BTreeMap<NaiveDate, Vec<DaySegment>> {
    let mut days: BTreeMap<NaiveDate, Vec<DaySegment>> = BTreeMap::new();

    for &(start, end) in intervals {
        let tz = start.timezone();
        let mut day = start.date_naive();
        let last_day = end.date_naive();

        while day <= last_day {
            let Some(next_day) = day.succ_opt() else {
                break;
            };
            let day_start = local_midnight(&tz, day);
            let day_end = local_midnight(&tz, next_day);

            let segment_start = start.max(day_start);
            let segment_end = end.min(day_end);

            if segment_start < segment_end {
                let start_hour = f64::from(segment_start.hour())
                    + f64::from(segment_start.minute()) / 60.0
                    + f64::from(segment_start.second()) / 3600.0;
                let duration_hours = (segment_end - segment_start).num_seconds() as f64 / 3600.0;
                days.entry(day).or_default().push(DaySegment {
                    start_hour,
                    duration_hours,
                });
            }

            day = next_day;
        }
    }

    days
}

/// Preenche os dias sem falta entre o primeiro e o último dia do gráfico.
fn fill_missing_days(days: &mut BTreeMap<NaiveDate, Vec<DaySegment>>) {
    let (Some(&first), Some(&last)) = (days.keys().next(), days.keys().next_back()) else {
        return;
    };
    for day in first.iter_days().take_while(|day| *day <= last) {
        days.entry(day).or_default();
    }
}

/// Renderizador PNG do relatório semanal.
#[derive(Debug, Clone)]
pub struct WeeklyChart {
    title: String,
}

impl WeeklyChart {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl ChartRenderer for WeeklyChart {
    fn render(&self, intervals: &[ChartInterval]) -> Result<Vec<u8>, ChartError> {
        let mut days = split_by_day(intervals);
        fill_missing_days(&mut days);

        let mut canvas = Canvas::new(WIDTH, HEIGHT, BACKGROUND);
        let Ok(()) = draw_chart(&self.title, &days, &mut canvas);
        canvas.encode_png()
    }
}

fn draw_chart<D: DrawTarget<Color = Rgb888>>(
    title: &str,
    days: &BTreeMap<NaiveDate, Vec<DaySegment>>,
    display: &mut D,
) -> Result<(), D::Error> {
    let plot_width = WIDTH as i32 - MARGIN_LEFT - MARGIN_RIGHT;
    let column_width = plot_width / days.len().max(1) as i32;
    let bar_width = (column_width * 4 / 5).max(1);

    draw_text(
        title,
        Point::new(WIDTH as i32 / 2, 30),
        MonoTextStyle::new(&FONT_10X20, Rgb888::BLACK),
        Alignment::Center,
        display,
    )?;

    draw_panel(BARS_TOP, BARS_HEIGHT, display)?;
    draw_panel(PERCENT_TOP, PERCENT_HEIGHT, display)?;

    let small = MonoTextStyle::new(&FONT_6X10, Rgb888::BLACK);

    // Eixo vertical: horas do dia
    for hour in (0..=24).step_by(2) {
        let y = BARS_TOP + hour * PX_PER_HOUR;
        Line::new(
            Point::new(MARGIN_LEFT, y),
            Point::new(MARGIN_LEFT + plot_width, y),
        )
        .into_styled(PrimitiveStyle::with_stroke(GRID, 1))
        .draw(display)?;
        draw_text(
            &format!("{hour:02}:00"),
            Point::new(MARGIN_LEFT - 8, y),
            small,
            Alignment::Right,
            display,
        )?;
    }

    let mut previous_point: Option<Point> = None;

    for (index, (day, segments)) in days.iter().enumerate() {
        let column_left = MARGIN_LEFT + index as i32 * column_width;
        let center_x = column_left + column_width / 2;
        let bar_left = center_x - bar_width / 2;

        Rectangle::new(
            Point::new(bar_left, BARS_TOP),
            Size::new(bar_width as u32, BARS_HEIGHT as u32),
        )
        .into_styled(PrimitiveStyle::with_fill(POWER))
        .draw(display)?;

        for segment in segments {
            let top = BARS_TOP + (segment.start_hour * f64::from(PX_PER_HOUR)).round() as i32;
            let height = (segment.duration_hours * f64::from(PX_PER_HOUR)).round().max(1.0) as u32;
            Rectangle::new(Point::new(bar_left, top), Size::new(bar_width as u32, height))
                .into_styled(PrimitiveStyle::with_fill(OUTAGE))
                .draw(display)?;
        }

        let outage_hours: f64 = segments.iter().map(|s| s.duration_hours).sum::<f64>().min(24.0);
        let power_hours = 24.0 - outage_hours;
        let percent = power_hours / 24.0 * 100.0;

        // Painel inferior: percentual com energia
        let y = PERCENT_TOP + PERCENT_HEIGHT - (percent / 100.0 * f64::from(PERCENT_HEIGHT)).round() as i32;
        let point = Point::new(center_x, y);
        if let Some(previous) = previous_point {
            Line::new(previous, point)
                .into_styled(PrimitiveStyle::with_stroke(LINE, 2))
                .draw(display)?;
        }
        Circle::with_center(point, 7)
            .into_styled(PrimitiveStyle::with_fill(LINE))
            .draw(display)?;
        previous_point = Some(point);

        draw_text(
            &format!("{percent:.0}%"),
            Point::new(center_x, y - 12),
            small,
            Alignment::Center,
            display,
        )?;

        draw_text(
            &format_hours(power_hours),
            Point::new(center_x, PERCENT_TOP - 14),
            MonoTextStyle::new(&FONT_6X10, POWER),
            Alignment::Center,
            display,
        )?;
        draw_text(
            &format_hours(outage_hours),
            Point::new(center_x, PERCENT_TOP + PERCENT_HEIGHT + 16),
            MonoTextStyle::new(&FONT_6X10, OUTAGE_LABEL),
            Alignment::Center,
            display,
        )?;
        draw_text(
            &day_label(*day),
            Point::new(center_x, PERCENT_TOP + PERCENT_HEIGHT + 36),
            small,
            Alignment::Center,
            display,
        )?;
    }

    Ok(())
}

fn draw_panel<D: DrawTarget<Color = Rgb888>>(top: i32, height: i32, display: &mut D) -> Result<(), D::Error> {
    let width = WIDTH as i32 - MARGIN_LEFT - MARGIN_RIGHT;
    Rectangle::new(Point::new(MARGIN_LEFT, top), Size::new(width as u32, height as u32))
        .into_styled(PrimitiveStyle::with_fill(PANEL))
        .draw(display)
}

fn draw_text<D: DrawTarget<Color = Rgb888>>(
    text: &str,
    position: Point,
    character_style: MonoTextStyle<'_, Rgb888>,
    alignment: Alignment,
    display: &mut D,
) -> Result<(), D::Error> {
    let text_style = TextStyleBuilder::new()
        .alignment(alignment)
        .baseline(Baseline::Middle)
        .build();
    Text::with_text_style(text, position, character_style, text_style).draw(display)?;
    Ok(())
}

/// `d.m (пн.)`
fn day_label(day: NaiveDate) -> String {
    let weekday = WEEKDAYS[day.weekday().num_days_from_monday() as usize];
    format!("{}.{} ({})", day.day(), day.month(), weekday)
}

/// Horas fracionárias como `Hч Mм`.
fn format_hours(hours: f64) -> String {
    let whole = hours.trunc();
    let minutes = ((hours - whole) * 60.0).trunc();
    format!("{}ч {}м", whole as u32, minutes as u32)
}

/// Framebuffer RGB em memória.
struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb888>,
}

impl Canvas {
    fn new(width: u32, height: u32, background: Rgb888) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; (width * height) as usize],
        }
    }

    fn encode_png(&self) -> Result<Vec<u8>, ChartError> {
        let data: Vec<u8> = self
            .pixels
            .iter()
            .flat_map(|pixel| [pixel.r(), pixel.g(), pixel.b()])
            .collect();

        let mut out = Vec::new();
        let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&data)?;
        writer.finish()?;
        Ok(out)
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < self.width && y < self.height {
                self.pixels[(y * self.width + x) as usize] = color;
            }
        }
        Ok(())
    }
}
