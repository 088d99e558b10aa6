use chrono::TimeDelta;

pub const POWER_ON: &str = "🔋Є світло";
pub const POWER_OFF: &str = "🪫Відключено електропостачання";
pub const WEEKLY_CAPTION: &str = "📊Статистика світла за тиждень";

/// Texto do alerta de mudança de estado.
///
/// `since_last_change` é o tempo desde a mudança anterior, se conhecida; nesse
/// caso o texto informa quanto durou o estado que acabou de terminar.
pub fn build_message(available: bool, since_last_change: Option<TimeDelta>) -> String {
    let mut message = if available { POWER_ON } else { POWER_OFF }.to_owned();

    if let Some(elapsed) = since_last_change {
        let seconds = elapsed.num_seconds().max(0);
        let stat = format!("{} год. {} хв.", seconds / 3600, (seconds % 3600) / 60);
        if available {
            message.push_str(&format!("\n(світла не було {stat})"));
        } else {
            message.push_str(&format!("\n(світло було {stat})"));
        }
    }

    message
}
