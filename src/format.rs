fn parse_hms(hms: &str) -> Option<f64> {
    let mut parts = hms.split(':');
    let h: i64 = parts.next()?.trim().parse().ok()?;
    let m: i64 = parts.next()?.trim().parse().ok()?;
    let s: i64 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(h as f64 + m as f64 / 60.0 + s as f64 / 3600.0)
}

// "01:30:00" -> "1.5小时"; anything else comes back unchanged.
pub fn format_duration(hms: &str) -> String {
    match parse_hms(hms) {
        Some(hours) => format!("{hours:.1}小时"),
        None => hms.to_string(),
    }
}

// Revenue card flavour: two decimals, empty input reads as zero.
pub fn format_duration_hours(hms: &str) -> String {
    match parse_hms(hms) {
        Some(hours) => format!("{hours:.2}小时"),
        None if hms.is_empty() => "00:00:00".to_string(),
        None => hms.to_string(),
    }
}

pub fn format_fans(attention: i64) -> String {
    if attention >= 10_000 {
        format!("{:.1}万", attention as f64 / 10_000.0)
    } else {
        attention.to_string()
    }
}

// Absent is not zero: historical months have no guard or fan-club counts.
pub fn format_count(value: Option<i64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

pub fn format_money(value: f64) -> String {
    format!("{value:.1}")
}

pub fn seconds_to_hms(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{h:02}:{m:02}:{s:02}")
}
