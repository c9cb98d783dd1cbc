use std::time::Duration;

pub(crate) fn format_duration_single(d: Duration) -> String {
    // Single rounded component in one of: us, ms, s.
    let total_us = d.as_micros();

    fn round_div(value: u128, unit: u128) -> u128 {
        (value + (unit / 2)) / unit
    }

    if total_us >= 1_000_000 {
        return format!("{}s", round_div(total_us, 1_000_000));
    }
    if total_us >= 1_000 {
        return format!("{}ms", round_div(total_us, 1_000));
    }
    format!("{total_us}us")
}

pub(crate) fn format_ms(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    if v >= 1000.0 {
        return format!("{:.2}s", v / 1000.0);
    }
    if v >= 10.0 {
        return format!("{v:.1}ms");
    }
    format!("{v:.2}ms")
}

pub(crate) fn format_ms_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), format_ms)
}

pub(crate) fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}

pub(crate) fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", (ratio * 100.0).clamp(0.0, 100.0))
}
