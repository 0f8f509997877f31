use std::time::Duration;

/// 残り時間を推定する
pub fn estimate_remaining(processed: usize, total: usize, elapsed: Duration) -> Option<Duration> {
    if processed == 0 || elapsed.is_zero() || processed > total {
        return None;
    }

    let per_item = elapsed.as_secs_f64() / processed as f64;
    let remaining_items = (total - processed) as f64;
    Some(Duration::from_secs_f64(per_item * remaining_items))
}

/// `H:MM:SS` 形式
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
