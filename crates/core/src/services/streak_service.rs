//! Consecutive-direction-day ("streak") computation over a short daily
//! close series.

/// Count consecutive same-direction daily closes, walking newest→oldest.
///
/// The first nonzero day-over-day delta establishes the direction and
/// seeds the count at ±1; each further delta with the same sign extends
/// it. The first delta with a different sign (a flat day included)
/// terminates the walk. Fewer than two closes, or a flat most-recent
/// transition, yields 0.
pub fn streak_from_closes(closes: &[f64]) -> i32 {
    if closes.len() < 2 {
        return 0;
    }
    let mut streak = 0i32;
    let mut direction = 0i32;
    for i in (1..closes.len()).rev() {
        let delta = closes[i] - closes[i - 1];
        let sign = if delta > 0.0 {
            1
        } else if delta < 0.0 {
            -1
        } else {
            0
        };
        if sign == 0 {
            break;
        }
        if direction == 0 {
            direction = sign;
            streak = sign;
            continue;
        }
        if sign == direction {
            streak += sign;
        } else {
            break;
        }
    }
    streak
}

/// Extract closing values from raw kline records
/// (`"date,open,close,high,low,…"` — close at index 2).
///
/// Malformed records — too few fields, unparseable close — are skipped
/// individually rather than failing the series. A series that collapses
/// below two usable closes simply yields streak 0 downstream.
pub fn parse_kline_closes(klines: &[String]) -> Vec<f64> {
    klines
        .iter()
        .filter_map(|record| {
            let mut fields = record.split(',');
            let close = fields.nth(2)?;
            close.trim().parse::<f64>().ok()
        })
        .collect()
}
