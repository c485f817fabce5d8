//! Reduction of raw forecast samples into the one-line daily summary text.

use chrono::NaiveDate;
use chrono_tz::Tz;

use daybreak_types::weather::ForecastSample;

/// Used when no sample carries a description.
const DEFAULT_DESCRIPTION: &str = "weather";

/// Min/max/description digest of one local day.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub min_c: f64,
    pub max_c: f64,
    pub description: Option<String>,
}

/// Digest the samples that fall on `today` in `zone`.
///
/// Returns `None` when no sample lands on that local date. The description is
/// the first present one in input order; providers return samples in
/// chronological order, so that is the morning's sky.
pub fn summarize(samples: &[ForecastSample], today: NaiveDate, zone: Tz) -> Option<DaySummary> {
    let mut summary: Option<DaySummary> = None;
    for sample in samples {
        if sample.at.with_timezone(&zone).date_naive() != today {
            continue;
        }
        match &mut summary {
            None => {
                summary = Some(DaySummary {
                    min_c: sample.temp_c,
                    max_c: sample.temp_c,
                    description: sample.description.clone(),
                });
            }
            Some(s) => {
                s.min_c = s.min_c.min(sample.temp_c);
                s.max_c = s.max_c.max(sample.temp_c);
                if s.description.is_none() {
                    s.description = sample.description.clone();
                }
            }
        }
    }
    summary
}

/// Render a digest as the user-facing forecast line.
///
/// Temperatures are rounded to whole degrees and carry an explicit sign when
/// non-negative. When rounding collapses min and max to the same value the
/// "around" form is used instead of a degenerate range.
pub fn format_summary(summary: &DaySummary) -> String {
    let min = summary.min_c.round() as i64;
    let max = summary.max_c.round() as i64;
    let description = capitalize(summary.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION));
    let emoji = emoji_for(&description);

    if min == max {
        format!("{emoji} {description}, around {}°C", format_temp(max))
    } else {
        format!(
            "{emoji} {description}, from {}°C to {}°C",
            format_temp(min),
            format_temp(max)
        )
    }
}

fn format_temp(degrees: i64) -> String {
    if degrees >= 0 {
        format!("+{degrees}")
    } else {
        degrees.to_string()
    }
}

/// First character uppercased, the rest lowercased.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

fn emoji_for(description: &str) -> &'static str {
    let d = description.to_lowercase();
    if d.contains("clear") || d.contains("sunny") {
        "☀️"
    } else if d.contains("cloud") {
        "⛅"
    } else if d.contains("rain") || d.contains("drizzle") || d.contains("shower") {
        "🌧️"
    } else if d.contains("snow") {
        "❄️"
    } else if d.contains("fog") || d.contains("mist") {
        "🌫️"
    } else {
        "🌤️"
    }
}
