use negotium_core::models::{AnalysisPoint, AnalysisReport, SessionListing};
use negotium_core::session::{percent, AnalysisStatus, NegotiationMetrics, SessionClock};
use negotium_core::transcript::{Author, Message};

use super::scenarios::{Scenario, SCENARIOS};

pub fn render_scenarios() -> String {
    let mut out = String::from("Scenarios:\n");
    for (index, scenario) in SCENARIOS.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {} ({} min, {})\n     {}\n",
            index + 1,
            scenario.title,
            scenario.duration_mins,
            scenario.difficulty.label(),
            scenario.description
        ));
    }
    out
}

pub fn render_session_header(scenario: &Scenario, clock: &SessionClock) -> String {
    format!(
        "=== {} === [{} remaining]\n{}",
        scenario.title,
        clock.display(),
        scenario.description
    )
}

/// One transcript line: `[HH:MM] Speaker: text`.
pub fn render_message(message: &Message) -> String {
    let speaker = match message.author() {
        Author::User => "You",
        Author::Counterpart => "Counterpart",
    };
    format!(
        "[{}] {}: {}",
        message.created_at().format("%H:%M"),
        speaker,
        message.content()
    )
}

pub fn render_metrics(metrics: &NegotiationMetrics) -> String {
    format!(
        "LEVERAGE {}%  PATIENCE {}%",
        percent(metrics.leverage),
        percent(metrics.patience)
    )
}

pub fn render_clock(clock: &SessionClock) -> String {
    if clock.is_urgent() {
        format!("⏰ {} (hurry!)", clock.display())
    } else {
        format!("⏰ {}", clock.display())
    }
}

pub fn render_coach_tip(tip: &str, mood: Option<&str>) -> String {
    match mood {
        Some(mood) if !mood.trim().is_empty() => format!("💡 Coach: {} (mood: {})", tip, mood),
        _ => format!("💡 Coach: {}", tip),
    }
}

fn render_points(out: &mut String, heading: &str, points: &[AnalysisPoint]) {
    out.push_str(heading);
    out.push('\n');
    if points.is_empty() {
        out.push_str("  (none)\n");
    }
    for point in points {
        out.push_str(&format!("  • {}: {}\n", point.point, point.explanation));
    }
}

pub fn render_analysis(report: &AnalysisReport) -> String {
    let mut out = format!(
        "--- Analysis ---\nOutcome: {}\n{}\n",
        report.outcome.label(),
        report.summary
    );
    render_points(&mut out, "Strengths:", &report.strengths);
    render_points(&mut out, "Mistakes:", &report.mistakes);
    if !report.skill_gaps.is_empty() {
        out.push_str(&format!("Skills to practice: {}\n", report.skill_gaps.join(", ")));
    }
    out
}

pub fn render_analysis_status(status: &AnalysisStatus) -> String {
    match status {
        AnalysisStatus::Pending => "Analysis pending.".to_string(),
        AnalysisStatus::NotAttempted => {
            "No analysis available: the session ended before the counterpart replied.".to_string()
        }
        AnalysisStatus::Ready(report) => render_analysis(report),
        AnalysisStatus::Failed(error) if error.is_not_found() => {
            "The backend has no record of this session.".to_string()
        }
        AnalysisStatus::Failed(error) => {
            format!("Analysis failed: {} (try /analysis again)", error)
        }
    }
}

pub fn render_history(listing: &SessionListing) -> String {
    if listing.sessions.is_empty() {
        return "No past sessions yet.".to_string();
    }

    let mut out = format!("Recent sessions ({}):\n", listing.count);
    for session in &listing.sessions {
        let when = session
            .parsed_timestamp()
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| session.timestamp.clone());
        out.push_str(&format!(
            "  {}  {}  leverage {}%  [{}]\n",
            when,
            session.scenario,
            percent(session.leverage),
            session.id
        ));
    }
    out
}
