//! Payloads exchanged with the negotiation backend and the domain values built from them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Speaker tag used in the replayed conversation history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NegotiateRequest<'a> {
    pub scenario: &'a str,
    pub history: &'a [HistoryEntry],
    pub current_leverage: f64,
    pub session_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NegotiateResponse {
    pub opponent_reply: String,
    pub coach_tip: String,
    pub new_leverage: f64,
    pub new_mood: String,
    pub session_id: String,
}

/// Result of one successful negotiation round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub coach_tip: String,
    pub new_leverage: f64,
    pub new_mood: String,
    pub session_id: String,
}

impl From<NegotiateResponse> for TurnOutcome {
    fn from(response: NegotiateResponse) -> Self {
        Self {
            reply: response.opponent_reply,
            coach_tip: response.coach_tip,
            new_leverage: response.new_leverage,
            new_mood: response.new_mood,
            session_id: response.session_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisPoint {
    pub point: String,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalysisPayload {
    pub summary: String,
    pub outcome: String,
    pub strengths: Vec<AnalysisPoint>,
    pub mistakes: Vec<AnalysisPoint>,
    pub skill_gaps: Vec<String>,
    #[serde(default)]
    pub chat_history: Option<Vec<HistoryEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Anything else the analyst reported ("Failure", "Neutral", ...), verbatim.
    Other(String),
}

impl Outcome {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("success") {
            Self::Success
        } else {
            Self::Other(raw.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Success => "Success",
            Self::Other(label) => label,
        }
    }
}

/// Post-session report, read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub summary: String,
    pub outcome: Outcome,
    pub strengths: Vec<AnalysisPoint>,
    pub mistakes: Vec<AnalysisPoint>,
    /// Distinct skill names in the order the analyst first listed them.
    pub skill_gaps: Vec<String>,
    pub transcript_echo: Option<Vec<HistoryEntry>>,
}

impl From<AnalysisPayload> for AnalysisReport {
    fn from(payload: AnalysisPayload) -> Self {
        let mut skill_gaps: Vec<String> = Vec::with_capacity(payload.skill_gaps.len());
        for gap in payload.skill_gaps {
            let gap = gap.trim().to_string();
            if !gap.is_empty() && !skill_gaps.contains(&gap) {
                skill_gaps.push(gap);
            }
        }

        Self {
            summary: payload.summary,
            outcome: Outcome::parse(&payload.outcome),
            strengths: payload.strengths,
            mistakes: payload.mistakes,
            skill_gaps,
            transcript_echo: payload.chat_history,
        }
    }
}

/// Row from the backend's recent-session listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedSession {
    #[serde(rename = "_id")]
    pub id: String,
    pub scenario: String,
    pub leverage: f64,
    pub timestamp: String,
}

impl SavedSession {
    /// Backend timestamps come either as RFC 3339 or as naive ISO-8601 in UTC.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionListing {
    pub sessions: Vec<SavedSession>,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_request_uses_wire_field_names() {
        let history = vec![
            HistoryEntry {
                role: Role::Assistant,
                content: "What's on your mind?".to_string(),
            },
            HistoryEntry {
                role: Role::User,
                content: "I'd like 20% more".to_string(),
            },
        ];
        let request = NegotiateRequest {
            scenario: "Annual Salary Raise",
            history: &history,
            current_leverage: 0.5,
            session_id: None,
        };

        let value = serde_json::to_value(&request).expect("encode request");
        assert_eq!(
            value,
            serde_json::json!({
                "scenario": "Annual Salary Raise",
                "history": [
                    {"role": "assistant", "content": "What's on your mind?"},
                    {"role": "user", "content": "I'd like 20% more"}
                ],
                "current_leverage": 0.5,
                "session_id": null
            })
        );
    }

    #[test]
    fn analysis_payload_without_chat_history_decodes() {
        let payload: AnalysisPayload = serde_json::from_value(serde_json::json!({
            "summary": "Analysis failed to generate.",
            "outcome": "Neutral",
            "strengths": [],
            "mistakes": [],
            "skill_gaps": []
        }))
        .expect("decode fallback analysis");

        let report = AnalysisReport::from(payload);
        assert_eq!(report.outcome, Outcome::Other("Neutral".to_string()));
        assert!(report.transcript_echo.is_none());
    }

    #[test]
    fn other_outcomes_keep_the_label_as_sent() {
        assert_eq!(Outcome::parse(" Success "), Outcome::Success);
        assert_eq!(
            Outcome::parse("Failure "),
            Outcome::Other("Failure ".to_string())
        );
    }

    #[test]
    fn analysis_payload_requires_its_lists() {
        let result = serde_json::from_value::<AnalysisPayload>(serde_json::json!({
            "summary": "Short.",
            "outcome": "Success"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn skill_gaps_are_deduplicated_in_order() {
        let payload: AnalysisPayload = serde_json::from_value(serde_json::json!({
            "summary": "Held firm on the number.",
            "outcome": "success",
            "strengths": [{"point": "Anchoring", "explanation": "Opened high."}],
            "mistakes": [],
            "skill_gaps": ["Active Listening", "Framing", "Active Listening", " "],
            "chat_history": [{"role": "user", "content": "I'd like 20% more"}]
        }))
        .expect("decode analysis");

        let report = AnalysisReport::from(payload);
        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(report.skill_gaps, vec!["Active Listening", "Framing"]);
        assert_eq!(report.transcript_echo.map(|h| h.len()), Some(1));
    }

    #[test]
    fn session_listing_reads_mongo_style_ids() {
        let listing: SessionListing = serde_json::from_value(serde_json::json!({
            "sessions": [{
                "_id": "65f0c0ffee",
                "scenario": "Vendor Contract",
                "leverage": 0.45,
                "timestamp": "2026-02-18T06:17:38.096000",
                "history": [{"role": "user", "content": "hi"}]
            }],
            "count": 1
        }))
        .expect("decode listing");

        assert_eq!(listing.count, 1);
        let session = &listing.sessions[0];
        assert_eq!(session.id, "65f0c0ffee");
        let parsed = session.parsed_timestamp().expect("naive timestamp parses");
        assert_eq!(parsed.to_rfc3339(), "2026-02-18T06:17:38.096+00:00");
    }

    #[test]
    fn rfc3339_timestamps_parse_too() {
        let session = SavedSession {
            id: "a".into(),
            scenario: "b".into(),
            leverage: 0.5,
            timestamp: "2026-02-18T06:17:38+02:00".into(),
        };
        let parsed = session.parsed_timestamp().expect("rfc3339 parses");
        assert_eq!(parsed.to_rfc3339(), "2026-02-18T04:17:38+00:00");
    }
}
