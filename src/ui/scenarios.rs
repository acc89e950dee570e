//! Built-in rehearsal scenarios.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Beginner,
    Medium,
    Advanced,
    Hard,
}

impl Difficulty {
    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Medium => "medium",
            Difficulty::Advanced => "advanced",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub title: &'static str,
    pub description: &'static str,
    pub duration_mins: u32,
    pub difficulty: Difficulty,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        title: "Annual Salary Raise",
        description: "Negotiate a 20% raise with your manager.",
        duration_mins: 15,
        difficulty: Difficulty::Medium,
    },
    Scenario {
        title: "Promotion Discussion",
        description: "Transition from Senior Dev to Lead.",
        duration_mins: 20,
        difficulty: Difficulty::Medium,
    },
    Scenario {
        title: "Client Rate Increase",
        description: "Convince a legacy client to accept new rates.",
        duration_mins: 18,
        difficulty: Difficulty::Hard,
    },
    Scenario {
        title: "Entry-Level Offer",
        description: "First job offer negotiation.",
        duration_mins: 12,
        difficulty: Difficulty::Beginner,
    },
    Scenario {
        title: "Project Timeline",
        description: "Push back on an impossible deadline.",
        duration_mins: 10,
        difficulty: Difficulty::Advanced,
    },
    Scenario {
        title: "Vendor Contract",
        description: "Negotiate software licensing costs.",
        duration_mins: 14,
        difficulty: Difficulty::Medium,
    },
];

/// Look up a scenario by its 1-based position in the list.
pub fn by_number(number: usize) -> Option<&'static Scenario> {
    number.checked_sub(1).and_then(|index| SCENARIOS.get(index))
}
