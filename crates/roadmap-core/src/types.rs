use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Planning priority. Accepts both the named (`critical`, `high`, ...) and the
/// numbered (`p0`..`p3`) spellings, case-insensitively. Anything else parses
/// to `Unknown`, which ranks alongside `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
    Unknown,
}

impl Priority {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" | "p0" => Priority::Critical,
            "high" | "p1" => Priority::High,
            "medium" | "p2" => Priority::Medium,
            "low" | "p3" => Priority::Low,
            _ => Priority::Unknown,
        }
    }

    /// Sort rank, lower is more urgent.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium | Priority::Unknown => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::parse(&s)
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// AiEffectiveness
// ---------------------------------------------------------------------------

/// How well a coding agent is expected to handle a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AiEffectiveness {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl AiEffectiveness {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => AiEffectiveness::High,
            "medium" => AiEffectiveness::Medium,
            "low" => AiEffectiveness::Low,
            _ => AiEffectiveness::Unknown,
        }
    }

    /// Sort rank, lower is preferred. `Unknown` ranks with `Medium`.
    pub fn rank(self) -> u8 {
        match self {
            AiEffectiveness::High => 0,
            AiEffectiveness::Medium | AiEffectiveness::Unknown => 1,
            AiEffectiveness::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AiEffectiveness::High => "high",
            AiEffectiveness::Medium => "medium",
            AiEffectiveness::Low => "low",
            AiEffectiveness::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AiEffectiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AiEffectiveness {
    fn from(s: String) -> Self {
        AiEffectiveness::parse(&s)
    }
}

impl From<AiEffectiveness> for String {
    fn from(a: AiEffectiveness) -> Self {
        a.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_accepts_both_spellings() {
        assert_eq!(Priority::parse("p0"), Priority::Critical);
        assert_eq!(Priority::parse("Critical"), Priority::Critical);
        assert_eq!(Priority::parse("P1"), Priority::High);
        assert_eq!(Priority::parse(" medium "), Priority::Medium);
        assert_eq!(Priority::parse("p3"), Priority::Low);
    }

    #[test]
    fn unknown_priority_ranks_as_medium() {
        let p = Priority::parse("urgent-ish");
        assert_eq!(p, Priority::Unknown);
        assert_eq!(p.rank(), Priority::Medium.rank());
    }

    #[test]
    fn ai_effectiveness_ranks() {
        assert!(AiEffectiveness::High.rank() < AiEffectiveness::Medium.rank());
        assert!(AiEffectiveness::Medium.rank() < AiEffectiveness::Low.rank());
        assert_eq!(
            AiEffectiveness::parse("?").rank(),
            AiEffectiveness::Medium.rank()
        );
    }

    #[test]
    fn priority_yaml_is_lenient() {
        let p: Priority = serde_yaml::from_str("P2").unwrap();
        assert_eq!(p, Priority::Medium);
        let p: Priority = serde_yaml::from_str("whatever").unwrap();
        assert_eq!(p, Priority::Unknown);
        assert_eq!(serde_yaml::to_string(&Priority::High).unwrap().trim(), "high");
    }
}
