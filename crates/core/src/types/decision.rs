//! Sync decisions emitted by the policy engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How a change is propagated to the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Copy right away
    SyncImmediate,
    /// Copy after a short delay
    SyncDelayed,
    /// Both ends are being edited; wait for them to settle
    WaitStability,
    /// Save the current destination aside, then copy
    BackupSync,
    /// Nothing urgent; copy at a later slot
    ScheduleLater,
    /// Only raise the visible alert, do not copy
    AlertUsers,
}

impl Action {
    /// Returns true if enacting this action overwrites the destination
    pub fn copies(&self) -> bool {
        !matches!(self, Self::AlertUsers)
    }

    /// Returns true if the destination must be backed up first
    pub fn requires_backup(&self) -> bool {
        matches!(self, Self::BackupSync)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SyncImmediate => "SYNC_IMMEDIATE",
            Self::SyncDelayed => "SYNC_DELAYED",
            Self::WaitStability => "WAIT_STABILITY",
            Self::BackupSync => "BACKUP_SYNC",
            Self::ScheduleLater => "SCHEDULE_LATER",
            Self::AlertUsers => "ALERT_USERS",
        };
        f.write_str(name)
    }
}

/// Business impact of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Outcome of evaluating the policy for one change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncDecision {
    pub action: Action,
    pub delay_seconds: u64,
    /// 0..=100
    pub confidence: u8,
    pub impact: Impact,
    pub reasoning: String,
    /// 1-based index of the rule that matched
    pub rule: u8,
}

impl SyncDecision {
    /// Creates a decision, clamping confidence to 100
    pub fn new(
        action: Action,
        delay_seconds: u64,
        confidence: u8,
        impact: Impact,
        reasoning: impl Into<String>,
        rule: u8,
    ) -> Self {
        Self {
            action,
            delay_seconds,
            confidence: confidence.min(100),
            impact,
            reasoning: reasoning.into(),
            rule,
        }
    }

    /// Returns the delay as a `Duration`
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }
}

impl fmt::Display for SyncDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {}s (confidence {}%, impact {}, rule {}): {}",
            self.action, self.delay_seconds, self.confidence, self.impact, self.rule, self.reasoning
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_is_clamped() {
        let d = SyncDecision::new(Action::SyncImmediate, 0, 250, Impact::High, "x", 4);
        assert_eq!(d.confidence, 100);
    }

    #[test]
    fn test_delay_duration() {
        let d = SyncDecision::new(Action::SyncDelayed, 120, 85, Impact::Medium, "x", 7);
        assert_eq!(d.delay(), Duration::from_secs(120));
    }

    #[test]
    fn test_action_flags() {
        assert!(Action::BackupSync.requires_backup());
        assert!(Action::BackupSync.copies());
        assert!(!Action::AlertUsers.copies());
        assert!(!Action::SyncImmediate.requires_backup());
    }

    #[test]
    fn test_impact_ordering() {
        assert!(Impact::Low < Impact::Medium);
        assert!(Impact::Medium < Impact::High);
    }

    #[test]
    fn test_display() {
        let d = SyncDecision::new(Action::WaitStability, 180, 95, Impact::High, "both editing", 1);
        let text = d.to_string();
        assert!(text.starts_with("WAIT_STABILITY in 180s"));
        assert!(text.contains("both editing"));
    }
}
