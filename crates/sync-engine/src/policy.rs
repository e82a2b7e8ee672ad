// crates/sync-engine/src/policy.rs
//! Decision policy
//!
//! An ordered rule table evaluated top to bottom; the first matching rule
//! produces the decision. The last rule always matches, so every context
//! gets exactly one decision.

use chrono::{DateTime, Datelike, Local, Timelike};
use std::time::SystemTime;
use syncguard_config::PolicyConfig;
use syncguard_core::{
    Action, ChangeEvent, ConflictContext, EditingState, Impact, SyncDecision, Timestamp,
};

/// Facts a rule predicate can look at
struct Facts<'a> {
    ctx: &'a ConflictContext,
    large_change: bool,
}

struct Rule {
    id: u8,
    applies: fn(&Facts<'_>) -> bool,
    action: Action,
    delay_seconds: u64,
    confidence: u8,
    impact: Impact,
    reasoning: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        id: 1,
        applies: |f| f.ctx.source_editing && f.ctx.dest_editing,
        action: Action::WaitStability,
        delay_seconds: 180,
        confidence: 95,
        impact: Impact::High,
        reasoning: "Both copies are open for editing; waiting for them to settle avoids losing either edit",
    },
    Rule {
        id: 2,
        applies: |f| f.ctx.dest_editing && f.ctx.is_critical_file,
        action: Action::BackupSync,
        delay_seconds: 60,
        confidence: 92,
        impact: Impact::High,
        reasoning: "Critical file is open at the destination; keep a backup before overwriting it",
    },
    Rule {
        id: 3,
        applies: |f| f.ctx.source_editing && f.ctx.is_critical_file,
        action: Action::SyncDelayed,
        delay_seconds: 120,
        confidence: 88,
        impact: Impact::High,
        reasoning: "Critical file is still being edited at the source; give the editor time to save",
    },
    Rule {
        id: 4,
        applies: |f| f.ctx.is_critical_file && f.ctx.is_business_hours && !f.ctx.has_conflict(),
        action: Action::SyncImmediate,
        delay_seconds: 0,
        confidence: 96,
        impact: Impact::High,
        reasoning: "Critical file changed during business hours with no one editing it; publish now",
    },
    Rule {
        id: 5,
        applies: |f| f.large_change && f.ctx.is_critical_file,
        action: Action::BackupSync,
        delay_seconds: 60,
        confidence: 92,
        impact: Impact::High,
        reasoning: "Large change to a critical file; keep a backup of the previous version",
    },
    Rule {
        id: 6,
        applies: |f| f.ctx.is_business_hours && f.ctx.is_critical_file,
        action: Action::SyncImmediate,
        delay_seconds: 0,
        confidence: 89,
        impact: Impact::High,
        reasoning: "Critical file during business hours",
    },
    Rule {
        id: 7,
        applies: |f| f.ctx.is_business_hours,
        action: Action::SyncDelayed,
        delay_seconds: 120,
        confidence: 85,
        impact: Impact::Medium,
        reasoning: "Regular file during business hours; a short delay batches follow-up saves",
    },
    Rule {
        id: 8,
        applies: |f| f.ctx.last_sync_is_stale(),
        action: Action::ScheduleLater,
        delay_seconds: 300,
        confidence: 82,
        impact: Impact::Medium,
        reasoning: "Outside business hours and the last sync is over an hour old",
    },
    Rule {
        id: 8,
        applies: |_| true,
        action: Action::ScheduleLater,
        delay_seconds: 600,
        confidence: 75,
        impact: Impact::Low,
        reasoning: "Outside business hours and recently synced; nothing urgent",
    },
];

/// Deterministic mapping from a conflict context to a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionPolicy {
    large_change_bytes: u64,
}

impl DecisionPolicy {
    pub fn new(large_change_bytes: u64) -> Self {
        Self { large_change_bytes }
    }

    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.large_change_bytes)
    }

    /// Returns true if a change of `bytes` counts as large
    pub fn is_large_change(&self, bytes: u64) -> bool {
        bytes > self.large_change_bytes
    }

    /// Evaluates the rule table
    pub fn decide(&self, ctx: &ConflictContext) -> SyncDecision {
        let facts = Facts {
            ctx,
            large_change: self.is_large_change(ctx.change_size_bytes),
        };

        // The final rule matches unconditionally.
        let rule = RULES
            .iter()
            .find(|rule| (rule.applies)(&facts))
            .unwrap_or(&RULES[RULES.len() - 1]);

        SyncDecision::new(
            rule.action,
            rule.delay_seconds,
            rule.confidence,
            rule.impact,
            rule.reasoning,
            rule.id,
        )
    }
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::from_config(&PolicyConfig::default())
    }
}

/// Derives the file and calendar facts of a conflict context
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    config: PolicyConfig,
}

impl ContextBuilder {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Returns true if `now` falls inside business hours, in local time
    pub fn is_business_hours(&self, now: SystemTime) -> bool {
        let local: DateTime<Local> = now.into();
        self.config.is_business_time(local.weekday(), local.hour())
    }

    /// Builds the context for one change
    pub fn build(
        &self,
        event: &ChangeEvent,
        editing: EditingState,
        now: SystemTime,
        last_sync: Option<Timestamp>,
    ) -> ConflictContext {
        let now_ts = Timestamp::from_system_time(now);
        let last_sync_minutes_ago =
            last_sync.map(|at| now_ts.since(at).as_secs_f64() / 60.0);

        ConflictContext::new(
            editing,
            self.config.is_critical_name(&event.file_name()),
            self.is_business_hours(now),
            event.size,
            last_sync_minutes_ago,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ctx(source: bool, dest: bool, critical: bool, business: bool) -> ConflictContext {
        ConflictContext::new(
            EditingState {
                source_editing: source,
                dest_editing: dest,
            },
            critical,
            business,
            1_024,
            Some(5.0),
        )
    }

    #[test]
    fn test_both_editing_waits() {
        let decision = DecisionPolicy::default().decide(&ctx(true, true, true, true));
        assert_eq!(decision.action, Action::WaitStability);
        assert_eq!(decision.delay_seconds, 180);
        assert_eq!(decision.confidence, 95);
        assert_eq!(decision.rule, 1);
    }

    #[test]
    fn test_dest_editing_critical_backs_up() {
        let decision = DecisionPolicy::default().decide(&ctx(false, true, true, false));
        assert_eq!(decision.action, Action::BackupSync);
        assert_eq!(decision.delay_seconds, 60);
        assert_eq!(decision.rule, 2);
    }

    #[test]
    fn test_source_editing_critical_delays() {
        let decision = DecisionPolicy::default().decide(&ctx(true, false, true, true));
        assert_eq!(decision.action, Action::SyncDelayed);
        assert_eq!(decision.delay_seconds, 120);
        assert_eq!(decision.confidence, 88);
    }

    #[test]
    fn test_critical_business_hours_is_immediate() {
        let decision = DecisionPolicy::default().decide(&ctx(false, false, true, true));
        assert_eq!(decision.action, Action::SyncImmediate);
        assert_eq!(decision.confidence, 96);
        assert_eq!(decision.rule, 4);
    }

    #[test]
    fn test_large_critical_change_backs_up() {
        let mut context = ctx(false, false, true, false);
        context.change_size_bytes = 600 * 1024;
        let decision = DecisionPolicy::default().decide(&context);
        assert_eq!(decision.action, Action::BackupSync);
        assert_eq!(decision.rule, 5);

        context.change_size_bytes = 512 * 1024;
        assert_ne!(DecisionPolicy::default().decide(&context).rule, 5);
    }

    #[test]
    fn test_regular_file_business_hours() {
        let decision = DecisionPolicy::default().decide(&ctx(false, false, false, true));
        assert_eq!(decision.action, Action::SyncDelayed);
        assert_eq!(decision.impact, Impact::Medium);
        assert_eq!(decision.rule, 7);
    }

    #[test]
    fn test_dest_editing_regular_file_during_business_hours() {
        let decision = DecisionPolicy::default().decide(&ctx(false, true, false, true));
        assert_eq!(decision.rule, 7);
    }

    #[test]
    fn test_schedule_later_recent_sync() {
        let decision = DecisionPolicy::default().decide(&ctx(false, false, false, false));
        assert_eq!(decision.action, Action::ScheduleLater);
        assert_eq!(decision.delay_seconds, 600);
        assert_eq!(decision.confidence, 75);
        assert_eq!(decision.impact, Impact::Low);
    }

    #[test]
    fn test_schedule_later_stale_sync() {
        let mut context = ctx(false, false, false, false);
        context.last_sync_minutes_ago = None;
        let decision = DecisionPolicy::default().decide(&context);
        assert_eq!(decision.delay_seconds, 300);
        assert_eq!(decision.confidence, 82);
        assert_eq!(decision.rule, 8);
    }

    #[test]
    fn test_rules_never_produce_alert_only() {
        for bits in 0u8..16 {
            let context = ctx(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);
            let decision = DecisionPolicy::default().decide(&context);
            assert_ne!(decision.action, Action::AlertUsers);
            assert!(!decision.reasoning.is_empty());
        }
    }

    #[test]
    fn test_context_builder_critical_name() {
        let builder = ContextBuilder::new(PolicyConfig::default());
        let event = ChangeEvent::new("/data/Catalogo_2024.xlsx", 2_048, Timestamp::from_millis(0));
        let now = SystemTime::now();
        let context = builder.build(&event, EditingState::default(), now, None);

        assert!(context.is_critical_file);
        assert_eq!(context.change_size_bytes, 2_048);
        assert!(context.last_sync_minutes_ago.is_none());
    }

    #[test]
    fn test_context_builder_last_sync_minutes() {
        let builder = ContextBuilder::new(PolicyConfig::default());
        let event = ChangeEvent::new("/data/notes.docx", 10, Timestamp::from_millis(0));
        let now = SystemTime::now();
        let last = Timestamp::from_system_time(now - Duration::from_secs(90 * 60));
        let context = builder.build(&event, EditingState::default(), now, Some(last));

        assert!(!context.is_critical_file);
        let minutes = context.last_sync_minutes_ago.unwrap();
        assert!((minutes - 90.0).abs() < 0.1);
    }

    #[test]
    fn test_business_hours_follow_config() {
        let always = PolicyConfig {
            business_hours_start: 0,
            business_hours_end: 24,
            business_days: vec![
                syncguard_config::BusinessDay::Monday,
                syncguard_config::BusinessDay::Tuesday,
                syncguard_config::BusinessDay::Wednesday,
                syncguard_config::BusinessDay::Thursday,
                syncguard_config::BusinessDay::Friday,
                syncguard_config::BusinessDay::Saturday,
                syncguard_config::BusinessDay::Sunday,
            ],
            ..PolicyConfig::default()
        };
        assert!(ContextBuilder::new(always).is_business_hours(SystemTime::now()));

        let never = PolicyConfig {
            business_days: Vec::new(),
            ..PolicyConfig::default()
        };
        assert!(!ContextBuilder::new(never).is_business_hours(SystemTime::now()));
    }
}
