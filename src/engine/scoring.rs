//! Health scoring: additive penalty per issue, floored at zero.

use super::types::{HealthIssue, HEALTHY_SCORE};

pub const MAX_SCORE: f64 = 100.0;

pub fn health_score(issues: &[HealthIssue]) -> f64 {
    let penalty: f64 = issues.iter().map(|i| i.level.deduction()).sum();
    (MAX_SCORE - penalty).max(0.0)
}

pub fn is_healthy(score: f64) -> bool {
    score >= HEALTHY_SCORE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::HealthLevel;

    fn issue(level: HealthLevel) -> HealthIssue {
        HealthIssue {
            level,
            issue_type: "test".into(),
            description: String::new(),
            affected_count: 1,
            suggested_recovery: None,
            auto_recoverable: false,
            recovery_confidence: 0.0,
        }
    }

    #[test]
    fn test_no_issues_is_perfect() {
        assert_eq!(health_score(&[]), 100.0);
        assert!(is_healthy(100.0));
    }

    #[test]
    fn test_single_critical_scores_seventy() {
        let score = health_score(&[issue(HealthLevel::Critical)]);
        assert_eq!(score, 70.0);
        // boundary is inclusive
        assert!(is_healthy(score));
    }

    #[test]
    fn test_penalties_compound() {
        let issues = [
            issue(HealthLevel::Info),
            issue(HealthLevel::Warning),
            issue(HealthLevel::Critical),
        ];
        assert_eq!(health_score(&issues), 50.0);
        assert!(!is_healthy(health_score(&issues)));
    }

    #[test]
    fn test_floor_at_zero() {
        let issues = vec![issue(HealthLevel::Emergency); 3];
        assert_eq!(health_score(&issues), 0.0);
    }
}
