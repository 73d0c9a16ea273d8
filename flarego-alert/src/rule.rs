use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ast::Expr;
use crate::error::Result;
use crate::eval::eval_bool;
use crate::parser::parse;

/// A compiled, stateful alert rule.
pub struct Rule {
    name: String,
    expr: Expr,
    for_: Duration,
    sinks: Vec<String>,
    state: RuleState,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum RuleState {
    Inactive,
    Pending { since: Instant },
    Firing,
}

impl Rule {
    pub fn compile(
        name: impl Into<String>,
        expr_source: &str,
        for_: Duration,
        sinks: Vec<String>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            expr: parse(expr_source)?,
            for_,
            sinks,
            state: RuleState::Inactive,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sinks(&self) -> &[String] {
        &self.sinks
    }

    pub fn is_firing(&self) -> bool {
        matches!(self.state, RuleState::Firing)
    }

    /// Evaluates the predicate and advances this rule's hysteresis state
    /// machine. Returns `true` exactly on the pending→firing transition,
    /// once per maximal contiguous true-window of length at least `for`.
    fn tick(&mut self, metrics: &HashMap<String, f64>, now: Instant) -> bool {
        let predicate_true = eval_bool(&self.expr, metrics);
        match self.state {
            RuleState::Inactive => {
                if predicate_true {
                    self.state = RuleState::Pending { since: now };
                }
                false
            }
            RuleState::Pending { since } => {
                if !predicate_true {
                    self.state = RuleState::Inactive;
                    false
                } else if now.duration_since(since) >= self.for_ {
                    self.state = RuleState::Firing;
                    true
                } else {
                    false
                }
            }
            RuleState::Firing => {
                if !predicate_true {
                    self.state = RuleState::Inactive;
                }
                false
            }
        }
    }
}

/// Owns a rule set and evaluates it once per derived-metric snapshot.
pub struct RuleEngine {
    rules: Vec<Rule>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluates every rule against `metrics`, returning the names of rules
    /// that newly transitioned to firing this tick.
    pub fn tick(&mut self, metrics: &HashMap<String, f64>, now: Instant) -> Vec<&str> {
        let mut newly_firing = Vec::new();
        for rule in &mut self.rules {
            if rule.tick(metrics, now) {
                newly_firing.push(rule.name.as_str());
            }
        }
        newly_firing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(value: f64) -> HashMap<String, f64> {
        HashMap::from([("blocked_goroutines".to_string(), value)])
    }

    #[test]
    fn scenario_e_fires_once_after_stabilization_then_returns_to_inactive() {
        let rule = Rule::compile(
            "blocked",
            "blocked_goroutines > 150",
            Duration::from_secs(1),
            vec!["log".into()],
        )
        .unwrap();
        let mut engine = RuleEngine::new(vec![rule]);

        let t0 = Instant::now();
        assert!(engine.tick(&metrics(200.0), t0).is_empty());
        assert!(
            engine
                .tick(&metrics(200.0), t0 + Duration::from_millis(500))
                .is_empty()
        );
        let fired = engine.tick(&metrics(200.0), t0 + Duration::from_millis(1100));
        assert_eq!(fired, vec!["blocked"]);

        // Already firing: no repeat notification.
        assert!(
            engine
                .tick(&metrics(200.0), t0 + Duration::from_millis(1200))
                .is_empty()
        );

        // False evaluation returns to inactive with no notification.
        assert!(
            engine
                .tick(&metrics(100.0), t0 + Duration::from_millis(1300))
                .is_empty()
        );
        assert!(!engine.rules()[0].is_firing());
    }

    #[test]
    fn a_false_evaluation_during_pending_resets_to_inactive() {
        let rule = Rule::compile(
            "blocked",
            "blocked_goroutines > 150",
            Duration::from_secs(1),
            vec![],
        )
        .unwrap();
        let mut engine = RuleEngine::new(vec![rule]);
        let t0 = Instant::now();
        engine.tick(&metrics(200.0), t0);
        engine.tick(&metrics(100.0), t0 + Duration::from_millis(200));
        let fired = engine.tick(&metrics(200.0), t0 + Duration::from_millis(900));
        assert!(fired.is_empty(), "window was interrupted, must not fire early");
    }
}
