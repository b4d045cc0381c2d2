//! Rule records and the rule-state evaluator.
//!
//! A rule is a standing replication directive the catalog works toward.
//! Before creating a new one, the injection loop inspects the rules a
//! target already carries and classifies each: still trustworthy, worth
//! recreating, or permanently failed. The evaluator is pure — the clock
//! and the policy arrive as arguments.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

const SECS_PER_DAY: u64 = 86_400;

/// Lifecycle state the catalog reports for a rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleState {
    Ok,
    Replicating,
    Injecting,
    Suspended,
    Stuck,
    WaitingApproval,
}

/// One replication rule as returned by `Catalog::list_rules`.
///
/// Transient: fetched fresh whenever a decision is needed, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleRecord {
    pub id: String,
    pub state: RuleState,
    /// Blocking error reported by the catalog, if any.
    #[serde(default)]
    pub error: Option<String>,
    /// Epoch seconds when the rule became stuck, if it is.
    #[serde(default)]
    pub stuck_at: Option<u64>,
    /// Epoch seconds when the rule was created.
    pub created_at: u64,
    /// Unresolved storage expression the rule pins data to.
    pub rse_expression: String,
}

/// What orchestration may do with an existing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleDisposition {
    /// The rule protects its data; its RSE expression counts as covered.
    Usable,
    /// Not protecting its data now; a replacement may be created.
    Recreatable,
    /// Beyond automatic repair; never recreate, flag for an operator.
    PermanentlyFailed,
}

/// Evaluation policy knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RulePolicy {
    /// A stuck rule older than this many days stops counting as usable.
    pub stuck_limit_days: u64,
}

impl Default for RulePolicy {
    fn default() -> Self {
        Self { stuck_limit_days: 7 }
    }
}

/// Classify a single rule.
///
/// In-flight states (replicating, injecting, suspended) are candidates
/// for recreation this cycle. A stuck rule with a no-sources error is
/// permanently failed regardless of age; any other stuck rule stays
/// usable until it ages past `policy.stuck_limit_days`, counted from
/// `stuck_at` when the catalog reports it, else from `created_at`.
pub fn evaluate_rule(rule: &RuleRecord, now_epoch: u64, policy: &RulePolicy) -> RuleDisposition {
    match rule.state {
        RuleState::Replicating | RuleState::Injecting | RuleState::Suspended => {
            debug!(
                rule = %rule.id,
                state = ?rule.state,
                rse = %rule.rse_expression,
                "rule still in flight, candidate for recreation"
            );
            RuleDisposition::Recreatable
        }
        RuleState::Stuck => {
            if rule.error.as_deref().is_some_and(is_no_sources) {
                error!(
                    rule = %rule.id,
                    rse = %rule.rse_expression,
                    error = rule.error.as_deref().unwrap_or(""),
                    "rule stuck with no available sources, will not recreate"
                );
                return RuleDisposition::PermanentlyFailed;
            }
            let since = rule.stuck_at.unwrap_or(rule.created_at);
            let age_days = now_epoch.saturating_sub(since) / SECS_PER_DAY;
            if age_days > policy.stuck_limit_days {
                warn!(
                    rule = %rule.id,
                    rse = %rule.rse_expression,
                    age_days,
                    limit_days = policy.stuck_limit_days,
                    "stuck rule past the age limit, candidate for recreation"
                );
                RuleDisposition::Recreatable
            } else {
                RuleDisposition::Usable
            }
        }
        RuleState::Ok | RuleState::WaitingApproval => RuleDisposition::Usable,
    }
}

/// RSE expressions of `target`'s usable rules, deduplicated and sorted.
///
/// `rules` is the raw `list_rules` result: `None` means the query itself
/// failed and propagates as `None`, so callers never mistake a failed
/// query for an unprotected target. An empty slice yields `Some` of an
/// empty list.
pub fn usable_rses(
    target: &str,
    rules: Option<&[RuleRecord]>,
    now_epoch: u64,
    policy: &RulePolicy,
) -> Option<Vec<String>> {
    let rules = rules?;

    let mut expressions = BTreeSet::new();
    for rule in rules {
        if evaluate_rule(rule, now_epoch, policy) == RuleDisposition::Usable {
            expressions.insert(rule.rse_expression.clone());
        }
    }

    debug!(
        %target,
        rules = rules.len(),
        usable = expressions.len(),
        "evaluated existing rules"
    );
    Some(expressions.into_iter().collect())
}

/// The catalog's signature for a transfer with no viable source replica.
fn is_no_sources(error: &str) -> bool {
    error.to_ascii_lowercase().contains("no_sources")
}
