use chrono::{SecondsFormat, Utc};

use crate::crd::{Condition, ConditionStatus, ConditionType};

pub const REASON_NOT_FOUND_SUFFIX: &str = "NotFound";
pub const REASON_READY_SUFFIX: &str = "Ready";
pub const REASON_NOT_READY_SUFFIX: &str = "NotReady";
pub const REASON_GET_FAILED_SUFFIX: &str = "GetFailed";
pub const REASON_ROUTE_NOT_ADMITTED: &str = "RouteNotAdmitted";
pub const REASON_ALL_COMPONENTS_READY: &str = "AllComponentsReady";

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn find_status_condition(
    conditions: &[Condition],
    type_: ConditionType,
) -> Option<&Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Upsert `new` by condition type. The transition time only moves when the
/// status flips (or the entry is new). Returns whether anything changed.
pub fn set_status_condition(
    conditions: &mut Vec<Condition>,
    mut new: Condition,
    now: &str,
) -> bool {
    let Some(existing) = conditions.iter_mut().find(|c| c.type_ == new.type_)
    else {
        if new.last_transition_time.is_none() {
            new.last_transition_time = Some(now.to_string());
        }
        conditions.push(new);
        return true;
    };

    let mut changed = false;
    if existing.status != new.status {
        existing.status = new.status;
        existing.last_transition_time = Some(
            new.last_transition_time
                .take()
                .unwrap_or_else(|| now.to_string()),
        );
        changed = true;
    }
    if existing.reason != new.reason {
        existing.reason = new.reason;
        changed = true;
    }
    if existing.message != new.message {
        existing.message = new.message;
        changed = true;
    }
    changed
}

/// Fold the per-child conditions already on the record into the overall
/// `Available` verdict. The first unready child in Deployment, Service,
/// Route order decides the reason.
pub fn aggregate_overall(conditions: &[Condition]) -> Condition {
    let ordered = [
        (ConditionType::DeploymentAvailable, "Deployment"),
        (ConditionType::ServiceAvailable, "Service"),
        (ConditionType::RouteAvailable, "Route"),
    ];
    for (type_, label) in ordered {
        let ready = find_status_condition(conditions, type_)
            .map(Condition::is_true)
            .unwrap_or(false);
        if !ready {
            return Condition::new(
                ConditionType::Available,
                ConditionStatus::False,
                format!("{}{}", label, REASON_NOT_READY_SUFFIX),
                format!("{} is not yet ready", label),
            );
        }
    }
    Condition::new(
        ConditionType::Available,
        ConditionStatus::True,
        REASON_ALL_COMPONENTS_READY,
        "All managed components (Deployment, Service, Route) are ready",
    )
}
