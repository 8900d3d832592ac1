use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub severity: Severity,
    pub email_eligible: bool,
    pub digestible: bool,
}

/// Channel decision derived from a classification. In-app delivery always
/// happens; a digestible event suppresses the immediate email in favor of the
/// next digest run (cadence is the DigestScheduler's concern, not ours).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub in_app: bool,
    pub immediate_email: bool,
    pub digest: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventType(pub String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event type '{}' is not registered", self.0)
    }
}

impl std::error::Error for UnknownEventType {}

use Severity::{Critical, Info, Warning};

/// Exhaustive severity registry. Every event type the platform emits must
/// appear here; classifying an unlisted type is a programming error.
const SEVERITY_TABLE: &[(&str, Severity)] = &[
    // Admissions
    ("admission.created", Info),
    ("admission.approved", Info),
    ("admission.rejected", Warning),
    ("admission.deleted", Info),
    // Finance
    ("income.created", Info),
    ("income.updated", Info),
    ("income.deleted", Info),
    ("expense.created", Info),
    ("expense.approved", Info),
    ("expense.rejected", Warning),
    ("expense.deleted", Info),
    ("invoice.created", Info),
    ("payment.received", Info),
    ("invoice.overdue", Warning),
    ("finance.account.low_balance", Warning),
    ("finance.project.budget_warning", Warning),
    ("finance_document.created", Info),
    ("finance_document.deleted", Info),
    // Library
    ("library.book_overdue", Warning),
    ("library.book_due_soon", Info),
    ("library.book_reserved", Info),
    // Assets
    ("asset.assigned", Info),
    ("asset.maintenance_due", Warning),
    ("asset.returned", Info),
    // Fees
    ("fee.assignment.created", Info),
    ("fee.payment.received", Info),
    ("fee.assignment.overdue", Warning),
    ("fee.assignment.paid", Info),
    ("fee.assignment.status_changed", Info),
    // Exams
    ("exam.created", Info),
    ("exam.published", Info),
    ("exam.marks_published", Info),
    ("exam.timetable_updated", Info),
    ("exam.marks_updated", Info),
    // Students
    ("student.created", Info),
    ("student.updated", Info),
    ("student.deleted", Info),
    // Document management
    ("doc.assigned", Info),
    ("doc.approved", Info),
    ("doc.returned", Info),
    // Attendance
    ("attendance.sync_failed", Critical),
    ("attendance.anomaly", Warning),
    ("attendance.session.created", Info),
    ("attendance.session.closed", Info),
    // Security
    ("security.password_changed", Warning),
    ("security.new_device_login", Warning),
    // Subscription
    ("subscription.limit_approaching", Warning),
    ("subscription.limit_reached", Critical),
    ("subscription.expiring_soon", Warning),
    ("subscription.expired", Critical),
    // System
    ("system.backup_failed", Critical),
    ("system.license_expiring", Warning),
];

/// Intentionally a subset of the severity registry: absence means "no email",
/// not an error.
const EMAIL_ELIGIBLE: &[&str] = &[
    "admission.created",
    "admission.approved",
    "admission.rejected",
    "invoice.created",
    "payment.received",
    "invoice.overdue",
    "finance.account.low_balance",
    "finance.project.budget_warning",
    "library.book_overdue",
    "asset.assigned",
    "fee.assignment.created",
    "fee.payment.received",
    "fee.assignment.overdue",
    "fee.assignment.paid",
    "exam.published",
    "exam.marks_published",
    "doc.assigned",
    "attendance.sync_failed",
    "security.password_changed",
    "security.new_device_login",
    "subscription.limit_approaching",
    "subscription.limit_reached",
    "subscription.expiring_soon",
    "subscription.expired",
    "system.backup_failed",
    "system.license_expiring",
];

/// Events batched into the periodic digest instead of sent one-by-one.
const DIGEST: &[&str] = &[
    "invoice.overdue",
    "finance.project.budget_warning",
    "library.book_overdue",
    "library.book_due_soon",
    "asset.maintenance_due",
    "fee.assignment.overdue",
    "exam.timetable_updated",
    "attendance.anomaly",
    "subscription.limit_approaching",
    "subscription.expiring_soon",
    "system.license_expiring",
];

struct RoutingTables {
    severity: HashMap<&'static str, Severity>,
    email: HashSet<&'static str>,
    digest: HashSet<&'static str>,
}

fn tables() -> &'static RoutingTables {
    static TABLES: OnceLock<RoutingTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let severity: HashMap<&'static str, Severity> =
            SEVERITY_TABLE.iter().copied().collect();
        assert_eq!(
            severity.len(),
            SEVERITY_TABLE.len(),
            "duplicate event type in severity table"
        );
        let email: HashSet<&'static str> = EMAIL_ELIGIBLE.iter().copied().collect();
        let digest: HashSet<&'static str> = DIGEST.iter().copied().collect();
        // Membership tables must not name events the severity registry does
        // not know about.
        for key in email.iter().chain(digest.iter()) {
            assert!(
                severity.contains_key(key),
                "event type {key} missing from severity table"
            );
        }
        RoutingTables {
            severity,
            email,
            digest,
        }
    })
}

pub fn classify(event_type: &str) -> Result<Classification, UnknownEventType> {
    let t = tables();
    let severity = t
        .severity
        .get(event_type)
        .copied()
        .ok_or_else(|| UnknownEventType(event_type.to_string()))?;
    Ok(Classification {
        severity,
        email_eligible: t.email.contains(event_type),
        digestible: t.digest.contains(event_type),
    })
}

pub fn delivery_plan(event_type: &str) -> Result<DeliveryPlan, UnknownEventType> {
    let c = classify(event_type)?;
    Ok(DeliveryPlan {
        in_app: true,
        immediate_email: c.email_eligible && !c.digestible,
        digest: c.digestible,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overdue_fee_is_warning_email_digest() {
        let c = classify("fee.assignment.overdue").expect("classify");
        assert_eq!(c.severity, Severity::Warning);
        assert!(c.email_eligible);
        assert!(c.digestible);
    }

    #[test]
    fn unregistered_event_is_an_error() {
        let err = classify("unregistered.event").unwrap_err();
        assert_eq!(err, UnknownEventType("unregistered.event".to_string()));
    }

    #[test]
    fn absence_from_email_table_means_false() {
        let c = classify("student.updated").expect("classify");
        assert_eq!(c.severity, Severity::Info);
        assert!(!c.email_eligible);
        assert!(!c.digestible);
    }

    #[test]
    fn digestible_event_suppresses_immediate_email() {
        let plan = delivery_plan("fee.assignment.overdue").expect("plan");
        assert!(plan.in_app);
        assert!(!plan.immediate_email);
        assert!(plan.digest);

        // Email-eligible but not digestible goes out immediately.
        let plan = delivery_plan("system.backup_failed").expect("plan");
        assert!(plan.in_app);
        assert!(plan.immediate_email);
        assert!(!plan.digest);
    }

    #[test]
    fn membership_tables_are_subsets_of_severity() {
        // tables() asserts integrity when first built.
        let t = tables();
        for key in t.email.iter().chain(t.digest.iter()) {
            assert!(t.severity.contains_key(key));
        }
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Severity::Warning).unwrap(), "warning");
        assert_eq!(serde_json::to_value(Severity::Info).unwrap(), "info");
        assert_eq!(serde_json::to_value(Severity::Critical).unwrap(), "critical");
    }
}
