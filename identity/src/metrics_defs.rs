//! Metrics definitions for authentication.

use shared::metrics_defs::{MetricDef, MetricType};

pub const AUTHENTICATION_RESULT: MetricDef = MetricDef {
    name: "auth.authenticate",
    metric_type: MetricType::Counter,
    description: "Authentication attempts. Tagged with result (ok or the error kind) and credential_type",
};

pub const IDENTITY_RESOLUTION: MetricDef = MetricDef {
    name: "auth.identity_resolution",
    metric_type: MetricType::Counter,
    description: "Authenticated requests by identity state: intrinsic, resolved, skewed or absent",
};

pub const GUARD_REJECTED: MetricDef = MetricDef {
    name: "auth.guard.rejected",
    metric_type: MetricType::Counter,
    description: "Requests rejected by require_org or require_user. Tagged with guard",
};

pub const COLLABORATOR_REQUEST_DURATION: MetricDef = MetricDef {
    name: "auth.collaborator.duration",
    metric_type: MetricType::Histogram,
    description: "Key/identity service call duration in seconds including retries. Tagged with collaborator, outcome",
};

pub const COLLABORATOR_RETRIES: MetricDef = MetricDef {
    name: "auth.collaborator.retries",
    metric_type: MetricType::Counter,
    description: "Retried key/identity service calls. Tagged with collaborator",
};

pub const ALL_METRICS: &[MetricDef] = &[
    AUTHENTICATION_RESULT,
    IDENTITY_RESOLUTION,
    GUARD_REJECTED,
    COLLABORATOR_REQUEST_DURATION,
    COLLABORATOR_RETRIES,
];
