use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use admissions_tracker::config::SchedulerConfig;
use admissions_tracker::tracking::RetentionPolicy;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn retention_from(config: &SchedulerConfig) -> RetentionPolicy {
    RetentionPolicy {
        read_retention_days: config.read_retention_days,
        unread_retention_days: config.unread_retention_days,
    }
}
