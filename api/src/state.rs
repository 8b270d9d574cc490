use std::sync::Arc;

use medistream_core::classify::Classifier;
use medistream_core::lifecycle::ShiftLifecycle;
use medistream_core::mutation::MutationRouter;
use medistream_core::risk::{EscalationPolicy, RiskEvaluator};
use medistream_core::store::Store;
use medistream_core::summary::SummaryGenerator;

/// Shared application state. Collaborators are constructed once at startup
/// and injected — none of them is a process-wide singleton.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub classifier: Arc<dyn Classifier>,
    pub mutations: Arc<MutationRouter>,
    pub risk: Arc<RiskEvaluator>,
    pub lifecycle: Arc<ShiftLifecycle>,
    /// Placeholder clinician identity until auth lands.
    pub sender_id: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        classifier: Arc<dyn Classifier>,
        summarizer: Arc<dyn SummaryGenerator>,
        escalation_policy: EscalationPolicy,
        sender_id: String,
    ) -> Self {
        Self {
            mutations: Arc::new(MutationRouter::new(store.clone())),
            risk: Arc::new(RiskEvaluator::new(store.clone(), escalation_policy)),
            lifecycle: Arc::new(ShiftLifecycle::new(store.clone(), summarizer)),
            store,
            classifier,
            sender_id,
        }
    }
}
