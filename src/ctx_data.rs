use std::sync::Arc;

use crate::{dispatch::Dispatcher, forms::PendingForms, issue::IssueTracker, settings::Settings};

pub struct CtxData {
    pub settings: Settings,
    pub forms: Arc<PendingForms>,
    pub dispatcher: Dispatcher,
}

impl CtxData {
    pub fn new(settings: Settings, tracker: Arc<dyn IssueTracker>) -> Self {
        let forms = Arc::new(PendingForms::new(
            settings.forms.ttl(),
            settings.forms.max_pending,
        ));
        let dispatcher = Dispatcher::new(&settings, forms.clone(), tracker);
        Self {
            settings,
            forms,
            dispatcher,
        }
    }
}
