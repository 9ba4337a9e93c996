use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Duration;
use tracing::debug;

use crate::{forms::PendingForms, tasks::Task};

pub struct FormSweepTask {
    forms: Arc<PendingForms>,
}

impl FormSweepTask {
    pub fn new(forms: Arc<PendingForms>) -> Self {
        Self { forms }
    }
}

#[async_trait]
impl Task for FormSweepTask {
    fn get_interval(&self) -> Duration {
        (self.forms.ttl() / 2).max(Duration::from_secs(1))
    }

    async fn work(&self) {
        let evicted = self.forms.evict_expired();
        if evicted > 0 {
            debug!("evicted {evicted} expired forms, {} pending", self.forms.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commands::Notify, forms::PendingForm, issue::Repository};

    #[tokio::test(start_paused = true)]
    async fn sweeps_at_half_the_lifetime() {
        let forms = Arc::new(PendingForms::new(Duration::from_secs(60), 8));
        let task = FormSweepTask::new(forms.clone());
        forms.open(PendingForm {
            repository: Repository::new("acme", "widgets").unwrap(),
            notify: Notify::Private,
            user: 1,
        });

        assert_eq!(task.get_interval(), Duration::from_secs(30));

        task.work().await;
        assert_eq!(forms.len(), 1);

        tokio::time::advance(Duration::from_secs(60)).await;
        task.work().await;
        assert_eq!(forms.len(), 0);
    }

    #[test]
    fn interval_never_drops_below_a_second() {
        let task = FormSweepTask::new(Arc::new(PendingForms::new(Duration::from_secs(1), 8)));

        assert_eq!(task.get_interval(), Duration::from_secs(1));
    }
}
