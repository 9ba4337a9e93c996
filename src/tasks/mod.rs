use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};

use crate::{ctx_data::CtxData, tasks::form_sweep::FormSweepTask};

mod form_sweep;

#[async_trait]
pub trait Task: Send + Sync {
    fn get_interval(&self) -> Duration;
    async fn work(&self);
}

fn get_tasks(ctx_data: &Arc<CtxData>) -> Vec<Box<dyn Task>> {
    let tasks: Vec<Box<dyn Task>> = vec![Box::new(FormSweepTask::new(ctx_data.forms.clone()))];
    tasks
}

pub fn start_tasks(ctx_data: &Arc<CtxData>) {
    for task in get_tasks(ctx_data) {
        tokio::task::spawn(async move {
            loop {
                sleep(task.get_interval()).await;
                task.work().await;
            }
        });
    }
}
