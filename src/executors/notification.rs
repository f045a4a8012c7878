use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::{
    executors::{
        ExecutorInput, ExecutorOutput, NodeExecutor, NodeFailure, kind_mismatch,
        providers::{Notification, NotificationSink},
    },
    flow::{NodeKind, NodeType},
};

/// Hands `notification` nodes to the host's [`NotificationSink`].
pub struct NotificationExecutor {
    sink: Arc<dyn NotificationSink>,
}

impl NotificationExecutor {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
        }
    }
}

#[async_trait]
impl NodeExecutor for NotificationExecutor {
    fn node_type(&self) -> NodeType {
        NodeType::Notification
    }

    async fn execute(
        &self,
        input: ExecutorInput,
    ) -> Result<ExecutorOutput, NodeFailure> {
        let NodeKind::Notification(config) = &input.node.kind else {
            return Err(kind_mismatch(NodeType::Notification, &input.node));
        };

        let notification = Notification {
            run_id: input.run_id.clone(),
            channel: config.channel,
            recipient: input.resolve_opt(config.recipient.as_deref())?,
            subject: input.resolve_opt(config.subject.as_deref())?,
            message: input.resolve(&config.message)?,
        };
        let channel = notification.channel;
        let recipient = notification.recipient.clone();

        self.sink.send(notification).await?;

        Ok(ExecutorOutput::new(json!({
            "delivered": true,
            "channel": channel.as_ref(),
            "recipient": recipient,
        })))
    }
}
