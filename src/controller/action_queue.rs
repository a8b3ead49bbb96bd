use super::FlowResult;
use crate::page::NodeId;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

#[derive(Debug)]
pub(super) enum Action {
    /// Stop every Working row except `except`, without switching the log to Idle
    StopOthers { except: NodeId },
    /// Start or stop `row`; the outcome goes to `done`
    Toggle {
        row: NodeId,
        done: oneshot::Sender<FlowResult>,
    },
}

pub(super) type ActionTx = UnboundedSender<Action>;
pub(super) type ActionRx = UnboundedReceiver<Action>;

pub(super) fn channel() -> (ActionTx, ActionRx) {
    mpsc::unbounded_channel()
}
