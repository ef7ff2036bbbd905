//! A simulated radio node run as two tokio tasks.
//!
//! The driving task owns the [`RadioController`] and ticks it at a fixed
//! cadence. The issuing task owns the [`RadioHandle`]: it turns
//! [`NodeCommand`]s into link requests and dispatches link results as
//! [`NodeEvent`]s.

use crate::{component_debug, component_info, component_warn};
use bytes::Bytes;
use radio_link::{
    Radio, RadioController, RadioDriver, RadioError, RadioHandle, ReceivedPayload,
    TransmitOutcome,
};
use radio_wire::DeviceId;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Work for a node's issuing task
#[derive(Debug, Clone)]
pub enum NodeCommand {
    Send {
        payload: Bytes,
        destination: DeviceId,
        ack_requested: bool,
    },
    StartReceive(Duration),
    StopReceive,
    Sleep,
    Wake,
}

/// Something that happened on a node
#[derive(Debug, Clone)]
pub enum NodeEvent {
    Sent {
        node: DeviceId,
        outcome: TransmitOutcome,
    },
    Received {
        node: DeviceId,
        payload: ReceivedPayload,
    },
    Failed {
        node: DeviceId,
        error: RadioError,
    },
    /// A command was refused because one of its kind is still pending
    Rejected {
        node: DeviceId,
        command: &'static str,
    },
}

/// Running node
pub struct Node<D> {
    pub id: DeviceId,
    commands: mpsc::UnboundedSender<NodeCommand>,
    driving: JoinHandle<RadioController<D>>,
    issuing: JoinHandle<u64>,
}

impl<D> Node<D>
where
    D: RadioDriver + Send + 'static,
{
    /// Split `radio` and start both tasks
    pub fn spawn(
        radio: Radio<D>,
        tick: Duration,
        events: mpsc::UnboundedSender<NodeEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (mut handle, controller) = radio.split();
        let id = handle.device_id();
        register_callbacks(&mut handle, events.clone());

        let (commands, command_rx) = mpsc::unbounded_channel();
        let driving = tokio::spawn(drive(controller, tick, shutdown.clone()));
        let issuing = tokio::spawn(issue(handle, tick, command_rx, events, shutdown));

        component_info!("node", "Node {} started, tick {:?}", id, tick);
        Self {
            id,
            commands,
            driving,
            issuing,
        }
    }

    /// Queue a command for the issuing task
    pub fn command(&self, command: NodeCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    /// Wait for both tasks to stop. Returns the controller and the final transmission count.
    pub async fn join(self) -> anyhow::Result<(RadioController<D>, u64)> {
        let controller = self.driving.await?;
        let transmissions = self.issuing.await?;
        Ok((controller, transmissions))
    }
}

fn register_callbacks(handle: &mut RadioHandle, events: mpsc::UnboundedSender<NodeEvent>) {
    let node = handle.device_id();

    let tx = events.clone();
    handle.on_transmit_complete(move |outcome| {
        let _ = tx.send(NodeEvent::Sent {
            node,
            outcome: *outcome,
        });
    });

    let tx = events.clone();
    handle.on_receive_complete(move |payload| {
        let _ = tx.send(NodeEvent::Received {
            node,
            payload: payload.clone(),
        });
    });

    handle.on_error(move |error| {
        let _ = events.send(NodeEvent::Failed { node, error });
    });
}

async fn drive<D: RadioDriver>(
    mut controller: RadioController<D>,
    tick: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> RadioController<D> {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => controller.tick(),
            _ = shutdown.changed() => break,
        }
    }

    component_debug!("node", "Driving loop for {} stopped", controller.device_id());
    controller
}

async fn issue(
    mut handle: RadioHandle,
    tick: Duration,
    mut commands: mpsc::UnboundedReceiver<NodeCommand>,
    events: mpsc::UnboundedSender<NodeEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                handle.dispatch_results();
            }
            Some(command) = commands.recv() => {
                let (name, accepted) = execute(&handle, command);
                if !accepted {
                    component_warn!("node", "{} refused on {}: request still pending", name, handle.device_id());
                    let _ = events.send(NodeEvent::Rejected { node: handle.device_id(), command: name });
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    // deliver anything published before the driving loop stopped
    handle.dispatch_results();
    handle.transmission_count()
}

fn execute(handle: &RadioHandle, command: NodeCommand) -> (&'static str, bool) {
    match command {
        NodeCommand::Send {
            payload,
            destination,
            ack_requested,
        } => ("send", handle.send(payload, destination, ack_requested)),
        NodeCommand::StartReceive(timeout) => ("start-receive", handle.start_receive(timeout)),
        NodeCommand::StopReceive => ("stop-receive", handle.stop_receive()),
        NodeCommand::Sleep => ("sleep", handle.sleep()),
        NodeCommand::Wake => ("wake", handle.wake()),
    }
}
