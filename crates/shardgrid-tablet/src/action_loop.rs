//! Per-tablet action loop.
//!
//! Every tablet owns one background task that receives commands over an
//! mpsc channel and executes them strictly in arrival order. The loop
//! ends when it processes a `Stop` command, when every handle is
//! dropped, or when the shutdown signal fires (the process going away
//! without draining its queue).

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use shardgrid_core::TabletAlias;

use crate::daemon::MysqlDaemon;
use crate::error::{TabletError, TabletResult};
use crate::permissions::PermissionSnapshot;

/// Capacity of a tablet's command queue.
const COMMAND_QUEUE_DEPTH: usize = 64;

/// A command addressed to one tablet, with the channel for its reply.
#[derive(Debug)]
pub enum TabletCommand {
    GetPermissions {
        reply: oneshot::Sender<TabletResult<PermissionSnapshot>>,
    },
    Ping {
        reply: oneshot::Sender<()>,
    },
    /// Finish the current queue position, acknowledge, and exit.
    Stop { reply: oneshot::Sender<()> },
}

/// Sending side of a tablet's action loop. Cheap to clone.
#[derive(Clone)]
pub struct TabletHandle {
    alias: TabletAlias,
    commands: mpsc::Sender<TabletCommand>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl TabletHandle {
    pub fn alias(&self) -> &TabletAlias {
        &self.alias
    }

    /// Whether the loop is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    pub async fn get_permissions(&self) -> TabletResult<PermissionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(TabletCommand::GetPermissions { reply }).await?;
        rx.await.map_err(|_| self.stopped())?
    }

    pub async fn ping(&self) -> TabletResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(TabletCommand::Ping { reply }).await?;
        rx.await.map_err(|_| self.stopped())
    }

    /// Ask the loop to exit after the commands already queued ahead of
    /// this one.
    pub async fn stop(&self) -> TabletResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(TabletCommand::Stop { reply }).await?;
        rx.await.map_err(|_| self.stopped())
    }

    /// Terminate the loop immediately, abandoning queued commands.
    pub fn kill(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn send(&self, command: TabletCommand) -> TabletResult<()> {
        self.commands.send(command).await.map_err(|_| self.stopped())
    }

    fn stopped(&self) -> TabletError {
        TabletError::Stopped(self.alias.to_string())
    }
}

/// Start the action loop for a tablet.
///
/// Returns the handle used to send commands and the task's join handle.
pub fn spawn_action_loop(
    alias: TabletAlias,
    daemon: Arc<dyn MysqlDaemon>,
) -> (TabletHandle, JoinHandle<()>) {
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let loop_alias = alias.clone();
    let task = tokio::spawn(async move {
        run_action_loop(loop_alias, daemon, commands_rx, shutdown_rx).await;
    });

    info!(%alias, "action loop started");
    let handle = TabletHandle {
        alias,
        commands: commands_tx,
        shutdown: Arc::new(shutdown_tx),
    };
    (handle, task)
}

async fn run_action_loop(
    alias: TabletAlias,
    daemon: Arc<dyn MysqlDaemon>,
    mut commands: mpsc::Receiver<TabletCommand>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                debug!(%alias, "action loop killed");
                break;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    debug!(%alias, "all handles dropped");
                    break;
                };
                match command {
                    TabletCommand::GetPermissions { reply } => {
                        let _ = reply.send(daemon.get_permissions());
                    }
                    TabletCommand::Ping { reply } => {
                        let _ = reply.send(());
                    }
                    TabletCommand::Stop { reply } => {
                        let _ = reply.send(());
                        break;
                    }
                }
            }
        }
    }
    info!(%alias, "action loop stopped");
}
