// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Block thread runner.
//!
//! A [`Block`] reacts to one message at a time per direction;
//! [`spawn_block`] gives it a dedicated thread and FIFO channels in both
//! directions. Messages between two blocks are delivered in order. Shutdown
//! drains whatever is already queued, then releases the thread.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Receiver, Select, Sender};

use super::message::BlockMessage;

/// A pipeline stage: pure message-in, messages-out logic.
pub trait Block: Send + 'static {
    /// Block name, for logs and thread naming.
    fn name(&self) -> &str;

    /// Handle one message moving up; returns messages to forward up.
    fn on_upward(&mut self, msg: BlockMessage) -> Vec<BlockMessage>;

    /// Handle one message moving down; returns messages to forward down.
    fn on_downward(&mut self, msg: BlockMessage) -> Vec<BlockMessage>;
}

/// Channels of a running block.
pub struct BlockHandle {
    /// Feed messages moving up into the block.
    pub upward_tx: Sender<BlockMessage>,
    /// Messages the block forwarded up.
    pub upward_rx: Receiver<BlockMessage>,
    /// Feed messages moving down into the block.
    pub downward_tx: Sender<BlockMessage>,
    /// Messages the block forwarded down.
    pub downward_rx: Receiver<BlockMessage>,
    thread: Option<JoinHandle<()>>,
}

impl BlockHandle {
    /// Request shutdown and join the thread.
    ///
    /// Messages already queued ahead of the request are still processed.
    pub fn shutdown(mut self) {
        let _ = self.upward_tx.send(BlockMessage::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Run a block on its own thread.
pub fn spawn_block<B: Block>(mut block: B) -> BlockHandle {
    let (up_in_tx, up_in_rx) = unbounded::<BlockMessage>();
    let (up_out_tx, up_out_rx) = unbounded::<BlockMessage>();
    let (down_in_tx, down_in_rx) = unbounded::<BlockMessage>();
    let (down_out_tx, down_out_rx) = unbounded::<BlockMessage>();

    let name = block.name().to_owned();
    let thread_name = name.clone();
    let thread = thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            run_block(
                &mut block,
                &up_in_rx,
                &up_out_tx,
                &down_in_rx,
                &down_out_tx,
            );
            log::debug!("[{}] block thread released", name);
        })
        .expect("block thread spawn");

    BlockHandle {
        upward_tx: up_in_tx,
        upward_rx: up_out_rx,
        downward_tx: down_in_tx,
        downward_rx: down_out_rx,
        thread: Some(thread),
    }
}

fn run_block<B: Block>(
    block: &mut B,
    up_in: &Receiver<BlockMessage>,
    up_out: &Sender<BlockMessage>,
    down_in: &Receiver<BlockMessage>,
    down_out: &Sender<BlockMessage>,
) {
    let mut select = Select::new();
    let up_idx = select.recv(up_in);
    let down_idx = select.recv(down_in);
    let mut open = 2;

    while open > 0 {
        let op = select.select();
        let idx = op.index();
        let (upward, result) = if idx == up_idx {
            (true, op.recv(up_in))
        } else {
            (false, op.recv(down_in))
        };

        match result {
            Ok(BlockMessage::Shutdown) => {
                drain(block, up_in, up_out, down_in, down_out);
                return;
            }
            Ok(msg) => {
                let (outputs, tx) = if upward {
                    (block.on_upward(msg), up_out)
                } else {
                    (block.on_downward(msg), down_out)
                };
                for out in outputs {
                    let _ = tx.send(out);
                }
            }
            Err(_) => {
                select.remove(idx);
                open -= 1;
            }
        }
    }
}

/// Process everything already queued, then stop.
fn drain<B: Block>(
    block: &mut B,
    up_in: &Receiver<BlockMessage>,
    up_out: &Sender<BlockMessage>,
    down_in: &Receiver<BlockMessage>,
    down_out: &Sender<BlockMessage>,
) {
    while let Ok(msg) = up_in.try_recv() {
        if matches!(msg, BlockMessage::Shutdown) {
            continue;
        }
        for out in block.on_upward(msg) {
            let _ = up_out.send(out);
        }
    }
    while let Ok(msg) = down_in.try_recv() {
        if matches!(msg, BlockMessage::Shutdown) {
            continue;
        }
        for out in block.on_downward(msg) {
            let _ = down_out.send(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    /// Forwards frames unchanged and counts superframes.
    struct CountingBlock {
        sof_seen: u32,
    }

    impl Block for CountingBlock {
        fn name(&self) -> &str {
            "counting"
        }

        fn on_upward(&mut self, msg: BlockMessage) -> Vec<BlockMessage> {
            match msg {
                BlockMessage::Sof(sf) => {
                    self.sof_seen += 1;
                    vec![BlockMessage::Sof(sf)]
                }
                other => vec![other],
            }
        }

        fn on_downward(&mut self, msg: BlockMessage) -> Vec<BlockMessage> {
            vec![msg]
        }
    }

    #[test]
    fn test_messages_forwarded_in_order() {
        let handle = spawn_block(CountingBlock { sof_seen: 0 });
        for sf in 0..5 {
            handle.upward_tx.send(BlockMessage::Sof(sf)).unwrap();
        }
        for sf in 0..5 {
            let msg = handle.upward_rx.recv_timeout(Duration::from_secs(1)).unwrap();
            assert_eq!(msg, BlockMessage::Sof(sf));
        }
        handle.shutdown();
    }

    #[test]
    fn test_both_directions_independent() {
        let handle = spawn_block(CountingBlock { sof_seen: 0 });
        handle
            .downward_tx
            .send(BlockMessage::Encap {
                tal_id: 1,
                qos: 0,
                payload: vec![1],
            })
            .unwrap();
        handle.upward_tx.send(BlockMessage::Sof(9)).unwrap();

        assert!(matches!(
            handle.downward_rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            BlockMessage::Encap { tal_id: 1, .. }
        ));
        assert_eq!(
            handle.upward_rx.recv_timeout(Duration::from_secs(1)).unwrap(),
            BlockMessage::Sof(9)
        );
        handle.shutdown();
    }

    #[test]
    fn test_shutdown_drains_queued_messages() {
        let handle = spawn_block(CountingBlock { sof_seen: 0 });
        for sf in 0..10 {
            handle.upward_tx.send(BlockMessage::Sof(sf)).unwrap();
        }
        let rx = handle.upward_rx.clone();
        handle.shutdown();
        // everything queued before the shutdown request was processed
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 10);
    }
}
