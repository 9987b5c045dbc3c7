// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Block runtime: one thread per block, message passing between them.
//!
//! An emulated node is a pipeline of blocks (IP-QoS, encap, DVB MAC,
//! sat-carrier...); each block runs single-threaded over two FIFO channels,
//! one per direction. Within a block there is no parallelism; between
//! blocks, parallelism is pipeline-level. A block suspends only while
//! waiting on its channels; it never blocks while holding a FIFO mutex.
//!
//! ```text
//!        upward                      upward
//!   +--------------+  messages  +--------------+
//!   |  BlockEncap  | <--------- |   BlockDvb   | <--- ...
//!   |              | ---------> |              | ---> ...
//!   +--------------+  messages  +--------------+
//!        downward                    downward
//! ```

mod block;
mod message;

pub use block::{spawn_block, Block, BlockHandle};
pub use message::{BlockMessage, MessageKind, UpwardQueue};
