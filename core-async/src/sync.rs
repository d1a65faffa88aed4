//! Synchronization primitives.
//!
//! The scheduler serialises all of its work through one task; the types here
//! are what feed that task (`mpsc`), answer callers (`oneshot`), publish
//! snapshots (`watch`) and fan out events (`broadcast`).
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{mpsc, oneshot};
//!
//! async fn example() {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<oneshot::Sender<u32>>();
//!     let (reply_tx, reply_rx) = oneshot::channel();
//!     tx.send(reply_tx).unwrap();
//!     rx.recv().await.unwrap().send(7).unwrap();
//!     assert_eq!(reply_rx.await.unwrap(), 7);
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};
