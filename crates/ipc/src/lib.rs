//! Adaptor-side IPC for the sticky render session.
//!
//! The adaptor queues [`Action`](nuke_openjd_types::Action)s for the in-Nuke
//! client and hosts a loopback HTTP server the client polls to fetch them,
//! along with the path-mapping rules for the session.

mod queue;
mod server;

pub use queue::ActionsQueue;
pub use server::{AdaptorServer, RunningAdaptorServer, SOCKET_PATH_ENV};
