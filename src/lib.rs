//! # armctl
//!
//! `armctl` issues create/update requests against a cloud management plane and
//! resolves their final state, following the long-running operation (LRO)
//! protocol when the service answers asynchronously.
//!
//! Commands are described by a data-driven table ([`commands`]): each entry
//! declares its arguments, URL template, api-version, body builder and
//! response schema. A validated [`invocation::Invocation`] flows through
//! [`client::ArmClient`], which builds the request, submits it through a
//! [`transport::Transport`] and awaits completion with [`lro::submit_and_await`].
//!
//! ## Feature Flags
//!
//! * `vmware`: Private cloud workload network commands (DNS services, DNS zones).
//! * `containerapp`: Container app create command.
//! * `compose`: Translation of compose service descriptors into container app invocations.
pub mod auth;
pub mod client;
pub mod cmd;
pub mod commands;
#[cfg(feature = "compose")]
pub mod compose;
pub mod config;
pub mod error;
pub mod invocation;
pub mod logging;
pub mod lro;
pub mod request;
pub mod schema;
pub mod transport;
