//! Infrastructure layer for the client library.
//!
//! Contains the OS-facing adapters: the TCP transport, configuration file
//! handling, and the logging bootstrap.
//!
//! **Dependency rule**: this layer may depend on `msgbridge_core`, but MUST
//! NOT import the `application` layer.
//!
//! # Sub-modules
//!
//! - **`socket`** – Blocking TCP client socket behind the `Transport` trait,
//!   plus helpers that read and write whole length-prefixed frames.
//!
//! - **`config`** – `ClientConfig` loaded from and saved to a TOML file.
//!
//! - **`logging`** – Installs a `tracing` subscriber for hosts that do not
//!   bring their own.

pub mod config;
pub mod logging;
pub mod socket;
