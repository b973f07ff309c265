/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

#![forbid(unsafe_code)]

//! # Lattice
//!
//! This crate provides an in-process asynchronous message bus, built on top
//! of Tokio. It establishes ordered, non-reentrant message dispatch with
//! clear separation of concerns for addressing, tracking asynchronous work,
//! and node lifecycle.
//!
//! ## Key Concepts
//!
//! - **Queue (`MessageQueue`)**: The dispatch engine. Messages are delivered
//!   one at a time, so nothing a recipient observes happens concurrently
//!   with its own delivery.
//! - **Messages**: Type-erased payloads addressed from a `Sender` to any
//!   number of `Recipient`s; payloads are defined with the [`bus_payload`]
//!   attribute.
//! - **Requests (`Request`)**: Trackable units of asynchronous work with a
//!   terminal outcome, composable with AND (`ParallelMultiRequest`) and
//!   THEN (`SerialMultiRequest`) semantics.
//! - **Nodes & Hubs (`BusNode`, `BusHub`)**: Participants assembled into a
//!   tree; hubs host members under declared mount points, with attachment
//!   and detachment driven by a transition engine.
//! - **Runtime (`BusRuntime`)**: Manages the overall system, including the
//!   queue, the root hub, wire codecs, and shutdown.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lattice::prelude::*;
//!
//! #[bus_payload]
//! struct Greeting {
//!     content: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Bus::launch()?;
//!     let hub = runtime.root();
//!     hub.declare_mount("greeter");
//!
//!     let node = runtime.new_node("greeter")?;
//!     let attached = hub.add("greeter", &node)?;
//!     assert!(attached.outcome().await.is_successful());
//!
//!     runtime.shutdown_all().await;
//!     Ok(())
//! }
//! ```

/// A prelude module for conveniently importing the most commonly used items.
///
/// This module re-exports essential types, traits, and macros from the
/// lattice framework and dependencies like `acton-ern` and `async-trait`,
/// simplifying the import process for users.
pub mod prelude {
    // Macros from lattice-macro
    pub use lattice_macro::*;

    // Everything public from the core crate, including the acton-ern and
    // async-trait re-exports.
    pub use lattice_core::prelude::*;
}
