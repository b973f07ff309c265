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

//! Shared aliases, configuration, the service registry, address resolution,
//! and the bus entry points.

pub use bus::Bus;
pub use bus_runtime::BusRuntime;
pub use config::BusConfig;
pub use resolver::ResolverContext;
pub use service_registry::{ServiceError, ServiceRegistry};
pub use types::{ObserverRef, Problem, RecipientRef, SenderRef};

pub(crate) use config::CONFIG;
pub(crate) use types::RequestWork;

mod bus;
mod bus_runtime;
mod config;
mod resolver;
mod service_registry;
mod types;
