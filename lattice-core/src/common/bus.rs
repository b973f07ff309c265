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
use crate::common::{BusConfig, BusRuntime, CONFIG};

/// Entry point for the message bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bus;

impl Bus {
    /// Launches a runtime with configuration loaded from the environment.
    pub fn launch() -> anyhow::Result<BusRuntime> {
        Self::launch_with(CONFIG.clone())
    }

    /// Launches a runtime with an explicit configuration.
    pub fn launch_with(config: BusConfig) -> anyhow::Result<BusRuntime> {
        BusRuntime::launch(config)
    }
}
