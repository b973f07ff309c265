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
use lattice::prelude::*;

/// Bare poke used wherever the payload content does not matter.
#[bus_payload]
pub struct Ping;

/// Carries a number so tests can check which delivery arrived.
#[bus_payload]
pub struct Tally(pub u32);

/// Wire-enabled payload used by serialization tests.
#[bus_payload(wire)]
pub struct Reading {
    pub value: f64,
    pub label: String,
}
