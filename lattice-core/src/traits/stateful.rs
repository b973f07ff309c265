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
use crate::node::NodeState;

/// An entity whose lifecycle is advanced by the
/// [`TransitionEngine`](crate::node::TransitionEngine).
///
/// Implementors are cheap handles; the engine clones them into transition
/// effects, so shared state must live behind the handle.
pub trait Stateful: Clone + Send + Sync + 'static {
    /// The entity's current lifecycle state.
    fn state(&self) -> NodeState;

    /// Commits a new lifecycle state. Called by the engine after a
    /// transition's effect has completed.
    fn set_state(&self, state: NodeState);
}
