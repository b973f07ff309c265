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
use std::any::Any;
use std::sync::Arc;

use crate::common::{ServiceError, ServiceRegistry};

/// Lets a component advertise and vend typed capabilities without static
/// binding.
///
/// Capabilities are keyed by their Rust type plus a disambiguating string
/// key. A failed lookup is a typed "not available" condition the caller can
/// handle, never a crash.
pub trait ServiceProvider {
    /// The registry backing this provider.
    fn service_registry(&self) -> &ServiceRegistry;

    /// Advertises a capability under a disambiguating key.
    fn provides<S>(&self, key: impl Into<String>, service: Arc<S>)
    where
        S: Any + Send + Sync,
    {
        self.service_registry().insert(key.into(), service);
    }

    /// Looks up a previously advertised capability.
    fn service<S>(&self, key: &str) -> Result<Arc<S>, ServiceError>
    where
        S: Any + Send + Sync,
    {
        self.service_registry().lookup::<S>(key)
    }
}
