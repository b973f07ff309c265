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
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

/// A requested capability was not offered by the provider or any of its
/// ancestors.
#[derive(Debug)]
pub struct ServiceError {
    /// Type name of the missing capability.
    pub capability: &'static str,
    /// The key the lookup used.
    pub key: String,
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "service {} with key {:?} is not available",
            self.capability, self.key
        )
    }
}

impl std::error::Error for ServiceError {}

/// Keyed capability storage behind every
/// [`ServiceProvider`](crate::traits::ServiceProvider).
///
/// Entries are keyed by capability type and name together, so two services
/// of the same type can coexist under different keys. A registry may chain
/// to a parent; lookups that miss locally fall through to it.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    entries: Arc<DashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>>,
    parent: Option<Arc<ServiceRegistry>>,
}

impl ServiceRegistry {
    /// A registry with no parent.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry whose missed lookups fall through to `parent`.
    pub fn chained(parent: &ServiceRegistry) -> Self {
        ServiceRegistry {
            entries: Arc::new(DashMap::new()),
            parent: Some(Arc::new(parent.clone())),
        }
    }

    /// Offers `service` under `key`, replacing any previous offer for the
    /// same type and key.
    pub fn insert<S: Any + Send + Sync>(&self, key: impl Into<String>, service: Arc<S>) {
        self.entries
            .insert((TypeId::of::<S>(), key.into()), service);
    }

    /// Looks up a capability, consulting the parent chain on a local miss.
    pub fn lookup<S: Any + Send + Sync>(&self, key: &str) -> Result<Arc<S>, ServiceError> {
        let local = self
            .entries
            .get(&(TypeId::of::<S>(), key.to_string()))
            .and_then(|entry| entry.value().clone().downcast::<S>().ok());
        match local {
            Some(service) => Ok(service),
            None => match &self.parent {
                Some(parent) => parent.lookup::<S>(key),
                None => Err(ServiceError {
                    capability: std::any::type_name::<S>(),
                    key: key.to_string(),
                }),
            },
        }
    }
}
