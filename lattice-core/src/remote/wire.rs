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
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::Request;

/// Wire protocol version; bumped on incompatible frame changes.
pub const WIRE_VERSION: u8 = 0x01;

/// Errors raised while encoding, decoding, or reading wire traffic.
#[derive(Debug)]
pub enum WireError {
    /// The underlying channel failed.
    Io(std::io::Error),
    /// A value could not be serialized or deserialized.
    Serialization(String),
    /// No protocol handler is installed for the requested scheme.
    HandlerUnavailable(String),
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WireError::Io(e) => write!(f, "wire channel failure: {e}"),
            WireError::Serialization(msg) => write!(f, "wire serialization failure: {msg}"),
            WireError::HandlerUnavailable(scheme) => {
                write!(f, "no protocol handler for scheme {scheme:?}")
            }
        }
    }
}

impl std::error::Error for WireError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WireError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WireError {
    fn from(e: std::io::Error) -> Self {
        WireError::Io(e)
    }
}

impl From<serde_json::Error> for WireError {
    fn from(e: serde_json::Error) -> Self {
        WireError::Serialization(e.to_string())
    }
}

/// The portable portion of a request: who sent it, how far along it is,
/// and whether it is urgent. Failure causes stay on the originating
/// runtime; only the state's name crosses the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireInfo {
    /// Wire address of the request's origin.
    pub sender: String,
    /// Name of the request's lifecycle state.
    pub state: String,
    /// Priority flag.
    pub urgent: bool,
}

impl WireInfo {
    /// Captures the portable view of `request`, addressing its origin by
    /// the sender's identifier.
    pub fn of_request(request: &Request) -> Self {
        WireInfo {
            sender: request.sender().id().to_string(),
            state: request.state().to_string(),
            urgent: request.urgent(),
        }
    }
}

/// One decoded unit of wire traffic: a request's portable info plus the
/// address it should be delivered to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireFrame {
    /// Per-connection sequence number assigned by the sending side.
    pub id: u64,
    /// Wire address of the intended recipient.
    pub recipient: String,
    /// The request's portable state.
    pub info: WireInfo,
}

/// Primitive value kinds a protocol must be able to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    Bool,
    Integer,
    Float,
    Text,
    Bytes,
}

/// A primitive value tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl WireValue {
    /// The kind tag for this value.
    pub fn wire_type(&self) -> WireType {
        match self {
            WireValue::Bool(_) => WireType::Bool,
            WireValue::Integer(_) => WireType::Integer,
            WireValue::Float(_) => WireType::Float,
            WireValue::Text(_) => WireType::Text,
            WireValue::Bytes(_) => WireType::Bytes,
        }
    }
}
