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

//! The pluggable wire codec and its default JSON implementation.
//!
//! # Wire Format (JSON codec, Protocol v1)
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Frame Length (4 bytes, big-endian u32, covers version+payload)│
//! ├───────────────────────────────────────────────────────────────┤
//! │ Protocol Version (1 byte, currently 0x01)                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Payload (JSON-encoded frame, remaining bytes)                 │
//! └───────────────────────────────────────────────────────────────┘
//! ```

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{trace, warn};

use crate::remote::wire::WIRE_VERSION;
use crate::remote::{WireError, WireFrame, WireInfo, WireType, WireValue};

/// A wire codec plugged into the bus.
///
/// Implementations own framing, value encoding, and stream reading; the
/// bus stays codec-agnostic and picks a handler by scheme through the
/// [`ProtocolRegistry`].
#[async_trait]
pub trait NetworkProtocol: Send + Sync + Debug {
    /// The scheme this codec answers to, e.g. in peer addresses.
    fn scheme(&self) -> &'static str;

    /// The default port peers speaking this codec listen on.
    fn port(&self) -> u16;

    /// Encodes one frame carrying `info`, addressed to `recipient`.
    fn serialize(&self, id: u64, info: &WireInfo, recipient: &str) -> Result<Vec<u8>, WireError>;

    /// Reads the next frame off `channel`.
    ///
    /// `Ok(None)` means the stream ended cleanly or carried traffic this
    /// codec chooses to skip; `Err` is reserved for channel failures.
    async fn read(
        &self,
        channel: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<Option<WireFrame>, WireError>;

    /// Encodes a primitive value.
    fn encode(&self, value: &WireValue) -> Result<Vec<u8>, WireError>;

    /// Decodes a primitive value of the given kind.
    fn decode(&self, wire_type: WireType, bytes: &[u8]) -> Result<WireValue, WireError>;
}

/// The built-in length-prefixed JSON codec.
#[derive(Debug, Clone)]
pub struct JsonBusProtocol {
    max_frame_len: u32,
}

impl JsonBusProtocol {
    /// The scheme the JSON codec registers under.
    pub const SCHEME: &'static str = "lattice";
    /// The default listening port.
    pub const PORT: u16 = 4920;

    /// A codec refusing frames longer than `max_frame_len` bytes.
    pub fn new(max_frame_len: u32) -> Self {
        JsonBusProtocol { max_frame_len }
    }
}

#[async_trait]
impl NetworkProtocol for JsonBusProtocol {
    fn scheme(&self) -> &'static str {
        Self::SCHEME
    }

    fn port(&self) -> u16 {
        Self::PORT
    }

    fn serialize(&self, id: u64, info: &WireInfo, recipient: &str) -> Result<Vec<u8>, WireError> {
        let frame = WireFrame {
            id,
            recipient: recipient.to_string(),
            info: info.clone(),
        };
        let payload = serde_json::to_vec(&frame)?;
        let length: u32 = (payload.len() + 1)
            .try_into()
            .map_err(|_| WireError::Serialization("frame too large for u32 length".into()))?;
        let mut bytes = Vec::with_capacity(payload.len() + 5);
        bytes.extend_from_slice(&length.to_be_bytes());
        bytes.push(WIRE_VERSION);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    async fn read(
        &self,
        channel: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<Option<WireFrame>, WireError> {
        let mut length_bytes = [0u8; 4];
        match channel.read_exact(&mut length_bytes).await {
            Ok(_) => {}
            // A clean close between frames is the normal end of a stream.
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let length = u32::from_be_bytes(length_bytes);
        if length == 0 || length > self.max_frame_len {
            warn!(length, max = self.max_frame_len, "implausible frame length, dropping stream");
            return Ok(None);
        }

        let mut body = vec![0u8; length as usize];
        channel.read_exact(&mut body).await?;
        let (version, payload) = (body[0], &body[1..]);
        if version != WIRE_VERSION {
            warn!(version, expected = WIRE_VERSION, "unsupported wire version, dropping stream");
            return Ok(None);
        }
        match serde_json::from_slice::<WireFrame>(payload) {
            Ok(frame) => {
                trace!(id = frame.id, recipient = %frame.recipient, "frame decoded");
                Ok(Some(frame))
            }
            Err(e) => {
                warn!(error = %e, "malformed frame payload, dropping stream");
                Ok(None)
            }
        }
    }

    fn encode(&self, value: &WireValue) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, wire_type: WireType, bytes: &[u8]) -> Result<WireValue, WireError> {
        let value: WireValue = serde_json::from_slice(bytes)?;
        if value.wire_type() != wire_type {
            return Err(WireError::Serialization(format!(
                "expected {wire_type:?} value, decoded {:?}",
                value.wire_type()
            )));
        }
        Ok(value)
    }
}

/// The codecs installed on a runtime, keyed by scheme.
#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    handlers: Arc<DashMap<&'static str, Arc<dyn NetworkProtocol>>>,
}

impl ProtocolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` under its scheme, replacing any previous codec
    /// for that scheme.
    pub fn register(&self, handler: Arc<dyn NetworkProtocol>) {
        self.handlers.insert(handler.scheme(), handler);
    }

    /// The codec registered for `scheme`.
    pub fn handler_for(&self, scheme: &str) -> Result<Arc<dyn NetworkProtocol>, WireError> {
        self.handlers
            .get(scheme)
            .map(|h| h.value().clone())
            .ok_or_else(|| WireError::HandlerUnavailable(scheme.to_string()))
    }

    /// The installed schemes.
    pub fn schemes(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| *h.key()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn codec() -> JsonBusProtocol {
        JsonBusProtocol::new(1024)
    }

    fn sample_info() -> WireInfo {
        WireInfo {
            sender: "alpha".to_string(),
            state: "submitted".to_string(),
            urgent: true,
        }
    }

    #[tokio::test]
    async fn frames_survive_a_round_trip() {
        let bytes = codec()
            .serialize(7, &sample_info(), "/root/worker")
            .unwrap();
        let mut reader = Cursor::new(bytes);
        let frame = codec().read(&mut reader).await.unwrap().unwrap();
        assert_eq!(frame.id, 7);
        assert_eq!(frame.recipient, "/root/worker");
        assert_eq!(frame.info, sample_info());
    }

    #[tokio::test]
    async fn clean_eof_yields_no_frame() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        assert!(codec().read(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_length_drops_the_stream() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(u32::MAX).to_be_bytes());
        bytes.push(WIRE_VERSION);
        let mut reader = Cursor::new(bytes);
        assert!(codec().read(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_version_drops_the_stream() {
        let mut bytes = codec().serialize(1, &sample_info(), "/x").unwrap();
        bytes[4] = 0x7F;
        let mut reader = Cursor::new(bytes);
        assert!(codec().read(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_payload_drops_the_stream() {
        let payload = b"not json at all";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&((payload.len() as u32) + 1).to_be_bytes());
        bytes.push(WIRE_VERSION);
        bytes.extend_from_slice(payload);
        let mut reader = Cursor::new(bytes);
        assert!(codec().read(&mut reader).await.unwrap().is_none());
    }

    #[test]
    fn values_round_trip_through_encode_decode() {
        let codec = codec();
        for value in [
            WireValue::Bool(true),
            WireValue::Integer(-40),
            WireValue::Float(2.5),
            WireValue::Text("edge".to_string()),
            WireValue::Bytes(vec![0, 1, 2]),
        ] {
            let bytes = codec.encode(&value).unwrap();
            let decoded = codec.decode(value.wire_type(), &bytes).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn decode_rejects_a_type_mismatch() {
        let codec = codec();
        let bytes = codec.encode(&WireValue::Integer(9)).unwrap();
        assert!(codec.decode(WireType::Text, &bytes).is_err());
    }

    #[test]
    fn registry_resolves_by_scheme() {
        let registry = ProtocolRegistry::new();
        registry.register(Arc::new(codec()));
        let handler = registry.handler_for(JsonBusProtocol::SCHEME).unwrap();
        assert_eq!(handler.port(), JsonBusProtocol::PORT);
        assert!(matches!(
            registry.handler_for("carrier-pigeon"),
            Err(WireError::HandlerUnavailable(_))
        ));
        assert_eq!(registry.schemes(), vec![JsonBusProtocol::SCHEME]);
    }
}
