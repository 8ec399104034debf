//! Transport abstraction
//!
//! The core never talks to a network itself. Everything it sends goes through
//! a [`Transport`], supplied by the caller at construction time: an MQTT
//! client on a real device, a [`RecordingTransport`](crate::testing::RecordingTransport)
//! in tests.
//!
//! Methods take `&self` so one transport can be shared by reference between
//! all publishers of a device. Implementations that need mutable state use
//! interior mutability.

use core::fmt::Write;

/// Capacity of a rendered payload in bytes
pub const PAYLOAD_CAPACITY: usize = 48;

/// Fixed-capacity payload string
pub type Payload = heapless::String<PAYLOAD_CAPACITY>;

/// Delivers named values to a remote endpoint
pub trait Transport {
    /// Failure reported by [`Transport::publish`]
    type Error: core::fmt::Debug;

    /// Hand one message to the transport.
    ///
    /// Returning `Ok` means the message was accepted, not that the remote
    /// side received it.
    fn publish(&self, topic: &str, payload: &str, retained: bool) -> Result<(), Self::Error>;

    /// Whether the transport currently has a session with its endpoint
    fn is_connected(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for &T {
    type Error = T::Error;

    fn publish(&self, topic: &str, payload: &str, retained: bool) -> Result<(), Self::Error> {
        (**self).publish(topic, payload, retained)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

#[cfg(feature = "std")]
impl<T: Transport + ?Sized> Transport for std::rc::Rc<T> {
    type Error = T::Error;

    fn publish(&self, topic: &str, payload: &str, retained: bool) -> Result<(), Self::Error> {
        (**self).publish(topic, payload, retained)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

#[cfg(feature = "std")]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    type Error = T::Error;

    fn publish(&self, topic: &str, payload: &str, retained: bool) -> Result<(), Self::Error> {
        (**self).publish(topic, payload, retained)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Render `value` with `precision` decimals.
///
/// Returns `None` if the text does not fit [`PAYLOAD_CAPACITY`].
pub fn format_value(value: f32, precision: u8) -> Option<Payload> {
    let mut payload = Payload::new();
    write!(payload, "{:.*}", precision as usize, value).ok()?;
    Some(payload)
}
