//! Per-quantity publisher collection
//!
//! A device reports a handful of independent quantities. Each one gets its
//! own [`ThrottledPublisher`] with its own filter, counter and topic; the
//! [`PublisherSet`] keeps them keyed by [`Quantity`] without any global
//! state.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::publisher::ThrottledPublisher;
use crate::transport::Transport;

/// Number of [`Quantity`] variants
pub const QUANTITY_COUNT: usize = 3;

/// Quantities a reporting agent knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Quantity {
    /// Air temperature, °C
    Temperature,
    /// Relative humidity, %
    Humidity,
    /// Received signal strength of the uplink, dBm
    Rssi,
}

impl Quantity {
    /// Every quantity, in reporting order
    pub const ALL: [Quantity; QUANTITY_COUNT] =
        [Quantity::Temperature, Quantity::Humidity, Quantity::Rssi];

    /// Topic suffix under the status prefix
    pub const fn topic_suffix(self) -> &'static str {
        match self {
            Quantity::Temperature => "temp",
            Quantity::Humidity => "hum",
            Quantity::Rssi => "rssi",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.topic_suffix())
    }
}

/// Independently configured publishers keyed by quantity
pub struct PublisherSet<T> {
    publishers: heapless::LinearMap<Quantity, ThrottledPublisher<T>, QUANTITY_COUNT>,
}

impl<T: Transport> Default for PublisherSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> PublisherSet<T> {
    /// Empty set
    pub fn new() -> Self {
        Self {
            publishers: heapless::LinearMap::new(),
        }
    }

    /// Register the publisher for `quantity`, returning the one it replaces
    pub fn insert(
        &mut self,
        quantity: Quantity,
        publisher: ThrottledPublisher<T>,
    ) -> Option<ThrottledPublisher<T>> {
        // Capacity equals the number of distinct keys, so insert cannot overflow.
        self.publishers.insert(quantity, publisher).unwrap_or(None)
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, quantity: Quantity, publisher: ThrottledPublisher<T>) -> Self {
        self.insert(quantity, publisher);
        self
    }

    /// Feed a measurement to the publisher for `quantity`.
    ///
    /// Returns the new estimate, or `None` if the quantity is not reported.
    pub fn add_measurement(&mut self, quantity: Quantity, raw: f32) -> Option<f32> {
        self.publishers
            .get_mut(&quantity)
            .map(|publisher| publisher.add_measurement(raw))
    }

    /// Restart every publisher
    pub fn restart_all(&mut self) {
        for (_, publisher) in self.publishers.iter_mut() {
            publisher.restart();
        }
    }

    /// Publisher for `quantity`
    pub fn get(&self, quantity: Quantity) -> Option<&ThrottledPublisher<T>> {
        self.publishers.get(&quantity)
    }

    /// Mutable publisher for `quantity`
    pub fn get_mut(&mut self, quantity: Quantity) -> Option<&mut ThrottledPublisher<T>> {
        self.publishers.get_mut(&quantity)
    }

    /// Whether `quantity` is reported
    pub fn contains(&self, quantity: Quantity) -> bool {
        self.publishers.contains_key(&quantity)
    }

    /// Number of registered publishers
    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }

    /// Iterate over registered publishers
    pub fn iter(&self) -> impl Iterator<Item = (&Quantity, &ThrottledPublisher<T>)> {
        self.publishers.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterConstants, PublisherConfig};
    use crate::testing::RecordingTransport;

    fn make<'a>(
        transport: &'a RecordingTransport,
        quantity: Quantity,
        n: u32,
    ) -> ThrottledPublisher<&'a RecordingTransport> {
        let topic = format!("dev/status/{}", quantity);
        let config = PublisherConfig::new(&topic, 1.0, n).unwrap();
        ThrottledPublisher::new(transport, config, FilterConstants::default()).unwrap()
    }

    #[test]
    fn routes_by_quantity() {
        let transport = RecordingTransport::connected();
        let mut set = PublisherSet::new()
            .with(Quantity::Temperature, make(&transport, Quantity::Temperature, 1))
            .with(Quantity::Humidity, make(&transport, Quantity::Humidity, 2));

        assert!(set.add_measurement(Quantity::Temperature, 20.0).is_some());
        assert!(set.add_measurement(Quantity::Humidity, 50.0).is_some());
        assert_eq!(set.add_measurement(Quantity::Rssi, -70.0), None);

        let sent = transport.published();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].topic, "dev/status/temp");
        assert_eq!(set.get(Quantity::Humidity).unwrap().current_count(), 1);
    }

    #[test]
    fn channels_are_independent() {
        let transport = RecordingTransport::connected();
        let mut set = PublisherSet::new()
            .with(Quantity::Temperature, make(&transport, Quantity::Temperature, 10))
            .with(Quantity::Humidity, make(&transport, Quantity::Humidity, 10));

        for _ in 0..5 {
            set.add_measurement(Quantity::Temperature, 20.0);
        }
        assert_eq!(set.get(Quantity::Humidity).unwrap().estimate(), 0.0);
        assert_eq!(set.get(Quantity::Humidity).unwrap().current_count(), 0);
    }

    #[test]
    fn restart_all_clears_counters() {
        let transport = RecordingTransport::connected();
        let mut set = PublisherSet::new();
        for q in Quantity::ALL {
            set.insert(q, make(&transport, q, 5));
            set.add_measurement(q, 1.0);
        }
        assert_eq!(set.len(), 3);

        set.restart_all();
        for (_, p) in set.iter() {
            assert_eq!(p.current_count(), 0);
            assert_eq!(p.estimator().error_estimate(), 1000.0);
        }
    }

    #[test]
    fn replacing_returns_previous() {
        let transport = RecordingTransport::connected();
        let mut set = PublisherSet::new();
        assert!(set.insert(Quantity::Rssi, make(&transport, Quantity::Rssi, 1)).is_none());
        assert!(set.insert(Quantity::Rssi, make(&transport, Quantity::Rssi, 2)).is_some());
        assert_eq!(set.len(), 1);
    }
}
