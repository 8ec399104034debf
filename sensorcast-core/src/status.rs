//! Link status announcements
//!
//! Subscribers want to know whether a silent topic means "nothing changed"
//! or "the device is broken". The reporter publishes a small numeric status
//! on a dedicated topic whenever it changes:
//!
//! | value | meaning                                  |
//! |-------|------------------------------------------|
//! | `0`   | offline (also the broker's last will)    |
//! | `1`   | connected, sensor reads failing          |
//! | `2`   | connected, sensor healthy                |
//!
//! The remembered status only advances once the announcement was accepted by
//! the transport, so a failed publish is simply retried on the next tick.

use crate::config::{topic_from, Topic};
use crate::errors::ConfigResult;
use crate::transport::Transport;

/// Status published on the `connected` topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkStatus {
    /// No session with the broker
    Offline = 0,
    /// Connected but the last sensor read failed
    SensorFault = 1,
    /// Connected and the last sensor read succeeded
    Healthy = 2,
}

impl LinkStatus {
    /// Wire representation
    pub const fn as_payload(self) -> &'static str {
        match self {
            LinkStatus::Offline => "0",
            LinkStatus::SensorFault => "1",
            LinkStatus::Healthy => "2",
        }
    }
}

/// Tracks and announces [`LinkStatus`] changes
#[derive(Debug, Clone)]
pub struct StatusReporter {
    topic: Topic,
    retained: bool,
    last: LinkStatus,
}

impl StatusReporter {
    /// Reporter publishing on `topic`; starts out `Offline`
    pub fn new(topic: &str, retained: bool) -> ConfigResult<Self> {
        Ok(Self {
            topic: topic_from(topic)?,
            retained,
            last: LinkStatus::Offline,
        })
    }

    /// Forget the announced status if the transport lost its session
    pub fn observe_connectivity<T: Transport + ?Sized>(&mut self, transport: &T) {
        if !transport.is_connected() {
            self.last = LinkStatus::Offline;
        }
    }

    /// Announce the status implied by the latest sensor read.
    ///
    /// Returns the new status when an announcement was accepted.
    pub fn report<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        sensor_ok: bool,
    ) -> Option<LinkStatus> {
        let next = if sensor_ok {
            LinkStatus::Healthy
        } else {
            LinkStatus::SensorFault
        };

        if next == self.last || !transport.is_connected() {
            return None;
        }

        match transport.publish(&self.topic, next.as_payload(), self.retained) {
            Ok(()) => {
                log_info!(
                    "set {} from {} to {}",
                    self.topic,
                    self.last as u8,
                    next as u8
                );
                self.last = next;
                Some(next)
            }
            Err(_e) => {
                log_debug!("{}: status publish failed: {:?}", self.topic, _e);
                None
            }
        }
    }

    /// Last status accepted by the transport
    pub fn current(&self) -> LinkStatus {
        self.last
    }

    /// Whether a status light should be lit (anything but healthy)
    pub fn indicator_on(&self) -> bool {
        self.last != LinkStatus::Healthy
    }

    /// Topic announcements go to
    pub fn topic(&self) -> &str {
        &self.topic
    }
}
