//! Event channel between the sensor/button drivers and the station
//!
//! Drivers publish [`StationEvent`]s into a [`StationChannel`]. The station
//! holds a [`StationSubscription`] while it is running; dropping the
//! subscription unregisters it from the channel.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Subscriber};

pub use crate::sensors::{ButtonEdge, StationEvent};

/// Queue depth. Set to 8 to absorb bursts from the sensor driver while the
/// station is busy writing to the LED strip.
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Number of subscribers that can listen to station events
/// - Subscriber 0: the station itself
/// - Subscriber 1: spare, e.g. a debug event logger
pub const EVENT_SUBSCRIBERS: usize = 2;

/// Ambient sensor, pressure sensor and button driver
pub const EVENT_PUBLISHERS: usize = 3;

pub type StationChannel = PubSubChannel<
    CriticalSectionRawMutex,
    StationEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;

pub type StationSubscription<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    StationEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
>;
