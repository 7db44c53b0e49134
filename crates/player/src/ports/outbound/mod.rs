//! Outbound ports - Interfaces for external services
//!
//! These ports define the contracts that infrastructure adapters must implement,
//! allowing the session engine and driver to run against a real socket or a mock.

pub mod clock_port;
pub mod transport_port;

pub use clock_port::ClockPort;
pub use transport_port::{
    ConnectionEpoch, TransportChannel, TransportConnector, TransportError, TransportEvent,
    TransportSink,
};

#[cfg(any(test, feature = "testing"))]
pub use clock_port::MockClockPort;
#[cfg(any(test, feature = "testing"))]
pub use transport_port::{MockTransportChannel, MockTransportConnector};
