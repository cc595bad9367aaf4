//! Shared test fixtures

pub mod mock_synth;
pub mod mock_transport;

pub use mock_synth::MockSynth;
pub use mock_transport::MockTransport;
