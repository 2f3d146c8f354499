//! airbridge-services: the relay core: send chunking, receive
//! reassembly, peer filtering and the scheduling pass that drives them.
//! Sockets and tty devices stay in the daemon behind the traits in `link`.

pub mod chunk_types;
pub mod chunker;
pub mod indicator;
pub mod link;
pub mod peer;
pub mod reassembler;
pub mod receive;
pub mod relay;
pub mod stats;

pub use chunk_types::{CompletedBurst, FlushTrigger, OutgoingDatagram};
pub use chunker::SendChunker;
pub use indicator::{ActivityEvent, ActivityIndicator, IndicatorOutput, IndicatorPolicy, LogIndicator};
pub use link::{LinkError, SerialEndpoint, SerialError, TransportLink};
pub use peer::{PeerFilter, Rejection};
pub use reassembler::{Appended, ReceiveReassembler, SharedReassembler};
pub use receive::{Delivery, ReceivePath};
pub use relay::{PassSummary, Relay};
pub use stats::{RelayStats, SourceStats, StatsSnapshot};
