/// Review store access
///
/// - Wire records and lenient decoding (wire.rs)
/// - The HTTP transport seam (transport.rs)
/// - The client the UI talks to (client.rs)

pub mod wire;
pub mod transport;
pub mod client;

pub use client::{NearReviews, NearSource, ReviewClient};
pub use transport::{HttpTransport, ReviewTransport};
