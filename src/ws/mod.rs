pub mod connection;
pub mod protocol;
pub mod transport;

pub use connection::{CommandHandle, ConnectionManager, ConnectionState};
pub use protocol::{ClientRequest, DataType, Envelope, InboundMessage, Payload};
pub use transport::{Channel, Connector, WsConnector};
