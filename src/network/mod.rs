pub mod dispatcher;
pub mod listener;
pub mod loopback;
pub mod message;
pub mod transport;

pub use dispatcher::RequestHandler;
pub use listener::{bind, serve, ServeOptions};
pub use loopback::{LoopbackNetwork, LoopbackTransport};
pub use message::{
    AddressBody, AgentRequest, ChatBody, FileTransferBody, NodeAddress, ResultBody, ResultStatus,
    TrackerRequest,
};
pub use transport::{TcpTransport, Transport};
