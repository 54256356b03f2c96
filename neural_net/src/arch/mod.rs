pub mod activations;
mod init;
pub mod layers;
pub mod loss;
mod model;
mod network;
mod sequential;
pub mod spec;
mod tape;

pub use init::init_params;
pub use model::Model;
pub use network::Network;
pub use sequential::Sequential;
pub use tape::Tape;
