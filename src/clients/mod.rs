pub mod avatar;
pub mod error;
pub mod gateway;

pub use avatar::AvatarClient;
pub use error::{ErrorResponse, RequestError};
pub use gateway::{HttpTransport, OutgoingRequest, RawResponse, RequestGateway, Transport};
