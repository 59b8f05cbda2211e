pub mod requests;
pub mod responses;

pub use requests::JoinGameRequest;
pub use responses::{CreateGameResponse, JoinGameResponse};
