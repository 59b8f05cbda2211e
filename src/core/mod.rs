pub mod client;
pub mod constants;
pub mod hub;
pub mod journey;
pub mod player;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod words;

pub use constants::*;
pub use hub::{ConnectionHandle, GameHub, HubEvent, IncomingMessage};
pub use journey::{GamePlay, WordJourney};
pub use player::Player;
pub use registry::{GameRegistry, RegistryError};
pub use session::{GameSession, GameStage, SessionError, SessionEvent, SessionHandle};
