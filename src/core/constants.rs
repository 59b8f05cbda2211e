use std::time::Duration;

/// Maximum length of a player display name, in characters.
pub const MAX_NAME_LEN: usize = 15;

/// Maximum inbound WebSocket message size. Drawings are encoded images and
/// get big, so the ceiling has to be generous.
pub const MAX_MESSAGE_BYTES: usize = 250 * 1024;

/// Capacity of each connection's outbound frame queue. A client that falls
/// this far behind is forcibly disconnected on the next broadcast.
pub const OUTBOUND_QUEUE: usize = 256;

/// Capacity of a session's inbound event queue.
pub const SESSION_QUEUE: usize = 64;

/// Capacity of a hub's event queue.
pub const HUB_QUEUE: usize = 64;

/// Interval between liveness pings on each connection. Must stay under the
/// client's assumed 30 s liveness window.
pub const PING_PERIOD: Duration = Duration::from_secs(27);

/// How often the player roster is broadcast while a game is still forming.
pub const ROSTER_PERIOD: Duration = Duration::from_secs(1);

/// Delay before an undeliverable targeted message is retried.
pub const SEND_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How many times a targeted message is retried before it is abandoned.
pub const SEND_RETRY_LIMIT: u32 = 60;

/// Hard lifetime ceiling for a session and its hub. Leak prevention, not a
/// per-player idle timeout.
pub const SESSION_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Length of a join code (uppercase ASCII letters).
pub const JOIN_CODE_LEN: usize = 4;

/// Attempts at finding a free join code before session creation fails.
pub const JOIN_CODE_ATTEMPTS: usize = 100;
