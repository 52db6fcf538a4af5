//! Queue model and transport intent
//!
//! - [`queue`]: play queue with cursor, repeat and shuffle
//! - [`sub_queue`]: "play next" FIFO that overrides the play queue
//! - [`intent`]: cross-thread transport signals and Previous double-press

pub mod intent;
pub mod queue;
pub mod sub_queue;

pub use intent::{PlaybackIntent, PreviousPress, SongAction};
pub use queue::{Direction, PlayQueue};
pub use sub_queue::SubQueue;
