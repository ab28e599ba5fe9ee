pub mod account;
pub mod delivery;
pub mod events;
pub mod order;
pub mod schedule;
pub mod state;

pub use account::*;
pub use delivery::*;
pub use events::*;
pub use order::*;
pub use schedule::*;
pub use state::*;
