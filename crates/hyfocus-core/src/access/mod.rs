mod controller;
mod flags;
mod spawn;

pub use controller::{AccessController, EnforcementPolicy};
pub use flags::SessionFlags;
pub use spawn::{program_name, MatchMode, SpawnWhitelist};
