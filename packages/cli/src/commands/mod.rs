pub mod check;
pub mod menu;
pub mod normalize;
pub mod state;

pub use check::{check, CheckArgs};
pub use menu::{menu, MenuArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use state::{state, StateArgs};
