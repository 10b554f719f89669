pub mod draws;
pub mod odds;
pub mod pending_pool;
pub mod processor;
pub mod resolver;
pub mod types;

pub use draws::{DrawSource, RandomDraws, ScriptedDraws};
pub use pending_pool::PendingWagerPool;
pub use processor::{PlayerState, Settlement, WagerProcessor};
pub use resolver::{BetResolver, Phase1Roll, Phase2Roll};
pub use types::*;
