pub mod analysis;
pub mod builder;
mod cancel;
mod par;
mod queue;
pub mod stage;

pub use cancel::CancelToken;
pub use par::{par, par_each};
pub use queue::{queue, QueueReceiver, QueueSender};
