pub mod bus;
pub mod context;
pub mod pii;

pub use bus::{BusEvent, EventBus, EventEnvelope, EventHandler, HandlerError, PublishError};
pub use context::{DeadlineExceeded, RequestContext};
pub use pii::Masked;
