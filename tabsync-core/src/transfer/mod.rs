pub mod receive;
pub mod send;

pub use receive::TableReceiver;
pub use send::TableSender;
