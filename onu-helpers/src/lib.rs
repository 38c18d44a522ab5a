pub mod mailboxes;
pub mod periodic;

pub use crate::mailboxes::Mailboxes;
pub use crate::periodic::Periodic;
