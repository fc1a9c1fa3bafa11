//! Live portal interaction: text-matched clicks and the authenticated session.

pub mod act;
pub mod session;

pub use session::PortalSession;
