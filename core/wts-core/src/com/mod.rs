//! Low-level component object access.
//!
//! - [`dispatch`] — method-table walking and typed slot calls
//! - [`interfaces`] — slot tables of the scheduler interfaces
//! - [`guard`] — [`ComPtr`], the owning reference
//! - [`hresult`] — status codes and their classification

pub mod dispatch;
pub mod guard;
pub mod guid;
pub mod hresult;
pub mod interfaces;

pub use dispatch::{ComObjectRef, Interface, Slot};
pub use guard::ComPtr;
pub use guid::Guid;
pub use hresult::HResult;
