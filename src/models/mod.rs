pub mod clinic;
pub mod diagnostic;
pub mod enums;
pub mod hospital;
pub mod membership;
pub mod person;
pub mod service;

pub use clinic::*;
pub use diagnostic::*;
pub use hospital::*;
pub use membership::*;
pub use person::*;
pub use service::*;
