pub mod payment;
pub mod room;
pub mod tenant;
pub mod user;

pub use payment::*;
pub use room::*;
pub use tenant::*;
pub use user::*;
