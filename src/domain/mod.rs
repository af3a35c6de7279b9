pub mod user;
pub mod product;
pub mod order;
pub mod wallet;
pub mod epin;
pub mod top_up;
pub mod commission;

pub use user::*;
pub use product::*;
pub use order::*;
pub use wallet::*;
pub use epin::*;
pub use top_up::*;
pub use commission::*;
