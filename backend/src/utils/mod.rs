pub mod jwt;
pub mod password;
pub mod vault;

pub use jwt::*;
pub use password::*;
pub use vault::*;
