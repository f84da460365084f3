mod order;
mod otp;
mod scam;
mod user;

pub use order::*;
pub use otp::*;
pub use scam::*;
pub use user::*;
