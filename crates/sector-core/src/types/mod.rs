//! 매퍼 전반에서 사용되는 공통 타입.

mod classification;
mod request;
mod symbol;

pub use classification::*;
pub use request::*;
pub use symbol::*;
