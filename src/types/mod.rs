pub mod ids;
pub mod response;

pub use ids::*;
pub use response::*;
