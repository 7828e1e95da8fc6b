pub mod eligibility;
pub mod policy;
pub mod types;

pub use eligibility::*;
pub use policy::*;
pub use types::*;
