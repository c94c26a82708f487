pub mod extract;
pub mod facts_info;
pub mod infer;
pub mod reach;
pub mod util;

pub use extract::*;
pub use facts_info::*;
pub use infer::*;
pub use reach::*;
pub use util::*;
