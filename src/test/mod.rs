pub mod errors;
pub mod progress;
pub mod utils;
pub mod wishlist;

pub use utils::test_utils;
