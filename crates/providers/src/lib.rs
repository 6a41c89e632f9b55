pub mod google;
pub mod traits;
pub mod util;

pub use google::GoogleProvider;
pub use traits::{LlmProvider, ModelRequest, ModelResponse, ResponsePart};
