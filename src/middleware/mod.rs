pub mod authorize;
pub mod response;
pub mod session;

pub use authorize::{require_administrator, require_user};
pub use response::{ApiResponse, ApiResult, Successful};
pub use session::{read_session, remove_session, write_session};
