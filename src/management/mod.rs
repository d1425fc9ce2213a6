mod dashboard;
mod session;
mod storage;

pub use dashboard::DashboardOutcome;
pub use dashboard::load_dashboard;
pub use session::KEY_ACCESS_TOKEN;
pub use session::KEY_REFRESH_TOKEN;
pub use session::KEY_TOP_ARTISTS;
pub use session::KEY_TOP_SONGS;
pub use session::KEY_USER_DATA;
pub use session::SessionCache;
pub use storage::Storage;
