pub mod dispatch;
pub mod router;
pub mod types;
pub mod handlers {
    pub mod common;
    pub mod db_info;
    pub mod insert;
    pub mod query;
    pub mod token;
    pub mod web;
}

pub use router::{create_router, ApiDoc};
pub use types::{AppState, WebOptions};
