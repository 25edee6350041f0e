pub mod callbacks;
mod config;
mod error;
pub mod history;
pub mod llm;
mod personality;
mod session;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use config::ChatConfig;
pub use personality::Personality;
pub use session::{Reply, Session, SessionBuilder};
