mod ask;
mod chat;
mod config;
mod ingest;
mod personas;
mod ping;
mod shared;
mod status;

pub use ask::AskArgs;
pub use chat::ChatArgs;
pub use config::ConfigCommand;
pub use ingest::IngestArgs;

pub use ask::handle_ask;
pub use chat::handle_chat;
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use personas::handle_personas;
pub use ping::handle_ping;
pub use status::handle_status;
