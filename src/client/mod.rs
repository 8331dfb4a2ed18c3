pub mod http;

pub use http::HttpChatService;
