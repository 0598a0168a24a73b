pub mod app;
pub mod assets;
pub mod cache;
pub mod config;
pub mod exception;
pub mod handler;
pub mod param;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod template;
pub mod util;

pub use app::build_router;
pub use assets::{Asset, AssetServer};
pub use cache::FileCache;
pub use config::Config;
pub use exception::Exception;
pub use handler::{DinoHandler, Handler, RouteParams, StaticHandler, TemplateHandler};
pub use param::{HttpEncoding, HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::Response;
pub use router::{RoutePattern, Router};
pub use server::Server;
pub use template::{RenderContext, TemplateStore};
pub use util::HtmlBuilder;
