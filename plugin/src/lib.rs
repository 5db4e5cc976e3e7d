mod app;
pub mod config;
pub mod connection;
pub mod error;
pub mod launch;
pub mod plugin;
pub mod protocol;
pub mod query;
pub mod render;
pub mod session;
pub mod settings;
pub mod timer;

pub use app::{run, serve};
pub use config::PluginConfig;
pub use error::{FetchError, PluginError, RenderError};
pub use plugin::{Internal, Plugin};
pub use protocol::{HostCommand, HostEvent};
pub use query::{DisplayValue, extract, fetch_display_value};
pub use settings::{Settings, parse_headers};
pub use timer::TimerState;
