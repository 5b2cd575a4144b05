//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                                   |
//! |-----------------|-----------------------------------------------------|
//! | `serve`         | `Serve`                                            |
//! | `project`       | `Init`, `Generate`                                 |
//! | `instrument`    | `Instrument`                                       |
//! | `models`        | `Models`                                           |
//! | `config`        | `Config`                                           |

pub mod config;
pub mod instrument;
pub mod models;
pub mod project;
pub mod serve;

pub use config::cmd_config;
pub use instrument::cmd_instrument;
pub use models::cmd_models;
pub use project::{cmd_generate, cmd_init};
pub use serve::cmd_serve;
