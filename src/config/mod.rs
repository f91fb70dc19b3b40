//! Configuration parsing and types.
//!
//! - `types` - project file root (`ProjectConfig`), `EngineSettings`, `ResolvedProject`
//! - `service` - raw `ServiceConfig` and the validated `ServiceDescriptor`
//! - `duration` - human-readable duration strings
//! - `parser` - YAML loading and the `ConfigProvider` boundary
//! - `validation` - turning raw config into descriptors

mod duration;
mod parser;
mod service;
mod types;
mod validation;

pub use duration::*;
pub use parser::*;
pub use service::*;
pub use types::*;
