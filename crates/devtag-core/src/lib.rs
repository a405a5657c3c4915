#![forbid(unsafe_code)]

//! Core building blocks for evaluating `NAME=value` device specs.
//!
//! Tag parsing, configuration, the resolution strategies, and the uevent
//! notifier live here. Concrete probe and cache backends are supplied by the
//! caller through the `devtag-provider` contracts.

pub mod config;
pub mod encode;
pub mod error;
pub mod evaluate;
pub mod logging;
pub mod node;
pub mod notify;
pub mod resolve;
pub mod tag;

pub use config::{ConfigFile, ConfigSource, DevtagConfig, EvalMethod, EvaluateCfg};
pub use encode::{encode_path_segment, encode_string};
pub use error::{DevtagError, DevtagResult};
pub use evaluate::SpecEvaluator;
pub use node::{DeviceNodes, DeviceNumber, HostNodes};
pub use notify::{send_uevent, EventNotifier, SysfsNotifier, UeventAction};
pub use resolve::{LinkLayout, LinkResolver, ResolveStrategy, ScanResolver};
pub use tag::{Tag, TagKind};
