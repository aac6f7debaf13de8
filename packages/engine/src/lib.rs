//! # Quire Engine
//!
//! Conversion between the model and the view.
//!
//! ## Architecture
//!
//! ```text
//!   ViewDocumentFragment                        DocumentFragment / root
//!          │                                              │
//!          ▼                                              ▼
//!   UpcastDispatcher ── element:<name>, text      DowncastDispatcher ── insert:<name>,
//!          │                                              │              attribute:<key>:<name>,
//!          │  listeners (by priority)                     │              addMarker:<name>
//!          ▼                                              ▼
//!   UpcastConversionApi                            DowncastConversionApi
//!     ViewConsumable, FragmentWriter,                ModelConsumable, DowncastWriter,
//!     Mapper, Schema, options                        Mapper, options
//! ```
//!
//! Converters are plain closures registered on an event name with a
//! [`Priority`]. They test and consume what they convert, so several
//! converters can take part in one pass without doing the same work twice.
//! [`DataController`] ties the dispatchers to a data processor and a
//! [`quire_model::Document`].

pub mod basics;
pub mod config;
pub mod consumable;
pub mod controller;
pub mod downcast;
pub mod error;
pub mod mapper;
pub mod options;
pub mod registry;
pub mod upcast;

pub use basics::register_basics;
pub use config::{DataConfig, EngineConfig, TableConfig, TrimMode, UndoConfig, DEFAULT_CONFIG_NAME};
pub use consumable::{Claim, Match, ModelConsumable, ModelItem, ViewConsumable};
pub use controller::DataController;
pub use downcast::{DowncastConversionApi, DowncastData, DowncastDispatcher, DowncastItem};
pub use error::{ConversionError, ConversionResult, EngineError, EngineResult};
pub use mapper::Mapper;
pub use options::ConversionOptions;
pub use registry::{EventInfo, ListenerRegistry, Priority};
pub use upcast::{UpcastConversionApi, UpcastData, UpcastDispatcher};
