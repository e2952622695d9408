//! Chart annotation engine: drawing tools, hit-testing, and persistence for
//! trendlines, rectangles, fibonacci retracements, channels and friends.
//!
//! The engine is headless. A host (browser canvas, native window, test) feeds
//! pointer and keyboard events into [`engine::EngineCore`], supplies a
//! [`chart::ChartAdapter`] that maps pixels to `(time, price)` and back, and
//! hands a [`render::Painter`] to draw the scene. Annotations live in data
//! space so they survive pan and zoom, and are persisted per
//! `(symbol, timeframe)` through a pluggable [`storage::Storage`].
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Composition root and input dispatch ([`engine::EngineCore`]) |
//! | [`store`] | Shape list, selection, undo/redo, persistence |
//! | [`shape`] | Annotation data model |
//! | [`settings`] | Reactive, persisted drawing settings |
//! | [`tools`] | Tool plugin protocol, registry and built-in tools |
//! | [`hit`] | Pixel projection and hit-testing |
//! | [`render`] | Scene drawing over a [`render::Painter`] |
//! | [`bridge`] | Pixel/data-space conversion with snapping |
//! | [`chart`] | Chart adapter interface and a linear reference adapter |
//! | [`geom`] | Pure geometry helpers |
//! | [`input`] | Input event types and the gesture state machine |
//! | [`notify`] | Listener lists behind store subscriptions |
//! | [`storage`] | Key/value storage backends and JSON helpers |
//! | [`config`] | Engine configuration |
//! | [`error`] | Error types |
//! | [`consts`] | Shared numeric constants |

pub mod bridge;
pub mod chart;
pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod geom;
pub mod hit;
pub mod input;
pub mod notify;
pub mod render;
pub mod settings;
pub mod shape;
pub mod storage;
pub mod store;
pub mod tools;
#[cfg(feature = "web")]
pub mod web;
