//! State engine for a collaborative dashboard builder.
//!
//! Users place widgets (charts, text, metrics, tables, images) on a canvas,
//! drag and resize them, and undo/redo their edits. Layouts are mirrored to
//! every peer editing the same dashboard through a CRDT document, and an
//! awareness channel tells each peer who else is present. Rendering is plain
//! text; a real front end would consume [`workspace::Workspace`] the same
//! way the demo binary does.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`workspace`] | Application host wiring everything below |
//! | [`store`] | [`store::DashboardStore`], the only mutation path, plus change events |
//! | [`history`] | Bounded linear undo/redo of dashboard snapshots |
//! | [`model`] | Widget, layout and dashboard value types |
//! | [`widget`] | Typed widget configs, kind registry, JSON config drafts |
//! | [`repo`] | Dashboard persistence (in-memory and JSON files) |
//! | [`geometry`] | Drag/resize math, clamping and minimum size |
//! | [`input`] | Hit-testing and the gesture state machine |
//! | [`collab`] | Shared document, transport, awareness, session, layout bridge |
//! | [`presence`] | User directory derived from awareness |
//! | [`data`] | Widget data fetching and polling |
//! | [`render`] | Widget render contract and text renderer |
//! | [`prefs`] | Persisted theme preference |
//! | [`config`] | Environment-driven configuration |
//! | [`consts`] | Shared constants (minimum sizes, canvas defaults, keys) |

pub mod collab;
pub mod config;
pub mod consts;
pub mod data;
pub mod geometry;
pub mod history;
pub mod input;
pub mod model;
pub mod prefs;
pub mod presence;
pub mod render;
pub mod repo;
pub mod store;
pub mod widget;
pub mod workspace;
