//! Map data: asset catalog, map file loading and the authoring store

pub mod catalog;
pub mod editor;
pub mod loader;

pub use catalog::{AssetCatalog, CollisionTable};
pub use editor::{EditorError, EditorGrid, MapAuthoringStore, PlacementOutcome};
pub use loader::{MapObject, WorldMap};
