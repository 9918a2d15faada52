//! Scene hierarchy building blocks.
//!
//! Every node kind (layer, widget, feature) composes the same pieces:
//! a [`SceneNode`] for children and dirty tracking, and an
//! `EventEmitter` for handler registration.

mod error;
mod events;
mod feature;
mod node;

pub use error::SceneError;
pub use events::{EventArgs, GeoEvent, Subscription};
pub use feature::{create_feature, Feature, FeatureArgs, FeatureKind, FeatureStyle};
pub use node::{NodeId, SceneNode};
