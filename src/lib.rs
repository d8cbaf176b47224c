pub mod error;
pub mod image;
pub mod objects;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod synth;
pub mod validation;
pub mod workflow;

pub use error::Error;
pub use image::{BuildResource, ImageKind, RepoRef};
pub use registry::ResourceRegistry;
pub use resolver::{Resolver, TaskDescriptor};
pub use synth::{Manifest, SynthesisOptions, synthesize};
pub use workflow::Configuration;
