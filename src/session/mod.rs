pub mod registry;

pub use registry::{RegistryError, SessionRegistry};
