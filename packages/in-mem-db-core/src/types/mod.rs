//! Type system, layout calculation, and custom type registration.

mod builtin_types;
mod error;
mod type_layout;
mod type_registration;
mod type_registry;

// Re-export public items
pub use builtin_types::{register_3xf32_type, register_builtin_types, register_type};
pub use error::TypeError;
pub use type_layout::TypeLayout;
pub use type_registration::{DeserializerFn, SerializerFn, TypeRegistration};
pub use type_registry::TypeRegistry;
