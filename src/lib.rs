pub mod accessor;
pub mod bytes;
pub mod codec;
pub mod errors;
pub mod field;
pub mod options;
pub mod pack;
pub mod registry;
pub mod schema;
#[cfg(feature = "serde")]
pub mod serde;
pub mod value;
pub mod view;
