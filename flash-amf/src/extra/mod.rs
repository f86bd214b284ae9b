/// Adobe flex messaging types
#[cfg(feature = "flex")]
pub mod flex;
