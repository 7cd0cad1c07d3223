pub(crate) mod engine;
pub(crate) mod scene;
pub(crate) mod source;
pub(crate) mod store;
