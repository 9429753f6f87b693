pub(crate) mod cache;
pub(crate) mod decode;
pub(crate) mod frame;
pub(crate) mod probe;
pub(crate) mod provider;
pub(crate) mod video;
