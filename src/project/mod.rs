pub(crate) mod captions;
pub(crate) mod persist;
