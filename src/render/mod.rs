pub(crate) mod composite;
pub(crate) mod compositor;
pub(crate) mod job;
pub(crate) mod surface;
