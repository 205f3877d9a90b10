//! Low level plumbing shared by the package readers: IO sources, ZIP parts and XML events.

pub(crate) mod reader;
pub(crate) mod xml;
pub(crate) mod zip;
