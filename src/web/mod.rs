//! Web layer data access. Units declared under this module route to the
//! web database.

pub mod mapper;


pub use mapper::SampleWebMapper;
