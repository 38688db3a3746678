//! Sample service: a facade over one mapper.

pub mod facade;
pub mod mapper;


pub use facade::{SampleFacade, SampleFacadeImpl};
pub use mapper::SampleServiceMapper;
