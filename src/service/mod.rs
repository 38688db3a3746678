//! Service layer. Mapper modules under `service::<name>::mapper` route to
//! the service database.

pub mod sample;
