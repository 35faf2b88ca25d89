pub mod geometry;
pub mod model;
pub mod positions;
pub mod rotation;
pub mod zones;
