pub mod quadrature;
pub use quadrature::{angle2quadrature, QuadratureState};
