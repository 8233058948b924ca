pub mod geo;
pub mod navigation;
pub mod shipment;
pub mod stop;
