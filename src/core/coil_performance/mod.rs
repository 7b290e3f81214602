pub mod degradation;
pub mod envelope;
pub mod seasonal_cooling;
pub mod seasonal_heating;
pub mod sensible_heat_ratio;
pub mod stages;
