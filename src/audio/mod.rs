pub mod aggregator;
pub mod channels;
pub mod decode;
pub mod direction;
pub mod features;
pub mod signal;
pub mod spectrum;
pub mod tone;
