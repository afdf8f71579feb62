pub mod classical;
pub mod neural;
pub mod simulated;

pub use classical::ClassicalCvStrategy;
pub use neural::NeuralNetStrategy;
pub use simulated::SimulatedStrategy;
