pub mod classifier;
pub mod controller;
pub mod loop_worker;
pub mod median;
pub mod sampler;
pub mod vector;

pub use classifier::{ClassifierConfig, OrientationClassifier, DODECAHEDRON_FACES};
pub use controller::SensingController;
pub use median::{median, median_vector};
pub use sampler::{SamplingConfig, VectorSampler};
pub use vector::Vector3;
