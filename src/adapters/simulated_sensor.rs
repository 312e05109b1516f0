use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::FaceIndex;
use crate::error::SensorError;
use crate::ports::SensorPort;
use crate::sensing::{Vector3, DODECAHEDRON_FACES};

const NO_FACE: usize = usize::MAX;
const GRAVITY: f32 = 9.81;

/// Which face the simulated device rests on. Shared between the console and
/// the sensor.
#[derive(Debug, Clone)]
pub struct FaceHandle(Arc<AtomicUsize>);

impl FaceHandle {
    pub fn new(face: Option<FaceIndex>) -> Self {
        Self(Arc::new(AtomicUsize::new(face.map_or(NO_FACE, FaceIndex::get))))
    }

    pub fn set(&self, face: Option<FaceIndex>) {
        self.0
            .store(face.map_or(NO_FACE, FaceIndex::get), Ordering::SeqCst);
    }

    pub fn get(&self) -> Option<FaceIndex> {
        FaceIndex::new(self.0.load(Ordering::SeqCst))
    }
}

/// Accelerometer that reports gravity along the resting face plus uniform
/// noise, with the occasional spike. With no face set the device is being
/// handled and reads near zero.
pub struct SimulatedAccelerometer {
    face: FaceHandle,
    noise: f32,
    spike_probability: f64,
    rng: StdRng,
}

impl SimulatedAccelerometer {
    pub fn new(face: FaceHandle) -> Self {
        Self::with_rng(face, StdRng::from_entropy())
    }

    pub fn with_rng(face: FaceHandle, rng: StdRng) -> Self {
        Self {
            face,
            noise: 0.3,
            spike_probability: 0.05,
            rng,
        }
    }

    fn jitter(&mut self) -> Vector3 {
        let n = self.noise;
        Vector3::new(
            self.rng.gen_range(-n..=n),
            self.rng.gen_range(-n..=n),
            self.rng.gen_range(-n..=n),
        )
    }
}

impl SensorPort for SimulatedAccelerometer {
    fn is_ready(&self) -> bool {
        true
    }

    fn read(&mut self) -> Result<Vector3, SensorError> {
        let base = match self.face.get() {
            Some(face) => DODECAHEDRON_FACES[face.get()].scale(GRAVITY),
            None => Vector3::default(),
        };

        let mut reading = base.add(&self.jitter());
        if self.rng.gen_bool(self.spike_probability) {
            reading = reading.add(&Vector3::new(0.0, 0.0, self.rng.gen_range(-30.0..=30.0)));
        }
        Ok(reading)
    }
}
