use crate::sample::{NUM_INPUTS, NUM_OUTPUTS};
use anyhow::{anyhow, Result};
use burn::{
    prelude::*,
    record::{BinFileRecorder, FullPrecisionSettings},
};
use std::path::Path;

type Checkpoint = BinFileRecorder<FullPrecisionSettings>;

/// Fixed 10 -> 64 -> 64 -> 2 regressor. ReLU on the hidden layers, linear out.
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    linear0: nn::Linear<B>,
    linear1: nn::Linear<B>,
    linear2: nn::Linear<B>,
    activation: nn::Relu,
}

impl<B: Backend> Model<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.linear0.forward(x));
        let x = self.activation.forward(self.linear1.forward(x));
        self.linear2.forward(x)
    }

    pub fn predict(&self, features: &[f32; NUM_INPUTS]) -> Result<[f32; NUM_OUTPUTS]> {
        let device = self.linear0.weight.device();
        let input =
            Tensor::<B, 1>::from_floats(features.as_slice(), &device).reshape([1, NUM_INPUTS]);
        let output = self
            .forward(input)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("failed to read model output: {:?}", e))?;
        output
            .try_into()
            .map_err(|v: Vec<f32>| anyhow!("expected {} outputs, got {}", NUM_OUTPUTS, v.len()))
    }

    /// Writes the parameters only; loading needs the same [`ModelConfig`].
    pub fn save(self, path: &Path) -> Result<()> {
        self.save_file(path.to_path_buf(), &Checkpoint::new())
            .map_err(|e| anyhow!("failed to save checkpoint {}: {:?}", path.display(), e))?;
        log::info!("Saved model to {}", path.display());
        Ok(())
    }
}

#[derive(Config, Debug)]
pub struct ModelConfig {
    #[config(default = 10)]
    input_size: usize,
    #[config(default = 64)]
    hidden_size: usize,
    #[config(default = 2)]
    output_size: usize,
}

impl ModelConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        Model {
            linear0: nn::LinearConfig::new(self.input_size, self.hidden_size).init(device),
            linear1: nn::LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            linear2: nn::LinearConfig::new(self.hidden_size, self.output_size).init(device),
            activation: nn::Relu::new(),
        }
    }

    /// Builds a fresh model and fills it from a checkpoint.
    pub fn load<B: Backend>(&self, path: &Path, device: &B::Device) -> Result<Model<B>> {
        let model = self
            .init::<B>(device)
            .load_file(path.to_path_buf(), &Checkpoint::new(), device)
            .map_err(|e| anyhow!("failed to load checkpoint {}: {:?}", path.display(), e))?;
        log::debug!("Loaded model: {:#?}", model);
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn output_shape() {
        let device = Default::default();
        let model = ModelConfig::new().init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 2>::zeros([7, NUM_INPUTS], &device);
        assert_eq!(model.forward(x).dims(), [7, NUM_OUTPUTS]);
    }

    #[test]
    fn checkpoint_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mouse_net.bin");
        let device = Default::default();
        let config = ModelConfig::new().with_hidden_size(16);
        let model = config.init::<TestBackend>(&device);
        let features = [384.0, 216.0, 192.0, 108.0, 1000.0, 1.0, 90.0, 55.0, 276.0, 113.0];
        let before = model.predict(&features).unwrap();

        model.save(&path).unwrap();
        assert!(path.exists());
        let loaded = config.load::<TestBackend>(&path, &device).unwrap();
        let after = loaded.predict(&features).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert!((a - b).abs() < 1e-4, "{a} != {b}");
        }
    }

    #[test]
    fn load_missing_checkpoint_fails() {
        let dir = tempfile::tempdir().unwrap();
        let device = Default::default();
        let result = ModelConfig::new().load::<TestBackend>(&dir.path().join("nope.bin"), &device);
        assert!(result.is_err());
    }
}
