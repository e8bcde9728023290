use crate::{
    config::Train,
    model::{Model, ModelConfig},
    sample::{Sample, NUM_INPUTS, NUM_OUTPUTS},
};
use burn::{
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use nn::loss::{MseLoss, Reduction};
use rand::seq::SliceRandom;
use rand_pcg::Pcg64;
use std::time::Instant;

/// Minibatch Adam on MSE over the whole dataset, reshuffled every epoch.
/// Returns the trained model and the mean batch loss of each epoch.
pub fn train<B: AutodiffBackend>(
    samples: &[Sample],
    model_config: &ModelConfig,
    config: &Train,
    device: &B::Device,
    rng: &mut Pcg64,
) -> (Model<B>, Vec<f32>) {
    log::info!(
        "Starting train mouse_net model on {} samples. Using device: {:?}.",
        samples.len(),
        device
    );
    let mut model = model_config.init::<B>(device);
    let mut optimizer = AdamConfig::new().init::<B, Model<B>>();
    let loss_fn = MseLoss::new();

    let mut indices: Vec<usize> = (0..samples.len()).collect();
    let mut loss_values = Vec::with_capacity(config.epochs);
    let start = Instant::now();

    for epoch in 0..config.epochs {
        indices.shuffle(rng);
        let mut epoch_losses = Vec::with_capacity(indices.len() / config.batch_size + 1);
        for batch_indices in indices.chunks(config.batch_size) {
            let (inputs, targets) = get_batch::<B>(samples, batch_indices, device);
            let outputs = model.forward(inputs);
            let loss = loss_fn.forward(outputs, targets, Reduction::Mean);
            epoch_losses.push(loss.clone().into_scalar().elem::<f32>());

            let gradients = loss.backward();
            let gradient_params = GradientsParams::from_grads(gradients, &model);
            model = optimizer.step(config.learning_rate, model, gradient_params);
        }

        let epoch_loss = mean(&epoch_losses);
        loss_values.push(epoch_loss);
        log::info!(
            "Epoch {}/{} Loss: {:.5} Time: {:.2} seconds",
            epoch + 1,
            config.epochs,
            epoch_loss,
            start.elapsed().as_secs_f32()
        );
    }

    (model, loss_values)
}

fn get_batch<B: Backend>(
    samples: &[Sample],
    indices: &[usize],
    device: &B::Device,
) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let mut inputs = Vec::with_capacity(indices.len() * NUM_INPUTS);
    let mut targets = Vec::with_capacity(indices.len() * NUM_OUTPUTS);
    for sample in indices.iter().map(|&i| &samples[i]) {
        inputs.extend_from_slice(&sample.features());
        targets.extend_from_slice(&sample.labels());
    }
    let inputs =
        Tensor::<B, 1>::from_floats(inputs.as_slice(), device).reshape([indices.len(), NUM_INPUTS]);
    let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), device)
        .reshape([indices.len(), NUM_OUTPUTS]);
    (inputs, targets)
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use burn::{
        backend::{Autodiff, NdArray},
        module::AutodiffModule,
    };
    use rand::{Rng, SeedableRng};

    type TestBackend = Autodiff<NdArray<f32>>;

    /// Small-magnitude linear targets, easy enough to fit in a few epochs.
    fn linear_samples(n: usize, rng: &mut Pcg64) -> Vec<Sample> {
        (0..n)
            .map(|_| {
                let mut v = [0.0; 12];
                for x in v.iter_mut().take(NUM_INPUTS) {
                    *x = rng.gen::<f64>();
                }
                v[10] = v[..NUM_INPUTS].iter().sum::<f64>() / 5.0;
                v[11] = v[8] - v[9];
                Sample::from_array(v)
            })
            .collect()
    }

    #[test]
    fn loss_goes_down() {
        let mut rng = Pcg64::seed_from_u64(21);
        let samples = linear_samples(256, &mut rng);
        let mut config = test_config().train;
        config.epochs = 50;
        config.batch_size = 32;
        let device = Default::default();
        let (_, losses) = train::<TestBackend>(
            &samples,
            &ModelConfig::new().with_hidden_size(32),
            &config,
            &device,
            &mut rng,
        );
        assert_eq!(losses.len(), 50);
        assert!(losses.iter().all(|l| l.is_finite()));
        assert!(
            losses[49] < losses[0] * 0.5,
            "first {} last {}",
            losses[0],
            losses[49]
        );
    }

    #[test]
    fn partial_last_batch() {
        let mut rng = Pcg64::seed_from_u64(22);
        let samples = linear_samples(10, &mut rng);
        let mut config = test_config().train;
        config.epochs = 2;
        config.batch_size = 4;
        let device = Default::default();
        let (model, losses) =
            train::<TestBackend>(&samples, &ModelConfig::new(), &config, &device, &mut rng);
        assert_eq!(losses.len(), 2);
        let prediction = model.valid().predict(&samples[0].features()).unwrap();
        assert!(prediction.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn batch_layout() {
        let samples: Vec<Sample> = (0..3)
            .map(|i| {
                let mut v = [0.0; 12];
                v[0] = i as f64;
                v[10] = 10.0 + i as f64;
                Sample::from_array(v)
            })
            .collect();
        let device = Default::default();
        let (inputs, targets) = get_batch::<NdArray<f32>>(&samples, &[2, 0], &device);
        assert_eq!(inputs.dims(), [2, NUM_INPUTS]);
        assert_eq!(targets.dims(), [2, NUM_OUTPUTS]);
        let inputs = inputs.into_data().to_vec::<f32>().unwrap();
        let targets = targets.into_data().to_vec::<f32>().unwrap();
        assert_eq!(inputs[0], 2.0);
        assert_eq!(inputs[NUM_INPUTS], 0.0);
        assert_eq!(targets, vec![12.0, 0.0, 10.0, 0.0]);
    }
}
